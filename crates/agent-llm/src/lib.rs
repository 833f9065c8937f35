//! Language-model access for the agine chess agent.
//!
//! Every call carries an explicit [`ModelSettings`] value naming the
//! provider, model, credential, language and instruction mode; nothing is
//! selected through process-wide state.
//!
//! # Modules
//!
//! - [`settings`] - Provider and per-call model settings
//! - [`instructions`] - System instruction variants selected by mode
//! - [`client`] - The [`LanguageModel`] trait and its HTTP implementation

pub mod client;
pub mod instructions;
pub mod settings;

pub use client::{Endpoints, HttpModel, LanguageModel, ModelError};
pub use instructions::{system_instruction, InstructionMode};
pub use settings::{ModelSettings, Provider, UnknownProvider};
