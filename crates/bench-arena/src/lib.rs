//! Agine Bench - benchmark games between a language-model agent and Stockfish.
//!
//! This crate plays a series of games between a chess agent backed by a
//! language model and the Stockfish engine, records every game and reports
//! win/loss/draw statistics per color.
//!
//! # Modules
//!
//! - [`board`] - Game state and rules queries on top of `shakmaty`
//! - [`reconcile`] - Mapping free-text move candidates onto legal moves
//! - [`commentary`] - Position summary and tactical notes for prompts
//! - [`prompt`] - Agent prompt construction
//! - [`turn`] - Obtaining one move from the agent or the engine
//! - [`game_runner`] - The game loop and its terminal classification
//! - [`benchmark`] - Sequential orchestration of a run
//! - [`stats`] - Per-color aggregate results
//! - [`json_output`] - The cumulative JSON results file
//! - [`pgn`] - PGN export
//! - [`config`] - Command-line, file and environment configuration

pub mod benchmark;
pub mod board;
pub mod commentary;
pub mod config;
pub mod game_runner;
pub mod json_output;
pub mod pgn;
pub mod prompt;
pub mod reconcile;
pub mod stats;
pub mod turn;
