//! Engine evaluation for the agine benchmark.
//!
//! This crate talks to a UCI analysis engine (Stockfish) and turns its
//! output into something the benchmark can play and log.
//!
//! # Overview
//!
//! - [`Evaluator`] - The evaluation-engine seam used by the game loop
//! - [`Stockfish`] - Async UCI subprocess implementing [`Evaluator`]
//! - [`EngineStrength`] - Skill level or Elo limit applied before a search
//! - [`PositionEval`] / [`LineEval`] - Best move and scored lines of a search
//! - [`format`] - SAN rendering of engine moves and evaluation strings
//!
//! # Example
//!
//! ```ignore
//! use engine_analysis::{EngineStrength, Evaluator, Stockfish};
//!
//! let mut engine = Stockfish::new("stockfish", 2);
//! let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
//! let eval = engine.evaluate(fen, 15, EngineStrength::from_setting(1000)).await?;
//! println!("{}", engine_analysis::format::best_move_san(fen, &eval)?);
//! ```

pub mod engine;
pub mod evaluation;
pub mod format;

pub use engine::{EngineError, EngineStrength, Evaluator, Stockfish};
pub use evaluation::{Evaluation, LineEval, PositionEval};
pub use format::FormatError;
