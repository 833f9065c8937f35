//! The game loop for a single agent-versus-engine game.
//!
//! [`GameRunner::play_game`] alternates turns until the rules end the game,
//! the move cap is hit, or a run of consecutive failures aborts it. Failed
//! turns are retried for the same side after a backoff; a successful turn
//! clears both failure counters.

use std::fmt;
use std::time::Duration;

use agent_llm::LanguageModel;
use engine_analysis::{EngineError, Evaluator};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::board::{BoardError, ChessGame, DrawRule, Side};
use crate::pgn::{result_token, PgnHeaders};
use crate::turn::{Mover, TurnDriver};

/// Name used for the engine side in records and PGN headers.
pub const ENGINE_NAME: &str = "Stockfish";

/// Faults that end a game without a result.
#[derive(Error, Debug)]
pub enum GameError {
    /// The engine could not be reset for a new game.
    #[error("Engine reset failed: {0}")]
    EngineReset(EngineError),
    /// A move accepted by the reconciler was rejected by the rules engine.
    #[error("Failed to apply accepted move: {0}")]
    Apply(#[from] BoardError),
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Checkmate,
    Stalemate,
    ThreefoldRepetition,
    InsufficientMaterial,
    FiftyMoveRule,
    MaxMovesReached,
    AbortedByErrors,
    AbortedByTimeouts,
}

impl Termination {
    /// Reason string used in the results file and the PGN header.
    pub fn reason(&self) -> &'static str {
        match self {
            Termination::Checkmate => "checkmate",
            Termination::Stalemate => "stalemate",
            Termination::ThreefoldRepetition => "threefold repetition",
            Termination::InsufficientMaterial => "insufficient material",
            Termination::FiftyMoveRule => "50-move rule",
            Termination::MaxMovesReached => "max moves reached",
            Termination::AbortedByErrors => "game abandoned due to errors",
            Termination::AbortedByTimeouts => "game abandoned due to timeouts",
        }
    }
}

impl From<DrawRule> for Termination {
    fn from(rule: DrawRule) -> Self {
        match rule {
            DrawRule::Stalemate => Termination::Stalemate,
            DrawRule::ThreefoldRepetition => Termination::ThreefoldRepetition,
            DrawRule::InsufficientMaterial => Termination::InsufficientMaterial,
            DrawRule::FiftyMoveRule => Termination::FiftyMoveRule,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl Serialize for Termination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.reason())
    }
}

/// Outcome from the benchmark's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Agent,
    Stockfish,
    Draw,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Winner::Agent => "agent",
            Winner::Stockfish => "stockfish",
            Winner::Draw => "draw",
        };
        f.write_str(label)
    }
}

/// Order in which simultaneous draw conditions are reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawPriority(Vec<DrawRule>);

impl Default for DrawPriority {
    fn default() -> Self {
        Self(DrawRule::ALL.to_vec())
    }
}

impl DrawPriority {
    /// Builds a priority from `order`. Rules not named keep their default
    /// relative order after the named ones; duplicates are rejected.
    pub fn new(order: &[DrawRule]) -> Result<Self, DrawRule> {
        let mut rules: Vec<DrawRule> = Vec::with_capacity(DrawRule::ALL.len());
        for &rule in order {
            if rules.contains(&rule) {
                return Err(rule);
            }
            rules.push(rule);
        }
        for rule in DrawRule::ALL {
            if !rules.contains(&rule) {
                rules.push(rule);
            }
        }
        Ok(Self(rules))
    }

    pub fn rules(&self) -> &[DrawRule] {
        &self.0
    }

    /// First draw rule, in priority order, that holds for `game`.
    pub fn classify(&self, game: &ChessGame) -> Option<DrawRule> {
        self.0.iter().copied().find(|&rule| game.draw_holds(rule))
    }
}

/// Consecutive failures since the last successful turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounters {
    pub errors: u32,
    pub timeouts: u32,
}

impl ErrorCounters {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Frozen record of a finished game.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub winner: Winner,
    pub reason: Termination,
    /// Moves in SAN.
    pub moves: Vec<String>,
    pub pgn: String,
    pub final_fen: String,
    pub move_count: usize,
    pub agent_color: Side,
}

/// Limits and pacing for the game loop.
#[derive(Debug, Clone)]
pub struct GameOptions {
    /// Ply cap.
    pub max_moves: usize,
    /// Consecutive errors (or timeouts) that abort a game.
    pub max_consecutive_errors: u32,
    /// Pause after every accepted move.
    pub move_delay: Duration,
    /// Pause before retrying a failed turn.
    pub retry_backoff: Duration,
    pub draw_priority: DrawPriority,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            max_moves: 200,
            max_consecutive_errors: 3,
            move_delay: Duration::from_secs(1),
            retry_backoff: Duration::from_secs(5),
            draw_priority: DrawPriority::default(),
        }
    }
}

/// Terminal state reached by the loop, with the losing side if any.
struct Outcome {
    termination: Termination,
    loser: Option<Side>,
}

impl Outcome {
    fn draw(termination: Termination) -> Self {
        Self {
            termination,
            loser: None,
        }
    }

    fn lost_by(termination: Termination, loser: Side) -> Self {
        Self {
            termination,
            loser: Some(loser),
        }
    }
}

/// Checkmate or a draw rule, classified by `priority`.
fn rules_outcome(game: &ChessGame, priority: &DrawPriority) -> Option<Outcome> {
    if game.is_checkmate() {
        return Some(Outcome::lost_by(Termination::Checkmate, game.turn()));
    }
    priority
        .classify(game)
        .map(|rule| Outcome::draw(Termination::from(rule)))
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Plays games between the agent and the engine.
pub struct GameRunner<M, E> {
    driver: TurnDriver<M, E>,
    options: GameOptions,
    round: u32,
}

impl<M: LanguageModel, E: Evaluator> GameRunner<M, E> {
    pub fn new(driver: TurnDriver<M, E>, options: GameOptions) -> Self {
        Self {
            driver,
            options,
            round: 0,
        }
    }

    pub fn options(&self) -> &GameOptions {
        &self.options
    }

    pub fn driver(&self) -> &TurnDriver<M, E> {
        &self.driver
    }

    /// Plays one game from the standard start position.
    pub async fn play_game(&mut self, agent_color: Side) -> Result<GameRecord, GameError> {
        self.play_from(ChessGame::new(), agent_color).await
    }

    /// Plays one game from `game`'s current position.
    ///
    /// # Errors
    ///
    /// Returns [`GameError`] when the engine cannot be reset or an accepted
    /// move cannot be applied. Turn failures never escape; they count
    /// towards the abort thresholds instead.
    pub async fn play_from(
        &mut self,
        mut game: ChessGame,
        agent_color: Side,
    ) -> Result<GameRecord, GameError> {
        self.round += 1;
        self.driver
            .engine_mut()
            .new_game()
            .await
            .map_err(GameError::EngineReset)?;

        let threshold = self.options.max_consecutive_errors.max(1);
        let mut counters = ErrorCounters::default();
        // Each ply takes at most one success and (threshold - 1) failures of
        // each kind, so this bound is never the reason a game stops.
        let step_limit = (self.options.max_moves + 1) * 2 * threshold as usize;
        let mut outcome = None;

        for _ in 0..step_limit {
            if let Some(ended) = rules_outcome(&game, &self.options.draw_priority) {
                outcome = Some(ended);
                break;
            }
            if game.ply_count() >= self.options.max_moves {
                outcome = Some(Outcome::draw(Termination::MaxMovesReached));
                break;
            }

            let side = game.turn();
            let mover = if side == agent_color {
                Mover::Agent
            } else {
                Mover::Engine
            };
            tracing::info!(
                "--- Move {} ({}'s turn, {}) ---",
                game.ply_count() / 2 + 1,
                side,
                mover
            );

            match self.driver.take_turn(&game, mover).await {
                Ok(accepted) => {
                    let san = game.play_san(&accepted.san)?;
                    tracing::info!("{} plays {}", mover, san);
                    tracing::debug!("Position: {}", game.fen());
                    counters.reset();
                    pause(self.options.move_delay).await;
                }
                Err(e) if e.is_timeout() => {
                    counters.timeouts += 1;
                    tracing::warn!(
                        "{} ({}/{} consecutive timeouts)",
                        e,
                        counters.timeouts,
                        threshold
                    );
                    if counters.timeouts >= threshold {
                        tracing::error!("Too many timeouts, abandoning game");
                        outcome = Some(Outcome::lost_by(Termination::AbortedByTimeouts, side));
                        break;
                    }
                    pause(self.options.retry_backoff).await;
                }
                Err(e) => {
                    counters.errors += 1;
                    tracing::warn!("{} ({}/{} consecutive errors)", e, counters.errors, threshold);
                    if counters.errors >= threshold {
                        tracing::error!("Too many errors, abandoning game");
                        outcome = Some(Outcome::lost_by(Termination::AbortedByErrors, side));
                        break;
                    }
                    pause(self.options.retry_backoff).await;
                }
            }
        }

        let outcome = outcome.unwrap_or_else(|| Outcome::draw(Termination::MaxMovesReached));
        tracing::info!("Game over: {}", outcome.termination);
        Ok(self.record(&game, agent_color, outcome))
    }

    fn record(&self, game: &ChessGame, agent_color: Side, outcome: Outcome) -> GameRecord {
        let winner = match outcome.loser {
            None => Winner::Draw,
            Some(loser) if loser == agent_color => Winner::Stockfish,
            Some(_) => Winner::Agent,
        };
        let agent_name = self.driver.settings().model.clone();
        let (white, black) = match agent_color {
            Side::White => (agent_name, ENGINE_NAME.to_string()),
            Side::Black => (ENGINE_NAME.to_string(), agent_name),
        };
        let headers = PgnHeaders::benchmark(white, black)
            .with_round(self.round)
            .with_termination(outcome.termination.reason());

        GameRecord {
            winner,
            reason: outcome.termination,
            moves: game.moves().to_vec(),
            pgn: game.pgn(&headers, result_token(outcome.loser)),
            final_fen: game.fen(),
            move_count: game.ply_count(),
            agent_color,
        }
    }
}
