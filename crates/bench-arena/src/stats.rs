//! Win/loss/draw bookkeeping across a benchmark run.

use serde::Serialize;

use crate::board::Side;
use crate::game_runner::{GameRecord, Winner};

/// Results for the agent while playing one color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColorStats {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl ColorStats {
    pub fn games(&self) -> u32 {
        self.wins + self.losses + self.draws
    }
}

/// Per-color results from the agent's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GameStats {
    #[serde(rename = "agentAsWhite")]
    pub as_white: ColorStats,
    #[serde(rename = "agentAsBlack")]
    pub as_black: ColorStats,
}

impl GameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed game played by the agent as `agent_color`.
    pub fn record(&mut self, agent_color: Side, winner: Winner) {
        let bucket = match agent_color {
            Side::White => &mut self.as_white,
            Side::Black => &mut self.as_black,
        };
        match winner {
            Winner::Agent => bucket.wins += 1,
            Winner::Stockfish => bucket.losses += 1,
            Winner::Draw => bucket.draws += 1,
        }
    }

    pub fn for_color(&self, color: Side) -> &ColorStats {
        match color {
            Side::White => &self.as_white,
            Side::Black => &self.as_black,
        }
    }

    pub fn agent_wins(&self) -> u32 {
        self.as_white.wins + self.as_black.wins
    }

    pub fn engine_wins(&self) -> u32 {
        self.as_white.losses + self.as_black.losses
    }

    pub fn draws(&self) -> u32 {
        self.as_white.draws + self.as_black.draws
    }

    pub fn completed_games(&self) -> u32 {
        self.as_white.games() + self.as_black.games()
    }
}

/// Percentage of `part` in `total`, zero when `total` is zero.
pub fn rate(part: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(part) * 100.0 / f64::from(total)
    }
}

/// Mean move count of the given games, zero for an empty slice.
pub fn average_moves(records: &[GameRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let total: usize = records.iter().map(|r| r.move_count).sum();
    total as f64 / records.len() as f64
}
