//! Chess position evaluation types.

use serde::Serialize;

/// Represents a chess position evaluation.
///
/// Scores are reported from the point of view of the side to move, as
/// UCI engines emit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Evaluation {
    /// Centipawn evaluation (positive = side to move is better)
    Centipawns(i32),
    /// Mate in N moves (negative = side to move gets mated)
    Mate(i32),
}

impl Evaluation {
    /// Builds an evaluation from the `score cp` / `score mate` fields of a
    /// UCI info line. A mate score wins over a centipawn score.
    pub fn from_uci_score(cp: Option<i32>, mate: Option<i32>) -> Option<Self> {
        match (cp, mate) {
            (_, Some(m)) => Some(Evaluation::Mate(m)),
            (Some(c), None) => Some(Evaluation::Centipawns(c)),
            (None, None) => None,
        }
    }
}

/// One scored line of a multi-PV search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineEval {
    /// 1-based rank of the line (`multipv` field).
    pub multipv: u32,
    /// Depth the line was searched to.
    pub depth: u32,
    /// Score of the line.
    pub evaluation: Evaluation,
    /// Principal variation in UCI notation.
    pub pv: Vec<String>,
}

/// Result of searching a single position.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PositionEval {
    /// Best move in UCI notation, `None` when the engine reported `(none)`.
    pub best_move: Option<String>,
    /// Scored lines ordered by rank.
    pub lines: Vec<LineEval>,
}

impl PositionEval {
    /// Returns the top-ranked line, if any was reported.
    pub fn top_line(&self) -> Option<&LineEval> {
        self.lines.first()
    }
}
