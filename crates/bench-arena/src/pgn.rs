//! PGN (Portable Game Notation) export for benchmark games.
//!
//! Finished games are embedded as PGN text in the results file, so this
//! module renders to a `String` rather than writing files of its own.

use chrono::{NaiveDate, Utc};

use crate::board::{ChessGame, Side};

/// Width at which movetext lines are wrapped.
const LINE_WIDTH: usize = 80;

/// Header values for a rendered game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgnHeaders {
    pub event: String,
    pub site: String,
    pub date: NaiveDate,
    pub round: Option<u32>,
    pub white: String,
    pub black: String,
    /// Human-readable termination reason.
    pub termination: Option<String>,
}

impl PgnHeaders {
    /// Headers for a benchmark game played today.
    pub fn benchmark(white: impl Into<String>, black: impl Into<String>) -> Self {
        Self {
            event: "Agine Benchmark".to_string(),
            site: "local".to_string(),
            date: Utc::now().date_naive(),
            round: None,
            white: white.into(),
            black: black.into(),
            termination: None,
        }
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    pub fn with_termination(mut self, reason: impl Into<String>) -> Self {
        self.termination = Some(reason.into());
        self
    }
}

/// Result token for a game, given the losing side (`None` for a draw).
pub fn result_token(loser: Option<Side>) -> &'static str {
    match loser {
        Some(Side::Black) => "1-0",
        Some(Side::White) => "0-1",
        None => "1/2-1/2",
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Numbered movetext followed by the result terminator.
///
/// A game that starts with Black to move opens with `N...`.
fn movetext(game: &ChessGame, result: &str) -> Vec<String> {
    let start = match game.start_fen() {
        Some(fen) => ChessGame::from_fen(fen).ok(),
        None => Some(ChessGame::new()),
    };
    let (mut number, mut side) = start
        .map(|g| (g.fullmove_number(), g.turn()))
        .unwrap_or((1, Side::White));

    let mut tokens = Vec::with_capacity(game.moves().len() * 3 / 2 + 1);
    for (i, mv) in game.moves().iter().enumerate() {
        match side {
            Side::White => tokens.push(format!("{number}.")),
            Side::Black if i == 0 => tokens.push(format!("{number}...")),
            Side::Black => {}
        }
        tokens.push(mv.clone());
        if side == Side::Black {
            number += 1;
        }
        side = side.opponent();
    }
    tokens.push(result.to_string());
    tokens
}

/// Joins tokens into lines no wider than [`LINE_WIDTH`], breaking between
/// tokens only.
fn wrap(tokens: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for token in tokens {
        if !line.is_empty() && line.len() + 1 + token.len() > LINE_WIDTH {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(token);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Renders a game as PGN text.
///
/// # Arguments
///
/// * `game` - The game whose SAN move list is exported.
/// * `headers` - Tag values for the header section.
/// * `result` - Result token (`1-0`, `0-1`, `1/2-1/2` or `*`).
///
/// # Format
///
/// - Seven Tag Roster (Event, Site, Date, Round, White, Black, Result)
/// - `SetUp`/`FEN` tags when the game started from a custom position
/// - `Termination` tag when a reason is known
/// - Blank line, then numbered SAN movetext wrapped at 80 columns and
///   closed by the result token
///
/// # Example
///
/// ```ignore
/// let mut game = ChessGame::new();
/// game.play_san("e4")?;
/// let text = render(&game, &PgnHeaders::benchmark("gemini", "Stockfish"), "*");
/// assert!(text.ends_with("1. e4 *\n"));
/// ```
pub fn render(game: &ChessGame, headers: &PgnHeaders, result: &str) -> String {
    let round = headers
        .round
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut tags = vec![
        ("Event", escape(&headers.event)),
        ("Site", escape(&headers.site)),
        ("Date", headers.date.format("%Y.%m.%d").to_string()),
        ("Round", round),
        ("White", escape(&headers.white)),
        ("Black", escape(&headers.black)),
        ("Result", result.to_string()),
    ];
    if let Some(fen) = game.start_fen() {
        tags.push(("SetUp", "1".to_string()));
        tags.push(("FEN", fen.to_string()));
    }
    if let Some(reason) = &headers.termination {
        tags.push(("Termination", escape(reason)));
    }

    let mut out = String::new();
    for (name, value) in tags {
        out.push_str(&format!("[{name} \"{value}\"]\n"));
    }
    out.push('\n');
    for line in wrap(&movetext(game, result)) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

impl ChessGame {
    /// Exports the game as PGN. See [`render`].
    pub fn pgn(&self, headers: &PgnHeaders, result: &str) -> String {
        render(self, headers, result)
    }
}
