//! Position commentary added to agent prompts in commentary mode.
//!
//! Everything here is derived from the position alone: a summary of the
//! material and king situation plus the forcing moves on offer.

use std::fmt::Write;

use shakmaty::{Bitboard, Board, CastlingSide, Color, Position, Role, Square};

use crate::board::{ChessGame, Side};

/// Roles counted towards material, with their usual point values.
const MATERIAL: [(Role, u32); 5] = [
    (Role::Pawn, 1),
    (Role::Knight, 3),
    (Role::Bishop, 3),
    (Role::Rook, 5),
    (Role::Queen, 9),
];

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}

/// Material held by one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Material {
    pub pawns: usize,
    pub knights: usize,
    pub bishops: usize,
    pub rooks: usize,
    pub queens: usize,
}

impl Material {
    fn of(board: &Board, color: Color) -> Self {
        let count = |role: Role| (board.by_color(color) & board.by_role(role)).count();
        Self {
            pawns: count(Role::Pawn),
            knights: count(Role::Knight),
            bishops: count(Role::Bishop),
            rooks: count(Role::Rook),
            queens: count(Role::Queen),
        }
    }

    /// Total in pawn units.
    pub fn points(&self) -> u32 {
        let counts = [self.pawns, self.knights, self.bishops, self.rooks, self.queens];
        MATERIAL
            .iter()
            .zip(counts)
            .map(|((_, value), n)| value * n as u32)
            .sum()
    }
}

/// Static facts about the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSummary {
    pub side_to_move: Side,
    pub fullmove: u32,
    pub white: Material,
    pub black: Material,
    pub white_castling: String,
    pub black_castling: String,
    pub in_check: bool,
}

impl PositionSummary {
    pub fn of(game: &ChessGame) -> Self {
        let position = game.position();
        let board = position.board();
        Self {
            side_to_move: game.turn(),
            fullmove: game.fullmove_number(),
            white: Material::of(board, Color::White),
            black: Material::of(board, Color::Black),
            white_castling: castling_rights(position, Color::White),
            black_castling: castling_rights(position, Color::Black),
            in_check: game.is_check(),
        }
    }

    /// Material balance in pawn units, positive when White is ahead.
    pub fn balance(&self) -> i64 {
        i64::from(self.white.points()) - i64::from(self.black.points())
    }
}

fn castling_rights(position: &shakmaty::Chess, color: Color) -> String {
    let castles = position.castles();
    let sides: Vec<&str> = [(CastlingSide::KingSide, "O-O"), (CastlingSide::QueenSide, "O-O-O")]
        .into_iter()
        .filter(|(side, _)| castles.has(color, *side))
        .map(|(_, notation)| notation)
        .collect();
    if sides.is_empty() {
        "none".to_string()
    } else {
        sides.join(", ")
    }
}

/// Forcing moves and loose pieces in the current position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TacticalNotes {
    pub captures: Vec<String>,
    pub checks: Vec<String>,
    pub mates: Vec<String>,
    /// Own pieces attacked and not defended, e.g. `knight on f3`.
    pub hanging: Vec<String>,
    /// Opponent pieces attacked and not defended.
    pub targets: Vec<String>,
}

impl TacticalNotes {
    pub fn of(game: &ChessGame) -> Self {
        let position = game.position();
        let mut notes = TacticalNotes::default();
        for m in position.legal_moves() {
            let san = game.san(&m);
            if san.ends_with('#') {
                notes.mates.push(san);
            } else if san.ends_with('+') {
                notes.checks.push(san);
            } else if m.is_capture() {
                notes.captures.push(san);
            }
        }
        let us = position.turn();
        notes.hanging = undefended(position.board(), us);
        notes.targets = undefended(position.board(), us.other());
        notes
    }
}

/// Non-king pieces of `color` attacked by the opponent with no defender.
fn undefended(board: &Board, color: Color) -> Vec<String> {
    let occupied = board.occupied();
    let pieces: Bitboard = board.by_color(color) & !board.by_role(Role::King);
    pieces
        .into_iter()
        .filter(|&sq: &Square| {
            board.attacks_to(sq, color.other(), occupied).any()
                && !board.attacks_to(sq, color, occupied).any()
        })
        .filter_map(|sq| board.role_at(sq).map(|role| format!("{} on {}", role_name(role), sq)))
        .collect()
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Renders the summary and tactical notes as prompt text.
pub fn describe(game: &ChessGame) -> String {
    let summary = PositionSummary::of(game);
    let notes = TacticalNotes::of(game);
    let mut out = String::new();

    let _ = writeln!(out, "Position summary:");
    let _ = writeln!(
        out,
        "- {} to move, move {}{}",
        summary.side_to_move,
        summary.fullmove,
        if summary.in_check { ", in check" } else { "" }
    );
    for (name, material) in [("White", summary.white), ("Black", summary.black)] {
        let _ = writeln!(
            out,
            "- {name} material: {} points ({}P {}N {}B {}R {}Q)",
            material.points(),
            material.pawns,
            material.knights,
            material.bishops,
            material.rooks,
            material.queens
        );
    }
    let balance = summary.balance();
    let _ = match balance {
        0 => writeln!(out, "- Material is level"),
        b if b > 0 => writeln!(out, "- White is up {b} points"),
        b => writeln!(out, "- Black is up {} points", -b),
    };
    let _ = writeln!(
        out,
        "- Castling rights: White {}, Black {}",
        summary.white_castling, summary.black_castling
    );

    let _ = writeln!(out, "Tactical notes:");
    let _ = writeln!(out, "- Mating moves: {}", list_or_none(&notes.mates));
    let _ = writeln!(out, "- Checking moves: {}", list_or_none(&notes.checks));
    let _ = writeln!(out, "- Captures: {}", list_or_none(&notes.captures));
    let _ = writeln!(out, "- Your undefended pieces under attack: {}", list_or_none(&notes.hanging));
    let _ = writeln!(out, "- Undefended enemy pieces you attack: {}", list_or_none(&notes.targets));
    out
}
