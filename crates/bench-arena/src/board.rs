//! Game state on top of the `shakmaty` rules engine.
//!
//! [`ChessGame`] adds what a single [`Chess`] position does not carry:
//! the SAN move list, the repetition history and the start position.

use std::fmt;

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};
use thiserror::Error;

/// Halfmove clock value at which the fifty-move rule applies.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// Error type for game operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// The FEN could not be parsed into a legal position.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),
    /// The move is not legal in the current position.
    #[error("illegal move: {0}")]
    IllegalMove(String),
    /// The game has already ended.
    #[error("game has already ended")]
    GameAlreadyOver,
}

/// A side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A draw condition reported by the rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawRule {
    Stalemate,
    ThreefoldRepetition,
    InsufficientMaterial,
    FiftyMoveRule,
}

impl DrawRule {
    /// All draw rules in their default reporting order.
    pub const ALL: [DrawRule; 4] = [
        DrawRule::Stalemate,
        DrawRule::ThreefoldRepetition,
        DrawRule::InsufficientMaterial,
        DrawRule::FiftyMoveRule,
    ];
}

/// Position key used for repetition detection: placement, side to move,
/// castling rights and en passant square.
fn repetition_key(position: &Chess) -> String {
    let fen = Fen::from_position(position.clone(), EnPassantMode::Legal).to_string();
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// A chess game with history tracking.
#[derive(Debug, Clone)]
pub struct ChessGame {
    /// Current position.
    position: Chess,
    /// FEN of a custom starting position, `None` for the standard one.
    start_fen: Option<String>,
    /// Repetition keys of every position reached, including the start.
    history: Vec<String>,
    /// Moves played, in SAN.
    moves: Vec<String>,
}

impl Default for ChessGame {
    fn default() -> Self {
        Self::new()
    }
}

impl ChessGame {
    /// Creates a new game with the standard starting position.
    pub fn new() -> Self {
        let position = Chess::default();
        Self {
            history: vec![repetition_key(&position)],
            position,
            start_fen: None,
            moves: Vec::new(),
        }
    }

    /// Creates a game from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, BoardError> {
        let parsed: Fen = fen
            .parse()
            .map_err(|_| BoardError::InvalidFen(fen.to_string()))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|_| BoardError::InvalidFen(fen.to_string()))?;
        Ok(Self {
            history: vec![repetition_key(&position)],
            position,
            start_fen: Some(fen.trim().to_string()),
            moves: Vec::new(),
        })
    }

    /// Returns a reference to the current position.
    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// FEN of the custom start position, if the game did not start normally.
    pub fn start_fen(&self) -> Option<&str> {
        self.start_fen.as_deref()
    }

    /// Returns the current position as a FEN string.
    pub fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    /// Side to move.
    pub fn turn(&self) -> Side {
        self.position.turn().into()
    }

    pub fn fullmove_number(&self) -> u32 {
        self.position.fullmoves().get()
    }

    /// Returns the number of half-moves (plies) played.
    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    /// Returns the move history in SAN.
    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    /// Legal moves in SAN, including `+`/`#` suffixes.
    pub fn legal_moves(&self) -> Vec<String> {
        self.position
            .legal_moves()
            .iter()
            .map(|m| self.san(m))
            .collect()
    }

    /// SAN (with suffix) of a move in the current position.
    pub fn san(&self, m: &Move) -> String {
        SanPlus::from_move(self.position.clone(), m).to_string()
    }

    /// Makes a move given in SAN notation. Returns the canonical SAN.
    pub fn play_san(&mut self, text: &str) -> Result<String, BoardError> {
        if self.is_game_over() {
            return Err(BoardError::GameAlreadyOver);
        }
        let san: SanPlus = text
            .trim()
            .parse()
            .map_err(|_| BoardError::IllegalMove(text.to_string()))?;
        let m = san
            .san
            .to_move(&self.position)
            .map_err(|_| BoardError::IllegalMove(text.to_string()))?;
        Ok(self.apply_move(m))
    }

    /// Makes a move given in UCI notation. Returns the SAN.
    pub fn play_uci(&mut self, text: &str) -> Result<String, BoardError> {
        if self.is_game_over() {
            return Err(BoardError::GameAlreadyOver);
        }
        let uci: UciMove = text
            .trim()
            .parse()
            .map_err(|_| BoardError::IllegalMove(text.to_string()))?;
        let m = uci
            .to_move(&self.position)
            .map_err(|_| BoardError::IllegalMove(text.to_string()))?;
        Ok(self.apply_move(m))
    }

    /// Internal method to apply a legal move.
    fn apply_move(&mut self, m: Move) -> String {
        let san = SanPlus::from_move_and_play_unchecked(&mut self.position, &m).to_string();
        self.history.push(repetition_key(&self.position));
        self.moves.push(san.clone());
        san
    }

    /// Counts how many times the current position has occurred.
    pub fn position_count(&self) -> usize {
        let current = repetition_key(&self.position);
        self.history.iter().filter(|&k| *k == current).count()
    }

    pub fn is_check(&self) -> bool {
        self.position.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    pub fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }

    pub fn is_insufficient_material(&self) -> bool {
        self.position.is_insufficient_material()
    }

    pub fn is_threefold_repetition(&self) -> bool {
        self.position_count() >= 3
    }

    pub fn is_fifty_move_rule(&self) -> bool {
        self.position.halfmoves() >= FIFTY_MOVE_HALFMOVES
    }

    /// Returns true if `rule` currently holds.
    pub fn draw_holds(&self, rule: DrawRule) -> bool {
        match rule {
            DrawRule::Stalemate => self.is_stalemate(),
            DrawRule::ThreefoldRepetition => self.is_threefold_repetition(),
            DrawRule::InsufficientMaterial => self.is_insufficient_material(),
            DrawRule::FiftyMoveRule => self.is_fifty_move_rule(),
        }
    }

    /// Every draw rule that currently holds, in default order.
    pub fn draw_conditions(&self) -> Vec<DrawRule> {
        DrawRule::ALL
            .into_iter()
            .filter(|&rule| self.draw_holds(rule))
            .collect()
    }

    pub fn is_draw(&self) -> bool {
        !self.is_checkmate() && DrawRule::ALL.into_iter().any(|rule| self.draw_holds(rule))
    }

    /// Returns true if the game has ended by checkmate or a draw rule.
    pub fn is_game_over(&self) -> bool {
        self.is_checkmate() || self.is_draw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_all(game: &mut ChessGame, moves: &[&str]) {
        for mv in moves {
            game.play_san(mv).unwrap();
        }
    }

    #[test]
    fn test_new_game() {
        let game = ChessGame::new();
        assert_eq!(game.ply_count(), 0);
        assert_eq!(game.turn(), Side::White);
        assert_eq!(game.legal_moves().len(), 20);
        assert_eq!(
            game.fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        assert!(!game.is_game_over());
        assert!(game.start_fen().is_none());
    }

    #[test]
    fn test_play_san_and_uci() {
        let mut game = ChessGame::new();
        assert_eq!(game.play_san("e4").unwrap(), "e4");
        assert_eq!(game.play_uci("e7e5").unwrap(), "e5");
        assert_eq!(game.play_san("Nf3").unwrap(), "Nf3");
        assert_eq!(game.moves(), &["e4", "e5", "Nf3"]);
        assert_eq!(game.turn(), Side::Black);
        assert_eq!(game.fullmove_number(), 2);
    }

    #[test]
    fn test_illegal_move() {
        let mut game = ChessGame::new();
        assert!(matches!(game.play_san("e5"), Err(BoardError::IllegalMove(_))));
        assert!(matches!(game.play_uci("e2e5"), Err(BoardError::IllegalMove(_))));
        assert!(matches!(game.play_san("banana"), Err(BoardError::IllegalMove(_))));
        assert_eq!(game.ply_count(), 0);
    }

    #[test]
    fn test_legal_moves_carry_check_suffix() {
        let mut game = ChessGame::new();
        play_all(&mut game, &["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6"]);
        let legal = game.legal_moves();
        assert!(legal.contains(&"Qxf7#".to_string()));
        assert!(legal.contains(&"Bxf7+".to_string()));
    }

    #[test]
    fn test_checkmate_fools_mate() {
        let mut game = ChessGame::new();
        play_all(&mut game, &["f3", "e5", "g4", "Qh4#"]);
        assert!(game.is_checkmate());
        assert!(game.is_game_over());
        assert!(!game.is_draw());
        assert_eq!(game.turn(), Side::White);
        assert_eq!(game.play_san("e3"), Err(BoardError::GameAlreadyOver));
    }

    #[test]
    fn test_stalemate() {
        let game = ChessGame::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(game.is_stalemate());
        assert!(game.is_draw());
        assert_eq!(game.draw_conditions(), vec![DrawRule::Stalemate]);
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = ChessGame::new();
        play_all(&mut game, &["Nf3", "Nf6", "Ng1", "Ng8"]);
        assert_eq!(game.position_count(), 2);
        assert!(!game.is_threefold_repetition());

        play_all(&mut game, &["Nf3", "Nf6", "Ng1", "Ng8"]);
        assert_eq!(game.position_count(), 3);
        assert!(game.is_threefold_repetition());
        assert_eq!(game.draw_conditions(), vec![DrawRule::ThreefoldRepetition]);
    }

    #[test]
    fn test_fifty_move_rule() {
        let mut game = ChessGame::from_fen("8/8/8/8/8/8/8/R3K2k w Q - 99 60").unwrap();
        assert!(!game.is_fifty_move_rule());
        game.play_san("Ra2").unwrap();
        assert!(game.is_fifty_move_rule());
        assert_eq!(game.draw_conditions(), vec![DrawRule::FiftyMoveRule]);
    }

    #[test]
    fn test_insufficient_material() {
        let game = ChessGame::from_fen("8/8/8/8/8/8/8/4K2k w - - 0 1").unwrap();
        assert!(game.is_insufficient_material());
        assert!(game.is_game_over());
    }

    #[test]
    fn test_stalemate_with_insufficient_material_reports_both() {
        // Lone black king on a8 stalemated by the white king and knight.
        let game = ChessGame::from_fen("k7/2K5/2N5/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(
            game.draw_conditions(),
            vec![DrawRule::Stalemate, DrawRule::InsufficientMaterial]
        );
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(
            ChessGame::from_fen("not a fen"),
            Err(BoardError::InvalidFen(_))
        ));
    }

    #[test]
    fn test_side_conversions() {
        assert_eq!(Side::from(Color::Black), Side::Black);
        assert_eq!(Color::from(Side::White), Color::White);
        assert_eq!(Side::White.opponent(), Side::Black);
        assert_eq!(Side::Black.to_string(), "black");
        assert_eq!(serde_json::to_string(&Side::White).unwrap(), "\"white\"");
    }
}
