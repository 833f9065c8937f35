//! Human-readable rendering of engine output.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Position};
use thiserror::Error;

use crate::evaluation::{Evaluation, LineEval, PositionEval};

/// Number of plies shown when rendering a principal variation.
pub const PV_DISPLAY_PLIES: usize = 6;

/// Errors converting engine output into SAN.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// The FEN could not be parsed into a legal position.
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    /// The engine reported neither a best move nor a principal variation.
    #[error("Engine reported no move")]
    NoMove,
    /// The engine move is not legal in the position.
    #[error("Illegal engine move: {0}")]
    IllegalMove(String),
}

fn position_from_fen(fen: &str) -> Result<Chess, FormatError> {
    let parsed: Fen = fen
        .parse()
        .map_err(|_| FormatError::InvalidFen(fen.to_string()))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|_| FormatError::InvalidFen(fen.to_string()))
}

/// Formats a line score as `M3`, `+0.35`, `-1.20` or `0.00`.
pub fn format_evaluation(line: &LineEval) -> String {
    match line.evaluation {
        Evaluation::Mate(moves) => format!("M{}", moves),
        Evaluation::Centipawns(cp) => {
            let pawns = cp as f64 / 100.0;
            if cp > 0 {
                format!("+{:.2}", pawns)
            } else {
                format!("{:.2}", pawns)
            }
        }
    }
}

/// Renders the first plies of a UCI principal variation as SAN.
///
/// Stops at the first move that does not parse or is not legal; an
/// unparsable FEN gives an empty string.
pub fn format_principal_variation(pv: &[String], fen: &str) -> String {
    let Ok(mut pos) = position_from_fen(fen) else {
        return String::new();
    };

    let mut moves = Vec::new();
    for text in pv.iter().take(PV_DISPLAY_PLIES) {
        let Ok(uci) = text.parse::<UciMove>() else {
            break;
        };
        let Ok(m) = uci.to_move(&pos) else {
            break;
        };
        moves.push(SanPlus::from_move_and_play_unchecked(&mut pos, &m).to_string());
    }
    moves.join(" ")
}

/// Returns the engine's chosen move in SAN.
///
/// Uses `best_move`, falling back to the first move of the top line.
pub fn best_move_san(fen: &str, eval: &PositionEval) -> Result<String, FormatError> {
    let pos = position_from_fen(fen)?;
    let text = eval
        .best_move
        .as_deref()
        .or_else(|| eval.top_line().and_then(|l| l.pv.first().map(String::as_str)))
        .ok_or(FormatError::NoMove)?;

    let uci: UciMove = text
        .parse()
        .map_err(|_| FormatError::IllegalMove(text.to_string()))?;
    let m = uci
        .to_move(&pos)
        .map_err(|_| FormatError::IllegalMove(text.to_string()))?;
    Ok(SanPlus::from_move(pos, &m).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn line(evaluation: Evaluation, pv: &[&str]) -> LineEval {
        LineEval {
            multipv: 1,
            depth: 10,
            evaluation,
            pv: pv.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_format_evaluation() {
        assert_eq!(format_evaluation(&line(Evaluation::Mate(3), &[])), "M3");
        assert_eq!(format_evaluation(&line(Evaluation::Mate(-2), &[])), "M-2");
        assert_eq!(format_evaluation(&line(Evaluation::Centipawns(35), &[])), "+0.35");
        assert_eq!(format_evaluation(&line(Evaluation::Centipawns(-120), &[])), "-1.20");
        assert_eq!(format_evaluation(&line(Evaluation::Centipawns(0), &[])), "0.00");
    }

    #[test]
    fn test_format_principal_variation() {
        let pv: Vec<String> = ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            format_principal_variation(&pv, START_FEN),
            "e4 e5 Nf3 Nc6 Bb5 a6"
        );
    }

    #[test]
    fn test_format_principal_variation_stops_at_illegal_move() {
        let pv = vec!["e2e4".to_string(), "e2e4".to_string(), "g1f3".to_string()];
        assert_eq!(format_principal_variation(&pv, START_FEN), "e4");
        assert_eq!(format_principal_variation(&pv, "not a fen"), "");
    }

    #[test]
    fn test_best_move_san_marks_checks() {
        // After 1.e4 e5 2.Bc4 Nc6 3.Qh5 Nf6, Qxf7 is mate.
        let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";
        let eval = PositionEval {
            best_move: Some("h5f7".to_string()),
            lines: vec![],
        };
        assert_eq!(best_move_san(fen, &eval).unwrap(), "Qxf7#");
    }

    #[test]
    fn test_best_move_san_falls_back_to_pv() {
        let eval = PositionEval {
            best_move: None,
            lines: vec![line(Evaluation::Centipawns(20), &["g1f3", "d7d5"])],
        };
        assert_eq!(best_move_san(START_FEN, &eval).unwrap(), "Nf3");
    }

    #[test]
    fn test_best_move_san_errors() {
        assert_eq!(
            best_move_san(START_FEN, &PositionEval::default()),
            Err(FormatError::NoMove)
        );
        let eval = PositionEval {
            best_move: Some("e2e5".to_string()),
            lines: vec![],
        };
        assert_eq!(
            best_move_san(START_FEN, &eval),
            Err(FormatError::IllegalMove("e2e5".to_string()))
        );
        assert!(matches!(
            best_move_san("garbage", &eval),
            Err(FormatError::InvalidFen(_))
        ));
    }
}
