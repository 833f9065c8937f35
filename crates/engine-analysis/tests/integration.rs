//! Integration tests for engine-analysis crate.
//!
//! These tests require Stockfish to be installed and available in PATH.
//! Run with: `cargo test -p engine-analysis --test integration -- --ignored`

use engine_analysis::format::{best_move_san, format_principal_variation};
use engine_analysis::{EngineStrength, Evaluator, Stockfish};

/// Check if Stockfish is available in PATH.
fn stockfish_available() -> bool {
    std::process::Command::new("stockfish")
        .arg("quit")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_engine_multipv_analysis() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let mut engine = Stockfish::new("stockfish", 2);
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    let eval = engine
        .evaluate(fen, 10, EngineStrength::SkillLevel(20))
        .await
        .expect("Failed to analyze starting position");

    assert!(
        engine
            .name()
            .map(|n| n.to_lowercase().contains("stockfish"))
            .unwrap_or(false),
        "Engine name should contain 'Stockfish'"
    );
    assert!(eval.best_move.is_some(), "Best move should be reported");
    assert_eq!(eval.lines.len(), 2, "MultiPV 2 should report two lines");
    assert!(eval.lines[0].depth >= 10);

    let san = best_move_san(fen, &eval).expect("Best move should convert to SAN");
    assert!(!san.is_empty());
    assert!(!format_principal_variation(&eval.lines[0].pv, fen).is_empty());

    engine.quit().await.expect("Failed to quit engine");
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_engine_finds_mate_in_one_at_low_elo() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let mut engine = Stockfish::new("stockfish", 1);
    let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";
    engine.new_game().await.expect("new_game should succeed");
    let eval = engine
        .evaluate(fen, 12, EngineStrength::from_setting(3000))
        .await
        .expect("Failed to analyze position");

    assert_eq!(best_move_san(fen, &eval).unwrap(), "Qxf7#");
}
