//! JSON results file for a benchmark run.
//!
//! The file is rewritten after every completed game, so an interrupted run
//! still leaves the results of the games it finished.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::game_runner::GameRecord;
use crate::stats::GameStats;

/// Errors that can occur while writing the results file.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write results: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run-level values echoed into the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub total_games: u32,
    pub depth: u32,
    pub skill_level: u32,
    pub delay_secs: u64,
    pub timeout_secs: u64,
    pub model: String,
    pub provider: String,
    pub commentary: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary<'a> {
    total_games: u32,
    completed_games: u32,
    agent_wins: u32,
    stockfish_wins: u32,
    draws: u32,
    stockfish_depth: u32,
    skill_level: u32,
    api_delay_seconds: u64,
    agent_timeout_seconds: u64,
    model: &'a str,
    provider: &'a str,
    ccp_enabled: bool,
    stats: &'a GameStats,
}

#[derive(Serialize)]
struct ResultsDocument<'a> {
    summary: Summary<'a>,
    games: &'a [GameRecord],
}

/// Results file name for a run started at `started`.
///
/// `/` and `:` in the model name become `_`; the timestamp is ISO-8601 UTC
/// with `:` replaced by `-`.
pub fn results_filename(model: &str, commentary: bool, started: DateTime<Utc>) -> String {
    let model = model.replace(|c: char| c == '/' || c == ':', "_");
    let mode = if commentary { "ccp" } else { "no-ccp" };
    let timestamp = started
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace(':', "-");
    format!("benchmark_results_{model}_{mode}_{timestamp}.json")
}

/// Results file path inside `dir`.
pub fn results_path(dir: &Path, model: &str, commentary: bool, started: DateTime<Utc>) -> PathBuf {
    dir.join(results_filename(model, commentary, started))
}

/// Writes the cumulative results document to `path`.
///
/// The document is written to a sibling temporary file first and renamed
/// over `path`, so readers never see a half-written file.
///
/// # Format
///
/// ```json
/// {
///   "summary": {
///     "totalGames": 5, "completedGames": 2, "agentWins": 0,
///     "stockfishWins": 2, "draws": 0, "stockfishDepth": 15,
///     "skillLevel": 1000, "apiDelaySeconds": 1, "agentTimeoutSeconds": 60,
///     "model": "gemini-2.5-flash", "provider": "google", "ccpEnabled": true,
///     "stats": { "agentAsWhite": { "wins": 0, "losses": 1, "draws": 0 }, "agentAsBlack": { ... } }
///   },
///   "games": [
///     { "winner": "stockfish", "reason": "checkmate", "moves": ["e4", ...],
///       "pgn": "...", "finalFen": "...", "moveCount": 58, "agentColor": "white" }
///   ]
/// }
/// ```
pub fn write_results(
    path: &Path,
    info: &RunInfo,
    records: &[GameRecord],
    stats: &GameStats,
) -> Result<(), OutputError> {
    let document = ResultsDocument {
        summary: Summary {
            total_games: info.total_games,
            completed_games: stats.completed_games(),
            agent_wins: stats.agent_wins(),
            stockfish_wins: stats.engine_wins(),
            draws: stats.draws(),
            stockfish_depth: info.depth,
            skill_level: info.skill_level,
            api_delay_seconds: info.delay_secs,
            agent_timeout_seconds: info.timeout_secs,
            model: &info.model,
            provider: &info.provider,
            ccp_enabled: info.commentary,
            stats,
        },
        games: records,
    };

    let json = serde_json::to_string_pretty(&document)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Side;
    use crate::game_runner::{Termination, Winner};
    use chrono::TimeZone;

    fn info() -> RunInfo {
        RunInfo {
            total_games: 4,
            depth: 15,
            skill_level: 1000,
            delay_secs: 1,
            timeout_secs: 60,
            model: "gemini-2.5-flash".to_string(),
            provider: "google".to_string(),
            commentary: true,
        }
    }

    fn record(winner: Winner, agent_color: Side) -> GameRecord {
        GameRecord {
            winner,
            reason: Termination::Checkmate,
            moves: vec!["f3".into(), "e5".into(), "g4".into(), "Qh4#".into()],
            pgn: "1. f3 e5 2. g4 Qh4# 0-1".to_string(),
            final_fen: "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3".to_string(),
            move_count: 4,
            agent_color,
        }
    }

    #[test]
    fn test_results_filename() {
        let started = Utc.with_ymd_and_hms(2025, 1, 15, 12, 34, 56).unwrap();
        assert_eq!(
            results_filename("meta/llama-3:8b", false, started),
            "benchmark_results_meta_llama-3_8b_no-ccp_2025-01-15T12-34-56.000Z.json"
        );
        assert!(results_filename("gemini-2.5-flash", true, started)
            .starts_with("benchmark_results_gemini-2.5-flash_ccp_"));
    }

    #[test]
    fn test_write_results_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let records = vec![record(Winner::Stockfish, Side::White)];
        let mut stats = GameStats::new();
        stats.record(Side::White, Winner::Stockfish);

        write_results(&path, &info(), &records, &stats).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let summary = &json["summary"];
        assert_eq!(summary["totalGames"], 4);
        assert_eq!(summary["completedGames"], 1);
        assert_eq!(summary["agentWins"], 0);
        assert_eq!(summary["stockfishWins"], 1);
        assert_eq!(summary["draws"], 0);
        assert_eq!(summary["stockfishDepth"], 15);
        assert_eq!(summary["skillLevel"], 1000);
        assert_eq!(summary["apiDelaySeconds"], 1);
        assert_eq!(summary["agentTimeoutSeconds"], 60);
        assert_eq!(summary["model"], "gemini-2.5-flash");
        assert_eq!(summary["provider"], "google");
        assert_eq!(summary["ccpEnabled"], true);
        assert_eq!(summary["stats"]["agentAsWhite"]["losses"], 1);

        let game = &json["games"][0];
        assert_eq!(game["winner"], "stockfish");
        assert_eq!(game["reason"], "checkmate");
        assert_eq!(game["moves"][3], "Qh4#");
        assert_eq!(game["moveCount"], 4);
        assert_eq!(game["agentColor"], "white");
        assert!(game["finalFen"].as_str().unwrap().ends_with("w KQkq - 1 3"));
        assert!(game["pgn"].is_string());
    }

    #[test]
    fn test_rewrite_replaces_previous_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut stats = GameStats::new();
        let mut records = Vec::new();

        for (i, color) in [Side::White, Side::Black].into_iter().enumerate() {
            records.push(record(Winner::Agent, color));
            stats.record(color, Winner::Agent);
            write_results(&path, &info(), &records, &stats).unwrap();

            let json: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(json["games"].as_array().unwrap().len(), i + 1);
        }

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("results.json");
        let err = write_results(&path, &info(), &[], &GameStats::new()).unwrap_err();
        assert!(matches!(err, OutputError::Io(_)));
    }
}
