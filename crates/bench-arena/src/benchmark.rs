//! Runs a series of games and reports the results.
//!
//! Games run strictly one after another. The agent takes White in every
//! even-numbered game (0-based) and Black otherwise. After each completed
//! game the cumulative results file is rewritten.

use std::path::{Path, PathBuf};

use agent_llm::{LanguageModel, ModelSettings};
use chrono::{DateTime, Utc};
use engine_analysis::Evaluator;

use crate::board::Side;
use crate::config::BenchConfig;
use crate::game_runner::{GameRecord, GameRunner};
use crate::json_output::{results_path, write_results, RunInfo};
use crate::reconcile::FuzzyMatch;
use crate::stats::{average_moves, rate, GameStats};
use crate::turn::TurnDriver;

/// Assumed plies per game for the duration estimate.
const ESTIMATED_MOVES_PER_GAME: u64 = 40;

const BANNER_WIDTH: usize = 70;

/// Color the agent plays in game `index` (0-based).
pub fn agent_color_for_game(index: u32) -> Side {
    if index % 2 == 0 {
        Side::White
    } else {
        Side::Black
    }
}

/// Results gathered over a run.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkReport {
    pub records: Vec<GameRecord>,
    pub stats: GameStats,
    /// Games that ended with a game-level fault and have no record.
    pub failed_games: u32,
}

/// Sequential game orchestrator.
pub struct Benchmark<M, E> {
    runner: GameRunner<M, E>,
    config: BenchConfig,
    info: RunInfo,
    results_path: PathBuf,
}

impl<M: LanguageModel, E: Evaluator> Benchmark<M, E> {
    /// Creates an orchestrator whose results file is stamped with the
    /// current time.
    pub fn new(model: M, engine: E, settings: ModelSettings, config: BenchConfig) -> Self {
        Self::started_at(model, engine, settings, config, Utc::now())
    }

    /// Like [`Benchmark::new`] with an explicit run start time.
    pub fn started_at(
        model: M,
        engine: E,
        settings: ModelSettings,
        config: BenchConfig,
        started: DateTime<Utc>,
    ) -> Self {
        let info = RunInfo {
            total_games: config.games,
            depth: config.depth,
            skill_level: config.skill_level,
            delay_secs: config.move_delay.as_secs(),
            timeout_secs: config.agent_timeout.as_secs(),
            model: settings.model.clone(),
            provider: settings.provider.to_string(),
            commentary: config.commentary,
        };
        let results_path = results_path(&config.output_dir, &settings.model, config.commentary, started);
        let driver = TurnDriver::new(
            model,
            engine,
            Box::new(FuzzyMatch),
            settings,
            config.turn_options(),
        );
        let runner = GameRunner::new(driver, config.game_options());
        Self {
            runner,
            config,
            info,
            results_path,
        }
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// Plays every game and prints the final summary.
    pub async fn run(&mut self) -> BenchmarkReport {
        print_banner(&self.info, &self.config);
        let mut report = BenchmarkReport::default();

        for index in 0..self.config.games {
            let agent_color = agent_color_for_game(index);
            println!("\n{}", "=".repeat(BANNER_WIDTH));
            println!("GAME {}/{} - Agent as {}", index + 1, self.config.games, agent_color);
            println!("{}", "=".repeat(BANNER_WIDTH));

            match self.runner.play_game(agent_color).await {
                Ok(record) => {
                    report.stats.record(agent_color, record.winner);
                    print_game_result(index, &record);
                    report.records.push(record);
                    self.checkpoint(&report);
                }
                Err(e) => {
                    report.failed_games += 1;
                    tracing::error!("Game {} failed: {}", index + 1, e);
                }
            }

            if index + 1 < self.config.games && !self.config.move_delay.is_zero() {
                println!(
                    "\nWaiting {} seconds before next game...",
                    self.config.move_delay.as_secs()
                );
                tokio::time::sleep(self.config.move_delay).await;
            }
        }

        print_summary(&report);
        report
    }

    fn checkpoint(&self, report: &BenchmarkReport) {
        match write_results(&self.results_path, &self.info, &report.records, &report.stats) {
            Ok(()) => tracing::info!("Results saved to: {}", self.results_path.display()),
            Err(e) => tracing::error!(
                "Failed to save results to {}: {}",
                self.results_path.display(),
                e
            ),
        }
    }
}

fn print_banner(info: &RunInfo, config: &BenchConfig) {
    let estimate_minutes =
        (u64::from(info.total_games) * ESTIMATED_MOVES_PER_GAME * info.delay_secs).div_ceil(60);
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!("AGINE BENCHMARK - Stockfish");
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!("Number of games: {}", info.total_games);
    println!("Stockfish depth: {}", info.depth);
    println!("Stockfish strength: {}", config.strength());
    println!("API delay: {} seconds", info.delay_secs);
    println!("Agent timeout: {} seconds", info.timeout_secs);
    println!("Model: {} ({})", info.model, info.provider);
    println!(
        "Commentary mode: {}",
        if info.commentary {
            "ENABLED (position summary and tactics)"
        } else {
            "DISABLED (FEN only)"
        }
    );
    println!("Max moves per game: {}", config.max_moves);
    println!("Estimated total time: ~{} minutes", estimate_minutes);
    println!("{}", "=".repeat(BANNER_WIDTH));
}

fn print_game_result(index: u32, record: &GameRecord) {
    println!("\n{}", "=".repeat(BANNER_WIDTH));
    println!("GAME {} RESULT", index + 1);
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!("Winner: {}", record.winner);
    println!("Reason: {}", record.reason);
    println!("Total moves: {}", record.move_count);
    println!("Agent color: {}", record.agent_color);
    println!("Final position: {}", record.final_fen);
    println!("\nPGN:\n{}", record.pgn);
}

fn print_summary(report: &BenchmarkReport) {
    let stats = &report.stats;
    let completed = stats.completed_games();
    println!("\n{}", "=".repeat(BANNER_WIDTH));
    println!("BENCHMARK SUMMARY");
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!("Completed games: {}", completed);
    if report.failed_games > 0 {
        println!("Failed games: {}", report.failed_games);
    }
    println!("\nOverall Results:");
    for (label, count) in [
        ("Agent wins", stats.agent_wins()),
        ("Stockfish wins", stats.engine_wins()),
        ("Draws", stats.draws()),
    ] {
        println!("  {}: {} ({:.1}%)", label, count, rate(count, completed));
    }
    for (label, color) in [("As White", Side::White), ("As Black", Side::Black)] {
        let c = stats.for_color(color);
        println!("\n{}:", label);
        println!("  Wins: {}, Losses: {}, Draws: {}", c.wins, c.losses, c.draws);
    }
    println!("\nAverage moves per game: {:.1}", average_moves(&report.records));
    println!("{}", "=".repeat(BANNER_WIDTH));
}
