use std::path::PathBuf;

use agent_llm::HttpModel;
use bench_arena::benchmark::Benchmark;
use bench_arena::config::{model_settings_from_env, BenchConfig, BenchFileConfig, RunArgs};
use clap::Parser;
use engine_analysis::Stockfish;
use tracing_subscriber::EnvFilter;

/// Benchmark a language-model chess agent against Stockfish.
#[derive(Parser)]
#[command(name = "agine-bench")]
#[command(about = "Benchmark a language-model chess agent against Stockfish")]
struct Cli {
    /// Number of games to play [default: 5]
    games: Option<String>,
    /// Stockfish search depth [default: 15]
    depth: Option<String>,
    /// Delay after each move and between games, in seconds [default: 1]
    delay_secs: Option<String>,
    /// Agent response timeout, in seconds [default: 60]
    timeout_secs: Option<String>,
    /// Stockfish skill level (0-20) or target Elo [default: 1000]
    skill: Option<String>,

    /// Prompt with the FEN and legal moves only
    #[arg(long)]
    no_ccp: bool,

    /// Path to the bench configuration file
    #[arg(long, default_value_os_t = BenchFileConfig::config_path())]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let args = RunArgs::from_positional(
        &[cli.games, cli.depth, cli.delay_secs, cli.timeout_secs, cli.skill],
        !cli.no_ccp,
    );
    let file_config = BenchFileConfig::load_from(&cli.config)?;
    let config = BenchConfig::resolve(&args, file_config)?;
    let settings = model_settings_from_env(|key| std::env::var(key).ok(), config.commentary)?;

    if settings.provider.requires_api_key() && settings.api_key.is_empty() {
        tracing::warn!(
            "AGINE_API_KEY is not set; requests to {} will likely be rejected",
            settings.provider
        );
    }
    tracing::debug!("Model settings: {:?}", settings);

    let engine = Stockfish::new(config.stockfish_path.clone(), config.multi_pv);
    let mut bench = Benchmark::new(HttpModel::new(), engine, settings, config);
    let results_path = bench.results_path().to_path_buf();

    tokio::select! {
        _ = bench.run() => {
            println!("\nBenchmark completed successfully!");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::warn!(
                "Interrupted; results of completed games are in {}",
                results_path.display()
            );
        }
    }
    Ok(())
}
