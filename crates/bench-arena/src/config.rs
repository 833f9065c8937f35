//! Configuration for a benchmark run.
//!
//! Three sources feed a run: positional command-line values, the optional
//! `bench.toml` file and environment variables naming the agent's model.
//! [`BenchConfig`] is the resolved result handed to the orchestrator.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use agent_llm::{InstructionMode, ModelSettings, Provider, UnknownProvider};
use engine_analysis::EngineStrength;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::DrawRule;
use crate::game_runner::{DrawPriority, GameOptions};
use crate::turn::TurnOptions;

pub const DEFAULT_GAMES: u32 = 5;
pub const DEFAULT_DEPTH: u32 = 15;
pub const DEFAULT_DELAY_SECS: u64 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SKILL_LEVEL: u32 = 1000;

pub const DEFAULT_PROVIDER: Provider = Provider::Google;
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Errors that can occur when loading or resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// `AGINE_PROVIDER` names no supported provider.
    #[error(transparent)]
    UnknownProvider(#[from] UnknownProvider),
    /// A value is present but unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings read from `bench.toml`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BenchFileConfig {
    /// Path to the Stockfish binary. Defaults to `stockfish` on `PATH`.
    pub stockfish_path: String,
    /// Ply cap per game.
    pub max_moves: usize,
    /// Consecutive failures that abort a game.
    pub max_consecutive_errors: u32,
    /// Pause before retrying a failed turn.
    pub retry_backoff_secs: u64,
    /// Lines requested from the engine per search.
    pub multi_pv: u32,
    /// Directory the results file is written to.
    pub output_dir: PathBuf,
    /// Reporting order for simultaneous draw conditions.
    pub draw_priority: Vec<DrawRule>,
}

impl Default for BenchFileConfig {
    fn default() -> Self {
        Self {
            stockfish_path: "stockfish".to_string(),
            max_moves: 200,
            max_consecutive_errors: 3,
            retry_backoff_secs: 5,
            multi_pv: 2,
            output_dir: PathBuf::from("."),
            draw_priority: DrawRule::ALL.to_vec(),
        }
    }
}

impl BenchFileConfig {
    /// Returns the default configuration path, `bench.toml` in the
    /// current working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("bench.toml")
    }

    /// Loads the file at `path`, or the defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }
}

/// Parses a positional value, falling back to `default` when it is absent,
/// unparseable or rejected by `accept`.
pub fn parse_or_default<T: FromStr>(value: Option<&str>, default: T, accept: impl Fn(&T) -> bool) -> T {
    value
        .and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| accept(v))
        .unwrap_or(default)
}

/// Values taken from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub games: u32,
    pub depth: u32,
    pub delay_secs: u64,
    pub timeout_secs: u64,
    pub skill_level: u32,
    pub commentary: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            games: DEFAULT_GAMES,
            depth: DEFAULT_DEPTH,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            skill_level: DEFAULT_SKILL_LEVEL,
            commentary: true,
        }
    }
}

impl RunArgs {
    /// Builds arguments from `[GAMES] [DEPTH] [DELAY] [TIMEOUT] [SKILL]`.
    ///
    /// Games, depth and timeout must be positive; delay and skill accept 0.
    pub fn from_positional(values: &[Option<String>], commentary: bool) -> Self {
        let at = |i: usize| values.get(i).and_then(|v| v.as_deref());
        Self {
            games: parse_or_default(at(0), DEFAULT_GAMES, |&n| n > 0),
            depth: parse_or_default(at(1), DEFAULT_DEPTH, |&n| n > 0),
            delay_secs: parse_or_default(at(2), DEFAULT_DELAY_SECS, |_| true),
            timeout_secs: parse_or_default(at(3), DEFAULT_TIMEOUT_SECS, |&n| n > 0),
            skill_level: parse_or_default(at(4), DEFAULT_SKILL_LEVEL, |_| true),
            commentary,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Builds the agent's model settings from environment lookups.
///
/// `lookup` is `std::env::var` in the binary; tests pass a map.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownProvider`] when `AGINE_PROVIDER` is set to
/// an unsupported value.
pub fn model_settings_from_env(
    lookup: impl Fn(&str) -> Option<String>,
    commentary: bool,
) -> Result<ModelSettings, ConfigError> {
    let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let provider = match present("AGINE_PROVIDER") {
        Some(name) => name.parse::<Provider>()?,
        None => DEFAULT_PROVIDER,
    };
    let model = present("AGINE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let api_key = present("AGINE_API_KEY").unwrap_or_default();
    let mode = if commentary {
        InstructionMode::Bench
    } else {
        InstructionMode::BenchNoCommentary
    };

    let mut settings = ModelSettings::new(provider, model.trim(), api_key.trim()).with_mode(mode);
    if let Some(language) = present("AGINE_LANG") {
        settings.language = language.trim().to_string();
    }
    settings.routed = present("AGINE_ROUTED").is_some_and(|v| is_truthy(&v));
    settings.ollama_base_url = present("OLLAMA_BASE_URL").map(|v| v.trim().to_string());
    Ok(settings)
}

/// Fully resolved settings for a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub games: u32,
    pub depth: u32,
    /// Pause after every move and between games.
    pub move_delay: Duration,
    pub agent_timeout: Duration,
    /// Raw strength setting as given on the command line.
    pub skill_level: u32,
    pub commentary: bool,
    pub max_moves: usize,
    pub max_consecutive_errors: u32,
    pub retry_backoff: Duration,
    pub stockfish_path: String,
    pub multi_pv: u32,
    pub output_dir: PathBuf,
    pub draw_priority: DrawPriority,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::assemble(&RunArgs::default(), BenchFileConfig::default(), DrawPriority::default())
    }
}

impl BenchConfig {
    /// Combines command-line values with the file configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero `max_moves`, `multi_pv`
    /// or `max_consecutive_errors`, or a draw rule listed twice.
    pub fn resolve(args: &RunArgs, file: BenchFileConfig) -> Result<Self, ConfigError> {
        if file.max_moves == 0 {
            return Err(ConfigError::Invalid("max_moves must be positive".to_string()));
        }
        if file.multi_pv == 0 {
            return Err(ConfigError::Invalid("multi_pv must be positive".to_string()));
        }
        if file.max_consecutive_errors == 0 {
            return Err(ConfigError::Invalid(
                "max_consecutive_errors must be positive".to_string(),
            ));
        }
        let draw_priority = DrawPriority::new(&file.draw_priority).map_err(|rule| {
            ConfigError::Invalid(format!("draw rule {rule:?} listed more than once"))
        })?;
        Ok(Self::assemble(args, file, draw_priority))
    }

    fn assemble(args: &RunArgs, file: BenchFileConfig, draw_priority: DrawPriority) -> Self {
        Self {
            games: args.games,
            depth: args.depth,
            move_delay: Duration::from_secs(args.delay_secs),
            agent_timeout: Duration::from_secs(args.timeout_secs),
            skill_level: args.skill_level,
            commentary: args.commentary,
            max_moves: file.max_moves,
            max_consecutive_errors: file.max_consecutive_errors,
            retry_backoff: Duration::from_secs(file.retry_backoff_secs),
            stockfish_path: file.stockfish_path,
            multi_pv: file.multi_pv,
            output_dir: file.output_dir,
            draw_priority,
        }
    }

    pub fn strength(&self) -> EngineStrength {
        EngineStrength::from_setting(self.skill_level)
    }

    pub fn turn_options(&self) -> TurnOptions {
        TurnOptions {
            agent_timeout: self.agent_timeout,
            depth: self.depth,
            strength: self.strength(),
            commentary: self.commentary,
        }
    }

    pub fn game_options(&self) -> GameOptions {
        GameOptions {
            max_moves: self.max_moves,
            max_consecutive_errors: self.max_consecutive_errors,
            move_delay: self.move_delay,
            retry_backoff: self.retry_backoff,
            draw_priority: self.draw_priority.clone(),
        }
    }
}
