//! Stockfish engine wrapper for move selection.

use std::collections::BTreeMap;
use std::fmt;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::evaluation::{Evaluation, LineEval, PositionEval};

/// Maximum number of lines to read before giving up on a UCI response.
pub const MAX_UCI_LINES: usize = 5000;

/// Errors that can occur when working with chess engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process or talk to it.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[from] std::io::Error),
    /// Engine failed to initialize properly (UCI handshake failed).
    #[error("Engine initialization failed")]
    InitFailed,
    /// Engine closed its output stream.
    #[error("Engine closed unexpectedly")]
    Closed,
    /// Engine returned an invalid or unexpected response.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
    /// Engine kept searching past the line limit without a `bestmove`.
    #[error("Engine sent {0} lines without bestmove")]
    NoBestMove(usize),
}

impl EngineError {
    /// Returns true if the engine process can no longer be used.
    fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::SpawnError(_)
                | EngineError::Closed
                | EngineError::InitFailed
                | EngineError::NoBestMove(_)
        )
    }
}

/// Playing strength requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStrength {
    /// Stockfish `Skill Level` (0-20).
    SkillLevel(u8),
    /// Target Elo through `UCI_LimitStrength`.
    Elo(u32),
}

impl EngineStrength {
    /// Highest value interpreted as a skill level.
    pub const MAX_SKILL_LEVEL: u32 = 20;
    /// Lowest Elo Stockfish accepts for `UCI_Elo`.
    pub const MIN_ELO: u32 = 1320;
    /// Highest Elo Stockfish accepts for `UCI_Elo`.
    pub const MAX_ELO: u32 = 3190;

    /// Interprets a single numeric setting.
    ///
    /// Values up to [`Self::MAX_SKILL_LEVEL`] are skill levels, anything
    /// larger is a target Elo clamped to what the engine supports.
    pub fn from_setting(value: u32) -> Self {
        if value <= Self::MAX_SKILL_LEVEL {
            EngineStrength::SkillLevel(value as u8)
        } else {
            EngineStrength::Elo(value.clamp(Self::MIN_ELO, Self::MAX_ELO))
        }
    }

    /// UCI options (name, value) that select this strength.
    pub fn uci_options(&self) -> Vec<(&'static str, String)> {
        match self {
            EngineStrength::SkillLevel(level) => vec![
                ("UCI_LimitStrength", "false".to_string()),
                ("Skill Level", level.to_string()),
            ],
            EngineStrength::Elo(elo) => vec![
                ("UCI_LimitStrength", "true".to_string()),
                ("UCI_Elo", elo.to_string()),
            ],
        }
    }
}

impl fmt::Display for EngineStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStrength::SkillLevel(level) => write!(f, "skill level {}", level),
            EngineStrength::Elo(elo) => write!(f, "Elo {}", elo),
        }
    }
}

/// Source of engine moves for the game loop.
#[async_trait]
pub trait Evaluator: Send {
    /// Resets engine state between games.
    async fn new_game(&mut self) -> Result<(), EngineError>;

    /// Searches `fen` to `depth` at the given strength.
    async fn evaluate(
        &mut self,
        fen: &str,
        depth: u32,
        strength: EngineStrength,
    ) -> Result<PositionEval, EngineError>;
}

/// A running UCI engine process.
struct Process {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    name: String,
}

impl Process {
    async fn spawn(path: &str, multi_pv: u32) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or(EngineError::InitFailed)?;
        let stdout = child.stdout.take().ok_or(EngineError::InitFailed)?;

        let mut process = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            name: String::new(),
        };
        process.init_uci(multi_pv).await?;
        Ok(process)
    }

    async fn init_uci(&mut self, multi_pv: u32) -> Result<(), EngineError> {
        self.send("uci").await?;

        let mut name = String::new();
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed);
            }
            lines_read += 1;
            let line = self.read_line().await?;
            if let Some(id) = line.strip_prefix("id name ") {
                name = id.to_string();
            } else if line == "uciok" {
                break;
            }
        }

        self.name = if name.is_empty() {
            "Unknown Engine".to_string()
        } else {
            name
        };

        self.set_option("MultiPV", &multi_pv.max(1).to_string())
            .await?;
        self.sync().await
    }

    async fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.send(&format!("setoption name {} value {}", name, value))
            .await
    }

    /// Sends `isready` and waits for `readyok`.
    async fn sync(&mut self) -> Result<(), EngineError> {
        self.send("isready").await?;
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed);
            }
            lines_read += 1;
            if self.read_line().await? == "readyok" {
                return Ok(());
            }
        }
    }

    async fn search(&mut self, fen: &str, depth: u32) -> Result<PositionEval, EngineError> {
        self.send(&format!("position fen {}", fen)).await?;
        self.send(&format!("go depth {}", depth)).await?;

        let mut lines: BTreeMap<u32, LineEval> = BTreeMap::new();
        for _ in 0..MAX_UCI_LINES {
            let line = self.read_line().await?;

            if line.starts_with("info ") {
                if let Some(parsed) = parse_info_line(&line) {
                    lines.insert(parsed.multipv, parsed);
                }
            } else if let Some(rest) = line.strip_prefix("bestmove") {
                // "bestmove e2e4 ponder e7e5" or "bestmove (none)"
                let best_move = rest
                    .split_whitespace()
                    .next()
                    .filter(|mv| *mv != "(none)" && *mv != "0000")
                    .map(str::to_string);
                return Ok(PositionEval {
                    best_move,
                    lines: lines.into_values().collect(),
                });
            }
        }

        // The search may still be running, so its output can't be trusted.
        Err(EngineError::NoBestMove(MAX_UCI_LINES))
    }

    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        tracing::trace!(">> {}", command);
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        match self.stdout.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(EngineError::Closed),
        }
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Parse a UCI info line into a scored line.
///
/// Format: "info depth X multipv N score cp Y nodes Z pv move1 move2 ..."
/// Lines without depth or score (e.g. `currmove` updates) yield `None`.
/// A missing `multipv` field means rank 1.
pub fn parse_info_line(line: &str) -> Option<LineEval> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"info") || parts.get(1) == Some(&"string") {
        return None;
    }

    let mut depth: Option<u32> = None;
    let mut multipv: u32 = 1;
    let mut cp: Option<i32> = None;
    let mut mate: Option<i32> = None;
    let mut pv: Vec<String> = Vec::new();
    let mut in_pv = false;

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" if !in_pv => {
                depth = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 1;
            }
            "multipv" if !in_pv => {
                multipv = parts.get(i + 1).and_then(|v| v.parse().ok()).unwrap_or(1);
                i += 1;
            }
            "score" if !in_pv => match parts.get(i + 1) {
                Some(&"cp") => {
                    cp = parts.get(i + 2).and_then(|v| v.parse().ok());
                    i += 2;
                }
                Some(&"mate") => {
                    mate = parts.get(i + 2).and_then(|v| v.parse().ok());
                    i += 2;
                }
                _ => {}
            },
            "pv" => {
                in_pv = true;
            }
            token => {
                if in_pv {
                    pv.push(token.to_string());
                }
            }
        }
        i += 1;
    }

    Some(LineEval {
        multipv,
        depth: depth?,
        evaluation: Evaluation::from_uci_score(cp, mate)?,
        pv,
    })
}

/// Stockfish (or any UCI engine) driven over stdin/stdout.
///
/// The process is spawned on first use. If it dies or stops answering,
/// it is dropped and the next call spawns a fresh one.
pub struct Stockfish {
    path: String,
    multi_pv: u32,
    process: Option<Process>,
    /// Strength currently configured on the running process.
    strength: Option<EngineStrength>,
}

impl Stockfish {
    /// Creates a client for the engine at `path` reporting `multi_pv` lines.
    pub fn new(path: impl Into<String>, multi_pv: u32) -> Self {
        Self {
            path: path.into(),
            multi_pv,
            process: None,
            strength: None,
        }
    }

    /// Returns the engine's name once it has been started.
    pub fn name(&self) -> Option<&str> {
        self.process.as_ref().map(|p| p.name.as_str())
    }

    async fn try_evaluate(
        &mut self,
        fen: &str,
        depth: u32,
        strength: EngineStrength,
    ) -> Result<PositionEval, EngineError> {
        if self.process.is_none() {
            let process = Process::spawn(&self.path, self.multi_pv).await?;
            tracing::info!("Started engine: {}", process.name);
            self.process = Some(process);
            self.strength = None;
        }
        let process = self.process.as_mut().ok_or(EngineError::InitFailed)?;

        if self.strength != Some(strength) {
            for (name, value) in strength.uci_options() {
                process.set_option(name, &value).await?;
            }
            process.sync().await?;
            self.strength = Some(strength);
            tracing::debug!("Engine strength set to {}", strength);
        }

        process.search(fen, depth).await
    }

    /// Sends `quit` and waits for the process to exit.
    pub async fn quit(&mut self) -> Result<(), EngineError> {
        if let Some(mut process) = self.process.take() {
            process.send("quit").await?;
            let _ = process.child.wait().await;
        }
        Ok(())
    }
}

#[async_trait]
impl Evaluator for Stockfish {
    async fn new_game(&mut self) -> Result<(), EngineError> {
        let Some(process) = self.process.as_mut() else {
            return Ok(());
        };
        let result = match process.send("ucinewgame").await {
            Ok(()) => process.sync().await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            if e.is_fatal() {
                self.process = None;
                self.strength = None;
            }
        }
        result
    }

    async fn evaluate(
        &mut self,
        fen: &str,
        depth: u32,
        strength: EngineStrength,
    ) -> Result<PositionEval, EngineError> {
        let result = self.try_evaluate(fen, depth, strength).await;
        if let Err(e) = &result {
            if e.is_fatal() {
                tracing::warn!("Discarding engine process: {}", e);
                self.process = None;
                self.strength = None;
            }
        }
        result
    }
}
