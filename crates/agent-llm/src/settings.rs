//! Provider selection and per-call model settings.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::instructions::InstructionMode;

/// Default Ollama API base URL.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/api";

/// Error returned when a provider name is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown provider: {0} (expected openai, anthropic, google or ollama)")]
pub struct UnknownProvider(pub String);

/// A language-model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    Ollama,
}

impl Provider {
    /// Returns the lowercase provider identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Ollama => "ollama",
        }
    }

    /// Hosted providers need a credential; a local Ollama server does not.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::Ollama)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "google" => Ok(Provider::Google),
            "ollama" => Ok(Provider::Ollama),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Settings for a single model invocation.
#[derive(Clone)]
pub struct ModelSettings {
    pub provider: Provider,
    /// Provider-specific model identifier, e.g. `gemini-2.5-flash`.
    pub model: String,
    pub api_key: String,
    /// Language the agent should answer in.
    pub language: String,
    pub mode: InstructionMode,
    /// Route the call through OpenRouter as `provider/model`.
    pub routed: bool,
    /// Base URL of the Ollama API; `None` uses [`DEFAULT_OLLAMA_BASE_URL`].
    pub ollama_base_url: Option<String>,
}

impl ModelSettings {
    /// Settings with English output, the position mode and no routing.
    pub fn new(provider: Provider, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: api_key.into(),
            language: "English".to_string(),
            mode: InstructionMode::Position,
            routed: false,
            ollama_base_url: None,
        }
    }

    pub fn with_mode(mut self, mode: InstructionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn ollama_base_url(&self) -> &str {
        self.ollama_base_url
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_BASE_URL)
    }
}

impl fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("language", &self.language)
            .field("mode", &self.mode)
            .field("routed", &self.routed)
            .field("ollama_base_url", &self.ollama_base_url)
            .finish()
    }
}
