//! HTTP clients for the supported providers.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::instructions::system_instruction;
use crate::settings::{ModelSettings, Provider};

/// Token budget requested from providers that require one.
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Errors from a model invocation.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered with a non-success status.
    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body did not have the expected shape.
    #[error("Malformed provider response: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The response contained no text.
    #[error("Provider response contained no text")]
    EmptyResponse,
}

/// The model collaborator: turns a prompt into text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str, settings: &ModelSettings) -> Result<String, ModelError>;
}

/// Base URLs for each API, overridable for proxies and tests.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub openai: String,
    pub anthropic: String,
    pub google: String,
    pub openrouter: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openai: "https://api.openai.com/v1".to_string(),
            anthropic: "https://api.anthropic.com/v1".to_string(),
            google: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openrouter: "https://openrouter.ai/api/v1".to_string(),
        }
    }
}

/// Wire format of a provider's response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseFormat {
    ChatCompletions,
    AnthropicMessages,
    GeminiContent,
    OllamaChat,
}

/// A fully described provider request.
#[derive(Debug)]
struct ProviderRequest {
    url: String,
    headers: Vec<(&'static str, String)>,
    body: Value,
    format: ResponseFormat,
}

fn build_request(
    endpoints: &Endpoints,
    settings: &ModelSettings,
    system: &str,
    prompt: &str,
) -> ProviderRequest {
    let chat_messages = json!([
        { "role": "system", "content": system },
        { "role": "user", "content": prompt },
    ]);

    if settings.routed {
        return ProviderRequest {
            url: format!("{}/chat/completions", endpoints.openrouter),
            headers: vec![("Authorization", format!("Bearer {}", settings.api_key))],
            body: json!({
                "model": format!("{}/{}", settings.provider, settings.model),
                "messages": chat_messages,
            }),
            format: ResponseFormat::ChatCompletions,
        };
    }

    match settings.provider {
        Provider::OpenAi => ProviderRequest {
            url: format!("{}/chat/completions", endpoints.openai),
            headers: vec![("Authorization", format!("Bearer {}", settings.api_key))],
            body: json!({
                "model": settings.model,
                "messages": chat_messages,
            }),
            format: ResponseFormat::ChatCompletions,
        },
        Provider::Anthropic => ProviderRequest {
            url: format!("{}/messages", endpoints.anthropic),
            headers: vec![
                ("x-api-key", settings.api_key.clone()),
                ("anthropic-version", "2023-06-01".to_string()),
            ],
            body: json!({
                "model": settings.model,
                "max_tokens": MAX_OUTPUT_TOKENS,
                "system": system,
                "messages": [{ "role": "user", "content": prompt }],
            }),
            format: ResponseFormat::AnthropicMessages,
        },
        Provider::Google => ProviderRequest {
            url: format!(
                "{}/models/{}:generateContent",
                endpoints.google, settings.model
            ),
            headers: vec![("x-goog-api-key", settings.api_key.clone())],
            body: json!({
                "systemInstruction": { "parts": [{ "text": system }] },
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            }),
            format: ResponseFormat::GeminiContent,
        },
        Provider::Ollama => ProviderRequest {
            url: format!("{}/chat", settings.ollama_base_url().trim_end_matches('/')),
            headers: Vec::new(),
            body: json!({
                "model": settings.model,
                "messages": chat_messages,
                "stream": false,
            }),
            format: ResponseFormat::OllamaChat,
        },
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicMessage {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct OllamaChat {
    message: ChatMessage,
}

fn parse_response(format: ResponseFormat, body: &str) -> Result<String, ModelError> {
    let text: Option<String> = match format {
        ResponseFormat::ChatCompletions => {
            let parsed: ChatCompletion = serde_json::from_str(body)?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
        }
        ResponseFormat::AnthropicMessages => {
            let parsed: AnthropicMessage = serde_json::from_str(body)?;
            let text: String = parsed
                .content
                .into_iter()
                .filter(|b| b.kind == "text")
                .filter_map(|b| b.text)
                .collect();
            Some(text)
        }
        ResponseFormat::GeminiContent => {
            let parsed: GeminiResponse = serde_json::from_str(body)?;
            parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        }
        ResponseFormat::OllamaChat => {
            let parsed: OllamaChat = serde_json::from_str(body)?;
            parsed.message.content
        }
    };

    match text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(ModelError::EmptyResponse),
    }
}

/// [`LanguageModel`] backed by the providers' HTTP APIs.
#[derive(Debug, Clone, Default)]
pub struct HttpModel {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }
}

#[async_trait]
impl LanguageModel for HttpModel {
    async fn generate(&self, prompt: &str, settings: &ModelSettings) -> Result<String, ModelError> {
        let system = system_instruction(settings.mode, &settings.language);
        let request = build_request(&self.endpoints, settings, &system, prompt);
        tracing::debug!(
            "POST {} ({} {}, mode {})",
            request.url,
            settings.provider,
            settings.model,
            settings.mode
        );

        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(request.format, &body)
    }
}
