use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod prompts;
pub mod provider;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use provider::{AiProvider, AnswerContent, Generated};

use crate::config::AiConfig;
use crate::utils::truncate_chars;

/// Summary styles the enrichment layer accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    Brief,
    Detailed,
    KeyPoints,
}

impl SummaryKind {
    pub const ALL: [SummaryKind; 3] = [SummaryKind::Brief, SummaryKind::Detailed, SummaryKind::KeyPoints];

    /// Parse a kind after trimming and lower-casing it
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "brief" => Some(SummaryKind::Brief),
            "detailed" => Some(SummaryKind::Detailed),
            "key_points" => Some(SummaryKind::KeyPoints),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryKind::Brief => "brief",
            SummaryKind::Detailed => "detailed",
            SummaryKind::KeyPoints => "key_points",
        }
    }
}

impl fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured extraction targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    Code,
    Quotes,
    ActionItems,
}

impl ExtractionKind {
    pub const ALL: [ExtractionKind; 3] = [ExtractionKind::Code, ExtractionKind::Quotes, ExtractionKind::ActionItems];

    /// Parse a kind after trimming and lower-casing it
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "code" => Some(ExtractionKind::Code),
            "quotes" => Some(ExtractionKind::Quotes),
            "action_items" => Some(ExtractionKind::ActionItems),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionKind::Code => "code",
            ExtractionKind::Quotes => "quotes",
            ExtractionKind::ActionItems => "action_items",
        }
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a generated summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryContent {
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SummarySection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySection {
    pub title: String,
    pub content: String,
}

/// One extracted record. Keys depend on the extraction kind:
///
/// - code: `language`, `code`, `context`, `timestamp_hint`
/// - quotes: `quote`, `speaker`, `context`, `importance`
/// - action_items: `action`, `category`, `priority`, `context`
pub type ExtractionItem = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionContent {
    #[serde(default)]
    pub items: Vec<ExtractionItem>,
}

/// How sure the model is about an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Lower-case and map onto the three levels; anything unrecognized is medium
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "low" => Confidence::Low,
            _ => Confidence::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Raw completion returned by a vendor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens: u32,
}

impl Completion {
    pub fn new(text: impl Into<String>, tokens: u32) -> Self {
        Self {
            text: text.into(),
            tokens,
        }
    }
}

/// Vendor failures, translated once at the client boundary
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("AI provider rate limit reached")]
    RateLimited,

    #[error("AI provider quota exceeded")]
    QuotaExceeded,

    #[error("AI service unavailable: {0}")]
    Unavailable(String),

    #[error("AI provider not configured: {0}")]
    NotConfigured(String),

    #[error("AI response could not be parsed: {0}")]
    Malformed(String),

    #[error("AI request failed: {0}")]
    Request(String),
}

/// Chat-style completion endpoint of one LLM vendor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one system instruction and one user prompt, returning the raw reply
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, ProviderError>;

    /// Model name recorded alongside generated content
    fn model(&self) -> String;
}

/// Supported LLM vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(ProviderError::NotConfigured(format!("unknown AI provider: {}", other))),
        }
    }
}

/// The configured vendor client
pub enum LlmBackend {
    OpenAi(OpenAiClient),
    Anthropic(AnthropicClient),
    Gemini(GeminiClient),
}

impl LlmBackend {
    /// Build the client for the configured vendor. A missing API key is
    /// reported as `NotConfigured`.
    pub fn from_config(config: &AiConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("no API key set for {}", config.provider))
            })?
            .to_string();

        let backend = match config.provider {
            ProviderKind::OpenAi => LlmBackend::OpenAi(OpenAiClient::new(
                api_key,
                &config.model,
                config.max_tokens,
                config.temperature,
            )),
            ProviderKind::Anthropic => LlmBackend::Anthropic(AnthropicClient::new(
                api_key,
                &config.model,
                config.max_tokens,
                config.temperature,
            )),
            ProviderKind::Gemini => LlmBackend::Gemini(GeminiClient::new(
                api_key,
                &config.model,
                config.max_tokens,
                config.temperature,
            )),
        };

        tracing::debug!("Using {} with model {}", config.provider, config.model);
        Ok(backend)
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            LlmBackend::OpenAi(_) => ProviderKind::OpenAi,
            LlmBackend::Anthropic(_) => ProviderKind::Anthropic,
            LlmBackend::Gemini(_) => ProviderKind::Gemini,
        }
    }
}

#[async_trait]
impl CompletionClient for LlmBackend {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, ProviderError> {
        match self {
            LlmBackend::OpenAi(client) => client.complete(system, user).await,
            LlmBackend::Anthropic(client) => client.complete(system, user).await,
            LlmBackend::Gemini(client) => client.complete(system, user).await,
        }
    }

    fn model(&self) -> String {
        match self {
            LlmBackend::OpenAi(client) => client.model(),
            LlmBackend::Anthropic(client) => client.model(),
            LlmBackend::Gemini(client) => client.model(),
        }
    }
}

/// Translate a non-success vendor response into the provider taxonomy
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let lower = body.to_lowercase();
    let mentions_quota = lower.contains("quota") || lower.contains("billing");

    match status {
        StatusCode::TOO_MANY_REQUESTS if mentions_quota => ProviderError::QuotaExceeded,
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        StatusCode::PAYMENT_REQUIRED => ProviderError::QuotaExceeded,
        status if status.is_server_error() => {
            ProviderError::Unavailable(format!("HTTP {}", status.as_u16()))
        }
        status => ProviderError::Request(format!(
            "HTTP {}: {}",
            status.as_u16(),
            truncate_chars(body.trim(), 200)
        )),
    }
}

/// Translate a transport failure into the provider taxonomy, without the request URL
pub(crate) fn classify_transport(err: reqwest::Error) -> ProviderError {
    let err = err.without_url();
    if err.is_connect() || err.is_timeout() {
        ProviderError::Unavailable(err.to_string())
    } else {
        ProviderError::Request(err.to_string())
    }
}
