use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{classify_status, classify_transport, Completion, CompletionClient, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Anthropic messages API client
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: [Message<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body<'a>(&'a self, system: &'a str, user: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            system,
            messages: [Message {
                role: "user",
                content: user,
            }],
            max_tokens: self.max_tokens,
            // Anthropic caps temperature at 1.0
            temperature: self.temperature.min(1.0),
        }
    }
}

fn parse_response(body: &str) -> Result<Completion, ProviderError> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|err| ProviderError::Request(format!("unexpected Anthropic response: {}", err)))?;

    let text = response
        .content
        .into_iter()
        .find(|block| block.kind == "text" || block.kind.is_empty())
        .map(|block| block.text)
        .ok_or_else(|| ProviderError::Request("no content returned from Anthropic".to_string()))?;

    let tokens = response.usage.input_tokens + response.usage.output_tokens;
    Ok(Completion::new(text, tokens))
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, ProviderError> {
        tracing::debug!("Anthropic completion with model {}", self.model);

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.request_body(system, user))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            tracing::warn!("Anthropic returned HTTP {}", status.as_u16());
            return Err(classify_status(status, &body));
        }

        parse_response(&body)
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}
