use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{classify_status, classify_transport, Completion, CompletionClient, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat completions client
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u32,
}

impl OpenAiClient {
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

    /// Point the client at a compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body<'a>(&'a self, system: &'a str, user: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

fn parse_response(body: &str) -> Result<Completion, ProviderError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|err| ProviderError::Request(format!("unexpected OpenAI response: {}", err)))?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::Request("no completion choices returned".to_string()))?;

    let tokens = response.usage.map(|usage| usage.total_tokens).unwrap_or(0);
    Ok(Completion::new(text, tokens))
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, ProviderError> {
        tracing::debug!("OpenAI completion with model {}", self.model);

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(system, user))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            tracing::warn!("OpenAI returned HTTP {}", status.as_u16());
            return Err(classify_status(status, &body));
        }

        parse_response(&body)
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let client = OpenAiClient::new("sk-test", "gpt-4", 4000, 0.7);
        let body = serde_json::to_value(client.request_body("be terse", "hello")).unwrap();

        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be terse");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"text\":\"hi\"}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let completion = parse_response(body).unwrap();
        assert_eq!(completion, Completion::new("{\"text\":\"hi\"}", 15));
    }

    #[test]
    fn test_parse_response_without_choices() {
        assert!(matches!(parse_response(r#"{"choices": []}"#), Err(ProviderError::Request(_))));
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = OpenAiClient::new("k", "m", 1, 0.0).with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }
}
