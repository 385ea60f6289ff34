use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{classify_status, classify_transport, Completion, CompletionClient, ProviderError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: u32,
}

impl GeminiClient {
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

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        )
    }

    fn request_body<'a>(&self, system: &'a str, user: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: [Part { text: system }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: user }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: self.temperature,
            },
        }
    }
}

fn parse_response(body: &str) -> Result<Completion, ProviderError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|err| ProviderError::Request(format!("unexpected Gemini response: {}", err)))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().map(|part| part.text).collect())
        .ok_or_else(|| ProviderError::Request("no candidates returned from Gemini".to_string()))?;

    let tokens = response
        .usage_metadata
        .map(|usage| usage.total_token_count)
        .unwrap_or(0);

    Ok(Completion::new(text, tokens))
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, ProviderError> {
        tracing::debug!("Gemini completion with model {}", self.model);

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&self.request_body(system, user))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            tracing::warn!("Gemini returned HTTP {}", status.as_u16());
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
    fn test_endpoint_keeps_key_out_of_url() {
        let client = GeminiClient::new("SECRET-KEY-123", "gemini-1.5-flash", 100, 0.2);
        let endpoint = client.endpoint();
        assert_eq!(
            endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert!(!endpoint.contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn test_connection_failure_does_not_leak_key() {
        let client = GeminiClient::new("SECRET-KEY-123", "gemini-pro", 100, 0.2)
            .with_base_url("http://127.0.0.1:1/v1beta");

        let err = client.complete("sys", "usr").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)), "got {:?}", err);
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!err.to_string().contains("127.0.0.1"));
    }

    #[test]
    fn test_request_body_shape() {
        let client = GeminiClient::new("k", "gemini-pro", 256, 0.5);
        let body = serde_json::to_value(client.request_body("sys", "usr")).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "usr");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let body = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"items\":"}, {"text": "[]}"}]}}],
            "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 2, "totalTokenCount": 42}
        }"#;

        assert_eq!(parse_response(body).unwrap(), Completion::new("{\"items\":[]}", 42));
    }

    #[test]
    fn test_parse_response_without_candidates() {
        assert!(matches!(parse_response(r#"{"candidates": []}"#), Err(ProviderError::Request(_))));
    }
}
