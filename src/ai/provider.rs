use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::prompts::{
    answer_user_prompt, extraction_system_prompt, extraction_user_prompt, summary_system_prompt,
    summary_user_prompt, ANSWER_SYSTEM_PROMPT,
};
use super::{
    CompletionClient, Confidence, ExtractionContent, ExtractionItem, ExtractionKind, ProviderError,
    SummaryContent, SummaryKind, SummarySection,
};

/// Content produced by one completion, with its model and token usage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generated<T> {
    pub content: T,
    pub model: String,
    pub tokens: u32,
}

/// Decoded answer to a question about a transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerContent {
    pub answer: String,
    pub confidence: Confidence,
    pub sources: Vec<String>,
    pub not_found: bool,
}

/// Summarize, extract and answer on top of any completion client.
///
/// Each operation sends a fixed system instruction, then decodes the reply as a
/// single JSON document (surrounding code fences are tolerated). Replies that
/// do not decode are reported as [`ProviderError::Malformed`].
#[derive(Clone)]
pub struct AiProvider {
    client: Arc<dyn CompletionClient>,
}

impl AiProvider {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub fn model(&self) -> String {
        self.client.model()
    }

    pub async fn summarize(
        &self,
        transcript: &str,
        kind: SummaryKind,
    ) -> Result<Generated<SummaryContent>, ProviderError> {
        let completion = self
            .client
            .complete(&summary_system_prompt(kind), &summary_user_prompt(kind, transcript))
            .await?;

        Ok(Generated {
            content: decode_summary(&completion.text)?,
            model: self.client.model(),
            tokens: completion.tokens,
        })
    }

    pub async fn extract(
        &self,
        transcript: &str,
        kind: ExtractionKind,
    ) -> Result<Generated<ExtractionContent>, ProviderError> {
        let completion = self
            .client
            .complete(extraction_system_prompt(kind), &extraction_user_prompt(kind, transcript))
            .await?;

        Ok(Generated {
            content: decode_extraction(&completion.text)?,
            model: self.client.model(),
            tokens: completion.tokens,
        })
    }

    pub async fn answer(
        &self,
        transcript: &str,
        question: &str,
    ) -> Result<Generated<AnswerContent>, ProviderError> {
        let completion = self
            .client
            .complete(ANSWER_SYSTEM_PROMPT, &answer_user_prompt(question, transcript))
            .await?;

        Ok(Generated {
            content: decode_answer(&completion.text)?,
            model: self.client.model(),
            tokens: completion.tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    key_points: Option<Vec<String>>,
    #[serde(default)]
    sections: Option<Vec<SummarySection>>,
}

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    items: Option<Vec<ExtractionItem>>,
}

#[derive(Debug, Deserialize)]
struct AnswerPayload {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    sources: Option<Vec<String>>,
    #[serde(default)]
    not_found: Option<bool>,
}

/// Remove a surrounding markdown code fence, if any
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed)
        .trim();
    unfenced.strip_suffix("```").unwrap_or(unfenced).trim()
}

fn decode<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T, ProviderError> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|err| ProviderError::Malformed(format!("{} response: {}", what, err)))
}

fn decode_summary(raw: &str) -> Result<SummaryContent, ProviderError> {
    let payload: SummaryPayload = decode(raw, "summary")?;

    let key_points = payload
        .key_points
        .unwrap_or_default()
        .into_iter()
        .map(|point| point.trim().to_string())
        .filter(|point| !point.is_empty())
        .collect();

    let sections = payload
        .sections
        .unwrap_or_default()
        .into_iter()
        .map(|section| SummarySection {
            title: section.title.trim().to_string(),
            content: section.content.trim().to_string(),
        })
        .filter(|section| !section.title.is_empty() || !section.content.is_empty())
        .collect();

    Ok(SummaryContent {
        text: payload.text.unwrap_or_default().trim().to_string(),
        key_points,
        sections,
    })
}

fn decode_extraction(raw: &str) -> Result<ExtractionContent, ProviderError> {
    let payload: ExtractionPayload = decode(raw, "extraction")?;

    let items = payload
        .items
        .unwrap_or_default()
        .into_iter()
        .map(|mut item| {
            for value in item.values_mut() {
                if let Value::String(text) = value {
                    *text = text.trim().to_string();
                }
            }
            item
        })
        .collect();

    Ok(ExtractionContent { items })
}

fn decode_answer(raw: &str) -> Result<AnswerContent, ProviderError> {
    let payload: AnswerPayload = decode(raw, "answer")?;

    Ok(AnswerContent {
        answer: payload.answer.unwrap_or_default().trim().to_string(),
        confidence: Confidence::normalize(payload.confidence.as_deref().unwrap_or_default()),
        sources: payload
            .sources
            .unwrap_or_default()
            .into_iter()
            .map(|source| source.trim().to_string())
            .collect(),
        not_found: payload.not_found.unwrap_or(false),
    })
}
