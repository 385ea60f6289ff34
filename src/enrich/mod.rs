use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::ai::{AiProvider, Confidence, ExtractionKind, SummaryKind};
use crate::storage::{
    AiExtraction, AiSummary, Database, NewExtraction, NewSummary, StoreError, TranscriptSegment,
};
use crate::utils::RequestContext;
use crate::{Error, Result};

const MIN_QUESTION_CHARS: usize = 3;
const MAX_QUESTION_CHARS: usize = 500;

/// Answer to an ad-hoc question. Answers are returned to the caller and
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiAnswer {
    pub id: String,
    pub transcript_id: String,
    pub question: String,
    pub answer: String,
    pub confidence: Confidence,
    pub sources: Vec<String>,
    pub not_found: bool,
    pub model: String,
    pub tokens_used: i64,
    pub created_at: DateTime<Utc>,
}

/// Cache-first summaries and extractions over stored transcripts, plus Q&A.
///
/// Summaries and extractions are keyed by (transcript, kind). A stored record
/// is returned without calling the provider; otherwise the provider runs under
/// its own deadline and the result is stored with create-or-get semantics, so
/// concurrent callers converge on the first stored record.
pub struct Enricher {
    db: Database,
    provider: Option<AiProvider>,
    operation_timeout: Duration,
}

impl Enricher {
    /// `provider` is `None` when no LLM vendor is configured; cached results
    /// are still served in that case.
    pub fn new(db: Database, provider: Option<AiProvider>, operation_timeout: Duration) -> Self {
        Self {
            db,
            provider,
            operation_timeout,
        }
    }

    pub async fn summarize(&self, ctx: &RequestContext, transcript_id: &str, kind: &str) -> Result<AiSummary> {
        let kind = SummaryKind::parse(kind).ok_or_else(|| Error::InvalidKind {
            kind: kind.trim().to_string(),
            allowed: allowed(SummaryKind::ALL.iter().map(|k| k.as_str())),
        })?;

        match self.db.get_summary(transcript_id, kind).await {
            Ok(summary) => {
                tracing::debug!("Serving cached {} summary for transcript {}", kind, transcript_id);
                return Ok(summary);
            }
            Err(StoreError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }

        let text = self.load_text(transcript_id).await?;
        let provider = self.provider()?.clone();

        tracing::info!("Generating {} summary for transcript {}", kind, transcript_id);
        let generated = ctx
            .scoped(self.operation_timeout)
            .run(async move { provider.summarize(&text, kind).await })
            .await??;

        let summary = self
            .db
            .create_summary(&NewSummary {
                transcript_id: transcript_id.to_string(),
                kind,
                content: generated.content,
                model: generated.model,
                tokens_used: i64::from(generated.tokens),
            })
            .await?;

        Ok(summary)
    }

    pub async fn extract(&self, ctx: &RequestContext, transcript_id: &str, kind: &str) -> Result<AiExtraction> {
        let kind = ExtractionKind::parse(kind).ok_or_else(|| Error::InvalidKind {
            kind: kind.trim().to_string(),
            allowed: allowed(ExtractionKind::ALL.iter().map(|k| k.as_str())),
        })?;

        match self.db.get_extraction(transcript_id, kind).await {
            Ok(extraction) => {
                tracing::debug!("Serving cached {} extraction for transcript {}", kind, transcript_id);
                return Ok(extraction);
            }
            Err(StoreError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }

        let text = self.load_text(transcript_id).await?;
        let provider = self.provider()?.clone();

        tracing::info!("Extracting {} from transcript {}", kind, transcript_id);
        let generated = ctx
            .scoped(self.operation_timeout)
            .run(async move { provider.extract(&text, kind).await })
            .await??;

        let extraction = self
            .db
            .create_extraction(&NewExtraction {
                transcript_id: transcript_id.to_string(),
                kind,
                content: generated.content,
                model: generated.model,
                tokens_used: i64::from(generated.tokens),
            })
            .await?;

        Ok(extraction)
    }

    pub async fn answer(&self, ctx: &RequestContext, transcript_id: &str, question: &str) -> Result<AiAnswer> {
        let question = question.trim().to_string();
        let length = question.chars().count();
        if !(MIN_QUESTION_CHARS..=MAX_QUESTION_CHARS).contains(&length) {
            return Err(Error::InvalidQuestion(format!(
                "question must be {}-{} characters, got {}",
                MIN_QUESTION_CHARS, MAX_QUESTION_CHARS, length
            )));
        }

        let text = self.load_text(transcript_id).await?;
        let provider = self.provider()?.clone();

        tracing::info!("Answering question about transcript {}", transcript_id);
        let asked = question.clone();
        let generated = ctx
            .scoped(self.operation_timeout)
            .run(async move { provider.answer(&text, &asked).await })
            .await??;

        Ok(AiAnswer {
            id: Uuid::new_v4().to_string(),
            transcript_id: transcript_id.to_string(),
            question,
            answer: generated.content.answer,
            confidence: generated.content.confidence,
            sources: generated.content.sources,
            not_found: generated.content.not_found,
            model: generated.model,
            tokens_used: i64::from(generated.tokens),
            created_at: Utc::now(),
        })
    }

    fn provider(&self) -> Result<&AiProvider> {
        self.provider.as_ref().ok_or_else(|| {
            Error::Provider(crate::ai::ProviderError::NotConfigured(
                "no AI provider is configured".to_string(),
            ))
        })
    }

    async fn load_text(&self, transcript_id: &str) -> Result<String> {
        let transcript = match self.db.get_transcript(transcript_id).await {
            Ok(transcript) => transcript,
            Err(StoreError::NotFound) => return Err(Error::TranscriptNotFound(transcript_id.to_string())),
            Err(err) => return Err(err.into()),
        };

        let text = assemble_transcript_text(&transcript.segments);
        if text.is_empty() {
            return Err(Error::ContentUnavailable(format!(
                "transcript {} has no text",
                transcript_id
            )));
        }
        Ok(text)
    }
}

/// Join the non-empty, trimmed segment texts with single spaces, in order
pub fn assemble_transcript_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn allowed<'a>(kinds: impl Iterator<Item = &'a str>) -> String {
    kinds.collect::<Vec<_>>().join(", ")
}
