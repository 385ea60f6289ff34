use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::{ExtractionContent, ExtractionKind, SummaryContent, SummaryKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub youtube_id: String,
    pub title: String,
    pub channel: String,
    pub duration_seconds: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written by a video upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVideo {
    pub youtube_id: String,
    pub title: String,
    pub channel: String,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_ms: i64,
    pub duration_ms: i64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub video_id: String,
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTranscript {
    pub video_id: String,
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSummary {
    pub id: String,
    pub transcript_id: String,
    pub kind: SummaryKind,
    pub content: SummaryContent,
    pub model: String,
    pub tokens_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSummary {
    pub transcript_id: String,
    pub kind: SummaryKind,
    pub content: SummaryContent,
    pub model: String,
    pub tokens_used: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiExtraction {
    pub id: String,
    pub transcript_id: String,
    pub kind: ExtractionKind,
    pub content: ExtractionContent,
    pub model: String,
    pub tokens_used: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExtraction {
    pub transcript_id: String,
    pub kind: ExtractionKind,
    pub content: ExtractionContent,
    pub model: String,
    pub tokens_used: i64,
}
