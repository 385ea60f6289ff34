use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod fetcher;
pub mod rate_limit;
pub mod resolver;
pub mod tracks;
pub mod ytdlp;

pub use fetcher::{FetchedCaption, TranscriptFetcher};
pub use rate_limit::RateLimiter;
pub use resolver::{is_video_id, resolve_video_id, ResolveError};
pub use tracks::{select_caption_candidates, DEFAULT_CAPTION_LANGUAGE};
pub use ytdlp::YtDlpClient;

use crate::utils::Interrupted;

/// Video metadata needed downstream of the fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Canonical platform ID
    pub id: String,

    pub title: String,

    /// Channel or uploader name
    pub author: String,

    pub duration_seconds: u64,
}

/// Whether a caption track was uploaded by the author or generated by speech recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionKind {
    Manual,
    AutoGenerated,
}

impl CaptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionKind::Manual => "manual",
            CaptionKind::AutoGenerated => "auto",
        }
    }
}

/// One caption stream available for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language code as reported by the platform (`en`, `pt-BR`, ...)
    pub language: String,

    pub kind: CaptionKind,

    /// Display name of the track if the platform provides one
    pub name: Option<String>,

    /// Opaque locator the client uses to download this track
    pub url: Option<String>,
}

impl CaptionTrack {
    pub fn new(language: impl Into<String>, kind: CaptionKind) -> Self {
        Self {
            language: language.into(),
            kind,
            name: None,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A single timed caption line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub start_ms: i64,
    pub duration_ms: i64,
    pub text: String,
}

impl CaptionSegment {
    pub fn new(start_ms: i64, duration_ms: i64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            duration_ms,
            text: text.into(),
        }
    }
}

/// Failures reported while talking to the caption platform
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("video not found: {0}")]
    VideoNotFound(String),

    #[error("video is private")]
    VideoPrivate,

    #[error("video is age-restricted and cannot be processed")]
    AgeRestricted,

    #[error("transcripts are disabled for this video")]
    TranscriptsDisabled,

    #[error("transcript is empty or unavailable")]
    TranscriptUnavailable,

    #[error("caption platform rate limit reached")]
    RateLimited,

    #[error("timed out while talking to the caption platform")]
    Timeout,

    #[error("caption request was canceled")]
    Canceled,

    #[error("caption client failed: {0}")]
    Client(String),
}

impl From<Interrupted> for FetchError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Timeout => FetchError::Timeout,
            Interrupted::Canceled => FetchError::Canceled,
        }
    }
}

/// Client for the caption platform's metadata and caption endpoints
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionClient: Send + Sync {
    /// Fetch title, author and duration for a canonical video ID
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, FetchError>;

    /// List every caption track the platform advertises for the video
    async fn fetch_caption_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, FetchError>;

    /// Download one caption track as timed segments
    async fn fetch_caption(
        &self,
        video_id: &str,
        track: &CaptionTrack,
    ) -> Result<Vec<CaptionSegment>, FetchError>;
}
