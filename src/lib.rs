//! Transcript Enricher - fetch YouTube caption tracks into a local store and
//! enrich them with AI summaries, structured extractions and Q&A.
//!
//! The pipeline resolves a video reference, picks the best caption track for the
//! requested language, persists the transcript, and then serves cache-first
//! enrichments from one of several LLM vendors.

pub mod ai;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod output;
pub mod storage;
pub mod transcripts;
pub mod utils;
pub mod youtube;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use enrich::{AiAnswer, Enricher};
pub use transcripts::{FetchedTranscript, TranscriptPipeline};
pub use utils::RequestContext;

use ai::ProviderError;
use storage::StoreError;
use utils::Interrupted;
use youtube::{FetchError, ResolveError};

/// Result type used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of every failure the pipeline can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputInvalid,
    NotFound,
    ContentUnavailable,
    UpstreamRateLimited,
    UpstreamQuotaExceeded,
    UpstreamUnavailable,
    UpstreamNotConfigured,
    Timeout,
    Canceled,
    ResponseMalformed,
    PersistenceUnavailable,
    Internal,
}

/// Errors surfaced by the fetch pipeline and the enrichment layer
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("invalid language code: {0:?}")]
    InvalidLanguage(String),

    #[error("invalid kind {kind:?}, expected one of: {allowed}")]
    InvalidKind { kind: String, allowed: String },

    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    #[error("video is {duration_secs}s long, the limit is {max_secs}s")]
    VideoTooLong { duration_secs: u64, max_secs: u64 },

    #[error("transcript not found: {0}")]
    TranscriptNotFound(String),

    #[error("no usable content: {0}")]
    ContentUnavailable(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("operation timed out")]
    Timeout,

    #[error("operation was canceled")]
    Canceled,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Resolve(_)
            | Error::InvalidLanguage(_)
            | Error::InvalidKind { .. }
            | Error::InvalidQuestion(_)
            | Error::VideoTooLong { .. } => ErrorKind::InputInvalid,
            Error::TranscriptNotFound(_) => ErrorKind::NotFound,
            Error::ContentUnavailable(_) => ErrorKind::ContentUnavailable,
            Error::Fetch(err) => match err {
                FetchError::VideoNotFound(_) => ErrorKind::NotFound,
                FetchError::VideoPrivate
                | FetchError::AgeRestricted
                | FetchError::TranscriptsDisabled
                | FetchError::TranscriptUnavailable => ErrorKind::ContentUnavailable,
                FetchError::RateLimited => ErrorKind::UpstreamRateLimited,
                FetchError::Timeout => ErrorKind::Timeout,
                FetchError::Canceled => ErrorKind::Canceled,
                FetchError::Client(_) => ErrorKind::Internal,
            },
            Error::Provider(err) => match err {
                ProviderError::RateLimited => ErrorKind::UpstreamRateLimited,
                ProviderError::QuotaExceeded => ErrorKind::UpstreamQuotaExceeded,
                ProviderError::Unavailable(_) => ErrorKind::UpstreamUnavailable,
                ProviderError::NotConfigured(_) => ErrorKind::UpstreamNotConfigured,
                ProviderError::Malformed(_) => ErrorKind::ResponseMalformed,
                ProviderError::Request(_) => ErrorKind::Internal,
            },
            Error::Store(err) => match err {
                StoreError::NotFound => ErrorKind::NotFound,
                StoreError::Unavailable(_) => ErrorKind::PersistenceUnavailable,
                StoreError::Corrupt(_) | StoreError::Query(_) => ErrorKind::Internal,
            },
            Error::Timeout => ErrorKind::Timeout,
            Error::Canceled => ErrorKind::Canceled,
        }
    }
}

impl From<Interrupted> for Error {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Timeout => Error::Timeout,
            Interrupted::Canceled => Error::Canceled,
        }
    }
}
