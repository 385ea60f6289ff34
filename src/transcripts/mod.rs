use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::storage::{Database, NewTranscript, NewVideo, Transcript, TranscriptSegment, Video};
use crate::utils::{normalize_language_code, RequestContext};
use crate::youtube::{
    resolve_video_id, CaptionClient, CaptionTrack, RateLimiter, TranscriptFetcher, DEFAULT_CAPTION_LANGUAGE,
};
use crate::{Error, Result};

/// Result of a successful fetch: the stored video and transcript, plus the
/// caption track they came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedTranscript {
    pub video: Video,
    pub transcript: Transcript,
    pub track: CaptionTrack,
}

/// Resolve, fetch and persist transcripts
pub struct TranscriptPipeline {
    fetcher: TranscriptFetcher,
    db: Database,
    max_duration_secs: u64,
    default_language: String,
}

impl TranscriptPipeline {
    pub fn new(fetcher: TranscriptFetcher, db: Database, max_duration_secs: u64, default_language: &str) -> Self {
        let default_language = match normalize_language_code(default_language) {
            lang if lang.is_empty() => DEFAULT_CAPTION_LANGUAGE.to_string(),
            lang => lang,
        };

        Self {
            fetcher,
            db,
            max_duration_secs,
            default_language,
        }
    }

    /// Build a pipeline with its own rate limiter from configuration
    pub fn from_config(config: &Config, client: Arc<dyn CaptionClient>, db: Database) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.youtube.rate_limit_interval()));
        Self::new(
            TranscriptFetcher::new(client, limiter),
            db,
            config.youtube.max_duration_secs,
            &config.youtube.default_language,
        )
    }

    /// Fetch the transcript for `video_ref` (an ID or any YouTube URL) and store it.
    ///
    /// The stored transcript is tagged with the requested language (or the
    /// default when none is given), even when a fallback track supplied the
    /// captions. Every call stores a new transcript row.
    pub async fn fetch(
        &self,
        ctx: &RequestContext,
        video_ref: &str,
        language_hint: Option<&str>,
    ) -> Result<FetchedTranscript> {
        let video_id = resolve_video_id(video_ref)?;
        let language = self.validate_language(language_hint)?;

        tracing::info!("Fetching transcript for video {} (language {})", video_id, language);

        let metadata = self.fetcher.fetch_metadata(ctx, &video_id).await?;
        if metadata.duration_seconds > self.max_duration_secs {
            return Err(Error::VideoTooLong {
                duration_secs: metadata.duration_seconds,
                max_secs: self.max_duration_secs,
            });
        }

        let caption = self.fetcher.fetch_transcript(ctx, &video_id, &language).await?;

        let segments: Vec<TranscriptSegment> = caption
            .segments
            .into_iter()
            .filter_map(|segment| {
                let text = segment.text.trim();
                (!text.is_empty()).then(|| TranscriptSegment {
                    start_ms: segment.start_ms,
                    duration_ms: segment.duration_ms,
                    text: text.to_string(),
                })
            })
            .collect();

        if segments.is_empty() {
            return Err(Error::ContentUnavailable(format!(
                "transcript for {} has no text",
                video_id
            )));
        }

        if ctx.is_cancelled() {
            return Err(Error::Canceled);
        }

        let video = self
            .db
            .upsert_video(&NewVideo {
                youtube_id: video_id.clone(),
                title: metadata.title,
                channel: metadata.author,
                duration_seconds: i64::try_from(metadata.duration_seconds).unwrap_or(i64::MAX),
            })
            .await?;

        let transcript = self
            .db
            .insert_transcript(&NewTranscript {
                video_id: video.id.clone(),
                language,
                segments,
            })
            .await?;

        tracing::info!(
            "Stored transcript {} for video {} ({} segments)",
            transcript.id,
            video_id,
            transcript.segments.len()
        );

        Ok(FetchedTranscript {
            video,
            transcript,
            track: caption.track,
        })
    }

    /// Trimmed, lower-cased language hint; empty means the default language
    fn validate_language(&self, hint: Option<&str>) -> Result<String> {
        let language = normalize_language_code(hint.unwrap_or_default());
        if language.is_empty() {
            return Ok(self.default_language.clone());
        }

        let well_formed = (2..=5).contains(&language.chars().count())
            && language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !well_formed {
            return Err(Error::InvalidLanguage(language));
        }

        Ok(language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::{CaptionKind, CaptionSegment, FetchError, MockCaptionClient, VideoMetadata};
    use crate::ErrorKind;
    use std::time::Duration;

    const MAX_DURATION: u64 = 36_000;

    fn ctx() -> RequestContext {
        RequestContext::with_timeout(Duration::from_secs(30))
    }

    fn metadata(duration_seconds: u64) -> VideoMetadata {
        VideoMetadata {
            id: "dQw4w9WgXcQ".to_string(),
            title: "Never Gonna Give You Up".to_string(),
            author: "Rick Astley".to_string(),
            duration_seconds,
        }
    }

    fn client_with_captions(segments: Vec<CaptionSegment>) -> MockCaptionClient {
        let mut client = MockCaptionClient::new();
        client.expect_fetch_metadata().returning(|_| Ok(metadata(212)));
        client.expect_fetch_caption_tracks().returning(|_| {
            Ok(vec![
                CaptionTrack::new("es", CaptionKind::AutoGenerated),
                CaptionTrack::new("en", CaptionKind::Manual),
            ])
        });
        client
            .expect_fetch_caption()
            .returning(move |_, _| Ok(segments.clone()));
        client
    }

    async fn pipeline(client: MockCaptionClient) -> (TranscriptPipeline, Database) {
        let db = Database::in_memory().await.unwrap();
        let fetcher = TranscriptFetcher::new(Arc::new(client), Arc::new(RateLimiter::unlimited()));
        (TranscriptPipeline::new(fetcher, db.clone(), MAX_DURATION, "en"), db)
    }

    #[tokio::test]
    async fn test_short_link_with_empty_language_uses_english() {
        let client = client_with_captions(vec![
            CaptionSegment::new(0, 1000, " Hello "),
            CaptionSegment::new(1000, 500, "   "),
            CaptionSegment::new(1500, 1500, "World"),
        ]);
        let (pipeline, db) = pipeline(client).await;

        let fetched = pipeline
            .fetch(&ctx(), "https://youtu.be/dQw4w9WgXcQ", Some(""))
            .await
            .unwrap();

        assert_eq!(fetched.video.youtube_id, "dQw4w9WgXcQ");
        assert_eq!(fetched.video.channel, "Rick Astley");
        assert_eq!(fetched.track.language, "en");
        assert_eq!(fetched.track.kind, CaptionKind::Manual);
        assert_eq!(fetched.transcript.language, "en");

        let texts: Vec<_> = fetched.transcript.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "World"]);

        assert_eq!(db.get_transcript(&fetched.transcript.id).await.unwrap(), fetched.transcript);
    }

    #[tokio::test]
    async fn test_stored_language_is_the_requested_one() {
        let mut client = MockCaptionClient::new();
        client.expect_fetch_metadata().returning(|_| Ok(metadata(60)));
        client
            .expect_fetch_caption_tracks()
            .returning(|_| Ok(vec![CaptionTrack::new("en", CaptionKind::Manual)]));
        client
            .expect_fetch_caption()
            .returning(|_, _| Ok(vec![CaptionSegment::new(0, 1000, "Hello")]));
        let (pipeline, _db) = pipeline(client).await;

        let fetched = pipeline.fetch(&ctx(), "dQw4w9WgXcQ", Some(" FR ")).await.unwrap();
        assert_eq!(fetched.track.language, "en");
        assert_eq!(fetched.transcript.language, "fr");
    }

    #[tokio::test]
    async fn test_repeated_fetch_stores_new_transcript_same_video() {
        let client = client_with_captions(vec![CaptionSegment::new(0, 1000, "Hello")]);
        let (pipeline, db) = pipeline(client).await;

        let first = pipeline.fetch(&ctx(), "dQw4w9WgXcQ", None).await.unwrap();
        let second = pipeline
            .fetch(&ctx(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ", None)
            .await
            .unwrap();

        assert_eq!(first.video.id, second.video.id);
        assert_ne!(first.transcript.id, second.transcript.id);
        assert_eq!(db.list_transcripts_for_video(&first.video.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overlong_video_is_rejected_before_captions() {
        let mut client = MockCaptionClient::new();
        client
            .expect_fetch_metadata()
            .returning(|_| Ok(metadata(MAX_DURATION + 1)));
        client.expect_fetch_caption_tracks().never();
        client.expect_fetch_caption().never();
        let (pipeline, _db) = pipeline(client).await;

        let err = pipeline.fetch(&ctx(), "dQw4w9WgXcQ", None).await.unwrap_err();
        assert!(matches!(err, Error::VideoTooLong { .. }));
        assert_eq!(err.kind(), ErrorKind::InputInvalid);
    }

    #[tokio::test]
    async fn test_blank_captions_are_content_unavailable() {
        let client = client_with_captions(vec![CaptionSegment::new(0, 1000, " \n ")]);
        let (pipeline, db) = pipeline(client).await;

        let err = pipeline.fetch(&ctx(), "dQw4w9WgXcQ", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContentUnavailable);
        assert_eq!(
            db.get_video_by_youtube_id("dQw4w9WgXcQ").await.unwrap_err(),
            crate::storage::StoreError::NotFound
        );
    }

    #[tokio::test]
    async fn test_input_validation() {
        let mut client = MockCaptionClient::new();
        client.expect_fetch_metadata().never();
        let (pipeline, _db) = pipeline(client).await;

        let err = pipeline.fetch(&ctx(), "https://vimeo.com/123", None).await.unwrap_err();
        assert!(matches!(err, Error::Resolve(_)));

        let err = pipeline.fetch(&ctx(), "dQw4w9WgXcQ", Some("english")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidLanguage(_)));

        let err = pipeline.fetch(&ctx(), "dQw4w9WgXcQ", Some("e")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputInvalid);
    }

    #[tokio::test]
    async fn test_platform_errors_keep_their_kind() {
        let mut client = MockCaptionClient::new();
        client
            .expect_fetch_metadata()
            .returning(|_| Err(FetchError::VideoNotFound("gone".to_string())));
        let (pipeline, _db) = pipeline(client).await;

        let err = pipeline.fetch(&ctx(), "dQw4w9WgXcQ", None).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(FetchError::VideoNotFound(_))));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_cancelled_request_stops_early() {
        let mut client = MockCaptionClient::new();
        client.expect_fetch_metadata().never();
        let (pipeline, _db) = pipeline(client).await;

        let ctx = ctx();
        ctx.cancel();
        let err = pipeline.fetch(&ctx, "dQw4w9WgXcQ", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Canceled);
    }
}
