use std::future::Future;
use std::sync::Arc;

use super::{
    select_caption_candidates, CaptionClient, CaptionSegment, CaptionTrack, FetchError, RateLimiter,
    VideoMetadata,
};
use crate::utils::RequestContext;

/// Caption track that produced a transcript, with its segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCaption {
    pub track: CaptionTrack,
    pub segments: Vec<CaptionSegment>,
}

/// Drives the caption client: rate limited, deadline bound, one candidate at a time
pub struct TranscriptFetcher {
    client: Arc<dyn CaptionClient>,
    limiter: Arc<RateLimiter>,
}

impl TranscriptFetcher {
    pub fn new(client: Arc<dyn CaptionClient>, limiter: Arc<RateLimiter>) -> Self {
        Self { client, limiter }
    }

    /// Fetch video metadata
    pub async fn fetch_metadata(
        &self,
        ctx: &RequestContext,
        video_id: &str,
    ) -> Result<VideoMetadata, FetchError> {
        tracing::debug!("Fetching metadata for video {}", video_id);

        let id = video_id.to_string();
        self.guarded(ctx, move |client| async move { client.fetch_metadata(&id).await })
            .await
    }

    /// Fetch the best available caption track for `language`.
    ///
    /// Candidates are tried in preference order and the first non-empty one is
    /// returned. Individual failures are logged and skipped; once every
    /// candidate is exhausted the last failure is returned. Deadline expiry or
    /// cancellation abandons the loop immediately.
    pub async fn fetch_transcript(
        &self,
        ctx: &RequestContext,
        video_id: &str,
        language: &str,
    ) -> Result<FetchedCaption, FetchError> {
        let id = video_id.to_string();
        let tracks = self
            .guarded(ctx, move |client| async move { client.fetch_caption_tracks(&id).await })
            .await?;

        if tracks.is_empty() {
            return Err(FetchError::TranscriptsDisabled);
        }

        let candidates = select_caption_candidates(&tracks, language);
        tracing::debug!(
            "Trying {} caption candidates for video {} (requested language {:?})",
            candidates.len(),
            video_id,
            language
        );

        let mut last_error = None;
        for track in candidates {
            let id = video_id.to_string();
            let requested = track.clone();
            let result = self
                .guarded(ctx, move |client| async move {
                    client.fetch_caption(&id, &requested).await
                })
                .await;

            match result {
                Ok(segments) if segments.is_empty() => {
                    tracing::warn!(
                        "Caption track {} ({}) for {} is empty",
                        track.language,
                        track.kind.as_str(),
                        video_id
                    );
                    last_error = Some(FetchError::TranscriptUnavailable);
                }
                Ok(segments) => {
                    tracing::info!(
                        "Fetched {} caption segments for {} from track {} ({})",
                        segments.len(),
                        video_id,
                        track.language,
                        track.kind.as_str()
                    );
                    return Ok(FetchedCaption { track, segments });
                }
                Err(err @ (FetchError::Timeout | FetchError::Canceled)) => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        "Caption track {} ({}) for {} failed: {}",
                        track.language,
                        track.kind.as_str(),
                        video_id,
                        err
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::TranscriptUnavailable))
    }

    /// Run one client call behind the rate limiter and the request deadline
    async fn guarded<F, Fut, T>(&self, ctx: &RequestContext, call: F) -> Result<T, FetchError>
    where
        F: FnOnce(Arc<dyn CaptionClient>) -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
        T: Send + 'static,
    {
        let limiter = self.limiter.clone();
        let pending = call(self.client.clone());

        ctx.run(async move {
            limiter.acquire().await;
            pending.await
        })
        .await?
    }
}
