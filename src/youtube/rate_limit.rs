use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum-interval limiter shared by every call to the caption platform.
///
/// Callers queue on the lock, so timing checks are serialized; a caller that
/// arrives sooner than `min_interval` after the previous call started sleeps
/// for the remainder while holding its place.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// A limiter that records calls but never delays them
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next call may start and record its start time
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!("Rate limiting caption request for {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}
