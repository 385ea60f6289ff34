//! Deadline and cancellation handling for calls that leave the process.
//!
//! Every external call (caption platform, LLM vendor) is spawned onto the
//! runtime and the caller races the join handle against its deadline and
//! cancellation token. When the caller gives up, the handle is dropped: the
//! spawned call keeps running to completion and its result is discarded.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Stand-in for timeouts too large to represent as an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Why a guarded call did not produce a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("deadline exceeded")]
    Timeout,

    #[error("request was canceled")]
    Canceled,
}

/// Deadline plus cancellation scope carried through one request
#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Create a root context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_cancellation(timeout, CancellationToken::new())
    }

    /// Create a root context bound to an existing cancellation token
    pub fn with_cancellation(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: deadline_after(timeout),
            cancel,
        }
    }

    /// Child context with its own deadline, independent of this one.
    /// Cancelling the parent still cancels the child.
    pub fn scoped(&self, timeout: Duration) -> Self {
        Self {
            deadline: deadline_after(timeout),
            cancel: self.cancel.child_token(),
        }
    }

    /// Child context whose deadline never extends past this one
    pub fn narrowed(&self, timeout: Duration) -> Self {
        Self {
            deadline: self.deadline.min(deadline_after(timeout)),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `future` on its own task and wait for it until the deadline or
    /// cancellation, whichever comes first.
    pub async fn run<F, T>(&self, future: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Canceled);
        }
        if Instant::now() >= self.deadline {
            return Err(Interrupted::Timeout);
        }

        let handle = tokio::spawn(future);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Canceled),
            _ = tokio::time::sleep_until(self.deadline) => Err(Interrupted::Timeout),
            joined = handle => match joined {
                Ok(value) => Ok(value),
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => Err(Interrupted::Canceled),
            },
        }
    }
}
