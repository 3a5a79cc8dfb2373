//! # Busy Retry
//!
//! Re-runs a whole transaction when SQLite reports the database busy or
//! locked.
//!
//! ## When It Triggers
//! ```text
//! checkout A: BEGIN ── SELECT cart ─────────── UPDATE stock ── COMMIT
//! checkout B: BEGIN ── SELECT cart ── UPDATE stock ✗ SQLITE_BUSY
//!                                          │
//!                                          ▼
//!                          rollback, sleep 200 ms, run B again
//!                          (B now sees A's decrement)
//! ```
//!
//! Delays double per attempt: 200, 400, 800, 1600 ms over five attempts.
//! Only [`DbError::Busy`] is retried; business rejections and other
//! failures return immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::DbResult;

/// Attempts and base delay for [`with_busy_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 5,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Runs `run` until it succeeds, fails with a non-busy error, or the
/// attempts are used up.
///
/// `run` must start a fresh transaction on each call.
pub async fn with_busy_retry<T, F, Fut>(policy: RetryPolicy, op: &'static str, mut run: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let mut attempt = 1;
    loop {
        match run().await {
            Err(err) if err.is_retryable() && attempt < policy.attempts => {
                let delay = policy.delay_for(attempt);
                warn!(op, attempt, delay_ms = delay.as_millis() as u64, error = %err, "Database busy, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}
