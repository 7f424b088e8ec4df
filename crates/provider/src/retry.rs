//! Exponential backoff with jitter for transient provider failures.
//!
//! Only rate limits (429) and server errors (5xx) are retried; any other
//! failure, including plain network errors, propagates immediately.
//!
//! This wrapper is for idempotent read/status calls only. Submission calls
//! (POSTs that create provider-side jobs) must never go through it: a
//! blindly retried create can duplicate the job, and the provider offers no
//! idempotency key to deduplicate with. See [`crate::submit`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::api::ProviderApiError;

/// Tunable parameters for the retry strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempt budget, including the first attempt. Must be >= 1.
    pub max_retries: u32,
    /// Backoff base: the wait before attempt 2 (ignoring jitter).
    pub base_delay: Duration,
    /// Upper bound on the random jitter added to each wait.
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_jitter: Duration::from_secs(1),
        }
    }
}

/// Backoff delay before attempt `attempt + 1`, ignoring jitter.
///
/// Doubles per failed attempt: `base * 2^(attempt-1)` for `attempt >= 1`.
pub fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    base_delay.saturating_mul(1u32 << (attempt - 1).min(16))
}

/// Sample a uniform jitter in `[0, max_jitter]`.
fn sample_jitter(max_jitter: Duration) -> Duration {
    let max_ms = max_jitter.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

/// Whether a failed call may be retried.
///
/// Only an explicit rate-limit or server-error status qualifies. Transport
/// errors carry no retryable signal and propagate as-is.
fn is_retryable(error: &ProviderApiError) -> bool {
    matches!(
        error,
        ProviderApiError::Api { status, .. } if *status == 429 || *status >= 500
    )
}

/// Run `op` with exponential backoff on retryable failures.
///
/// Returns the first success, or the last error once the attempt budget is
/// exhausted or a non-retryable error occurs.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, ProviderApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderApiError>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if is_retryable(&error) && attempt < config.max_retries.max(1) => {
                let delay = backoff_delay(config.base_delay, attempt) + sample_jitter(config.max_jitter);
                tracing::warn!(
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Provider request failed; retrying",
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
