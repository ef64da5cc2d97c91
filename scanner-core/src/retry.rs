//! Retry driver with exponential backoff
//!
//! Wraps a fallible async operation and retries it while a predicate
//! accepts the error. Delays grow exponentially from `initial_delay` up
//! to `max_delay`, except rate-limit errors, which sleep the interval the
//! server asked for.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ErrorKind, ScanError, ScanResult};

/// Retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryConfig {
    /// Delay before the retry following failed attempt `i` (zero-based):
    /// `min(initial * 2^i, max)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Run `op`, retrying while `should_retry` accepts the error and attempts
/// remain. Makes at most `config.max_attempts` invocations and propagates
/// the last error.
pub async fn retry<T, F, Fut, P>(
    config: &RetryConfig,
    should_retry: P,
    mut op: F,
) -> ScanResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScanResult<T>>,
    P: Fn(&ScanError) -> bool,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= config.max_attempts || !should_retry(&err) {
                    return Err(err);
                }

                // A rate-limited response names its own backoff; for
                // everything else the exponential schedule applies.
                let delay = match &err.kind {
                    ErrorKind::RateLimited { .. } => err
                        .suggested_delay()
                        .unwrap_or_else(|| config.backoff_delay(attempt - 1)),
                    _ => config.backoff_delay(attempt - 1),
                };

                warn!(
                    platform = %err.platform,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
        }
    }

    #[test]
    fn test_backoff_delay_series() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(config.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(4000));
        // Capped at max_delay from attempt 4 on.
        assert_eq!(config.backoff_delay(4), Duration::from_millis(10_000));
        assert_eq!(config.backoff_delay(9), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn test_constant_failure_makes_exactly_n_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: ScanResult<()> = retry(&fast_config(3), ScanError::retryable, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ScanError::timeout(Platform::Kalshi, "down"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_after_transient_failure() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = retry(&fast_config(3), ScanError::retryable, || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ScanError::http_status(Platform::Polymarket, 503, "unavailable"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: ScanResult<()> = retry(&fast_config(3), ScanError::retryable, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ScanError::http_status(Platform::Manifold, 404, "gone"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_sleeps_retry_after() {
        // 429 with Retry-After: 1s dominates the 10ms exponential delay.
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let start = tokio::time::Instant::now();
        let result = retry(&fast_config(3), ScanError::retryable, || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ScanError::rate_limited(Platform::Kalshi, Some(1)))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_millis(950));
    }
}
