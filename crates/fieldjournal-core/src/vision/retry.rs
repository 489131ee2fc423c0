//! Retry policy for transient vision model failures.
//!
//! Only network, timeout and abort failures are retried. HTTP status errors
//! and undecodable replies are permanent and surface immediately.

use std::future::Future;
use std::time::Duration;

use crate::config::VisionConfig;
use crate::error::VisionError;

/// Upper bound on a single backoff delay.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Determine whether a vision error is worth retrying.
pub fn is_retryable(error: &VisionError) -> bool {
    matches!(
        error,
        VisionError::Timeout { .. } | VisionError::Network(_) | VisionError::Aborted(_)
    )
}

/// Exponential backoff before retry number `retry` (0-based).
///
/// Uses `base_delay * 2^retry` with a cap at 30 seconds.
pub fn backoff_duration(retry: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(retry));
    Duration::from_millis(delay.min(MAX_BACKOFF_MS))
}

/// Attempt budget, backoff base and per-attempt deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &VisionConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            base_delay_ms: config.retry_delay_ms,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// A single attempt with the deadline applied and no retries.
    pub fn single_attempt(self) -> Self {
        Self {
            max_attempts: 1,
            ..self
        }
    }

    /// Run `op` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// Each attempt is cancelled at the deadline and reported as
    /// [`VisionError::Timeout`]. `op` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, VisionError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, VisionError>>,
    {
        let timeout_ms = self.timeout.as_millis() as u64;
        let mut last_error = VisionError::Timeout { timeout_ms };

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = backoff_duration(attempt - 1, self.base_delay_ms);
                tracing::debug!(
                    "Retry {}/{} after {delay:?}: {last_error}",
                    attempt + 1,
                    self.max_attempts
                );
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(self.timeout, op(attempt)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    if !is_retryable(&e) {
                        return Err(e);
                    }
                    last_error = e;
                }
                Err(_) => {
                    last_error = VisionError::Timeout { timeout_ms };
                }
            }
        }

        tracing::warn!(
            "Vision request failed after {} attempts: {last_error}",
            self.max_attempts
        );
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable(&VisionError::Timeout { timeout_ms: 60_000 }));
        assert!(is_retryable(&VisionError::Network("dns failure".into())));
        assert!(is_retryable(&VisionError::Aborted("reset".into())));
        assert!(!is_retryable(&VisionError::Http {
            status: 400,
            message: "bad request".into()
        }));
        assert!(!is_retryable(&VisionError::Http {
            status: 503,
            message: "unavailable".into()
        }));
        assert!(!is_retryable(&VisionError::Decode("eof".into())));
        assert!(!is_retryable(&VisionError::EmptyReply));
    }

    #[test]
    fn test_backoff_exponential() {
        assert_eq!(backoff_duration(0, 2000), Duration::from_millis(2000));
        assert_eq!(backoff_duration(1, 2000), Duration::from_millis(4000));
        assert_eq!(backoff_duration(2, 2000), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_capped_at_30s() {
        assert_eq!(backoff_duration(10, 2000), Duration::from_millis(30_000));
        assert_eq!(backoff_duration(u32::MAX, u64::MAX), Duration::from_millis(30_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_timing_out_makes_three_attempts() {
        let policy = RetryPolicy::default();
        let starts = Arc::new(std::sync::Mutex::new(Vec::new()));
        let origin = Instant::now();

        let recorded = Arc::clone(&starts);
        let result: Result<(), _> = policy
            .run(|_| {
                recorded.lock().unwrap().push(origin.elapsed());
                std::future::pending()
            })
            .await;

        assert!(matches!(result, Err(VisionError::Timeout { timeout_ms: 60_000 })));
        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 3);
        // 60s deadline + 2s backoff, then 60s + 4s
        assert_eq!(starts[1] - starts[0], Duration::from_secs(62));
        assert_eq!(starts[2] - starts[1], Duration::from_secs(64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::default()
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(VisionError::Http {
                        status: 401,
                        message: "unauthorized".into(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(VisionError::Http { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_network_error() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::default()
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(VisionError::Network("connection reset".into()))
                    } else {
                        Ok("caption")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "caption");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_from_config() {
        let policy = RetryPolicy::from_config(&VisionConfig::default());
        assert_eq!(policy, RetryPolicy::default());
        assert_eq!(policy.single_attempt().max_attempts, 1);
    }
}
