//! Retry utilities with exponential backoff for calls to flaky upstreams.
//!
//! Only errors classified as transient are retried. Permanent failures return
//! on the first attempt. The backoff wait races a cancellation token so a
//! caller enforcing its own deadline can cut a pending retry short.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Classification hook for errors passed through [`retry_with_policy`].
pub trait Retryable {
    /// Whether the same call is likely to succeed if repeated after a delay.
    fn is_transient(&self) -> bool;
}

/// Configuration for retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Backoff multiplier applied after every retry.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and first delay, default cap.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            ..Default::default()
        }
    }

    /// A policy that makes a single attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::from_millis(1))
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after the given failed attempt (0-based).
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Worst-case total time spent sleeping when every attempt fails.
    pub fn worst_case_wait(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.backoff_duration(attempt))
            .sum()
    }
}

/// Terminal outcome of a retried operation that did not succeed.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("non-retryable failure: {0}")]
    Permanent(E),

    #[error("retry cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// Execute an async operation, retrying transient failures with exponential backoff.
///
/// # Example
/// ```ignore
/// let text = retry_with_policy(&policy, "chat", &CancellationToken::new(), || async {
///     provider.generate(&prompt).await
/// })
/// .await?;
/// ```
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    cancel: &CancellationToken,
    f: F,
) -> Result<T, RetryError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "Call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !error.is_transient() {
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        error = %error,
                        "Call failed with non-retryable error"
                    );
                    return Err(RetryError::Permanent(error));
                }

                if attempt + 1 >= max_attempts {
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        error = %error,
                        "Call failed after max attempts"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt + 1,
                        last: error,
                    });
                }

                let backoff = policy.backoff_duration(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    error = %error,
                    backoff_ms = backoff.as_millis() as u64,
                    "Transient failure, retrying after backoff"
                );

                tokio::select! {
                    _ = sleep(backoff) => {}
                    _ = cancel.cancelled() => {
                        warn!(
                            operation = operation_name,
                            attempt = attempt + 1,
                            "Retry cancelled during backoff"
                        );
                        return Err(RetryError::Cancelled { attempts: attempt + 1 });
                    }
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[derive(Debug)]
    enum TestError {
        Busy,
        Broken,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Busy => write!(f, "busy"),
                TestError::Broken => write!(f, "broken"),
            }
        }
    }

    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Busy)
        }
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_duration_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));

        assert_eq!(policy.backoff_duration(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_duration_is_capped() {
        let policy =
            RetryPolicy::new(40, Duration::from_millis(100)).with_max_delay(Duration::from_secs(1));

        assert_eq!(policy.backoff_duration(3), Duration::from_millis(800));
        assert_eq!(policy.backoff_duration(4), Duration::from_secs(1));
        assert_eq!(policy.backoff_duration(35), Duration::from_secs(1));
    }

    #[test]
    fn test_worst_case_wait() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.worst_case_wait(), Duration::from_millis(3000));
        assert_eq!(RetryPolicy::no_retry().worst_case_wait(), Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::from_millis(5)).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let policy = RetryPolicy::default();
        let result = retry_with_policy(&policy, "test_op", &CancellationToken::new(), || async {
            Ok::<_, TestError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let started = Instant::now();

        let result = retry_with_policy(&policy, "test_op", &CancellationToken::new(), || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Busy)
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, last: TestError::Busy })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_permanent_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let started = Instant::now();

        let result = retry_with_policy(&policy, "test_op", &CancellationToken::new(), || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Broken)
            }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Permanent(TestError::Broken))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_cancelled_during_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let result = retry_with_policy(&policy, "test_op", &cancel, || async {
            Err::<i32, _>(TestError::Busy)
        })
        .await;

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 1 })));
    }
}
