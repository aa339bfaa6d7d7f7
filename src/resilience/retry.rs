//! Retry with exponential backoff and full-range jitter.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::errors::{PuppetError, PuppetResult};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first try. Zero means try once, never retry.
    pub max_retries: u32,
    /// Delay before the first retry, pre-jitter.
    pub initial_delay: Duration,
    /// Cap on any computed delay.
    pub max_delay: Duration,
    /// Geometric growth factor for successive delays.
    pub backoff_multiplier: f64,
    /// When enabled, each delay is drawn uniformly from zero up to the
    /// computed value, decorrelating retry storms across callers.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A configuration that attempts exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Hook invoked before each retry sleep. Notification only.
pub trait RetryHook: Send + Sync {
    /// Called with the 1-indexed number of the attempt that just failed,
    /// the computed delay, and the failure that triggered the retry.
    fn on_retry(&self, attempt: u32, delay: Duration, error: &PuppetError);
}

/// Predicate deciding whether a failure is worth another attempt.
pub type ShouldRetry = Arc<dyn Fn(&PuppetError) -> bool + Send + Sync>;

/// Retry executor with exponential backoff.
///
/// Stateless between calls; all state lives in the per-call attempt loop.
pub struct RetryExecutor {
    config: RetryConfig,
    should_retry: ShouldRetry,
    hook: Option<Arc<dyn RetryHook>>,
}

impl RetryExecutor {
    /// Creates an executor with the default retryability predicate,
    /// [`PuppetError::is_retryable`].
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            should_retry: Arc::new(PuppetError::is_retryable),
            hook: None,
        }
    }

    /// Replaces the retryability predicate.
    pub fn with_should_retry(mut self, should_retry: ShouldRetry) -> Self {
        self.should_retry = should_retry;
        self
    }

    /// Sets a retry notification hook.
    pub fn with_hook(mut self, hook: Arc<dyn RetryHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Runs the operation, retrying per the configured policy.
    ///
    /// The first try is never delayed. On failure the attempt index is
    /// checked against `max_retries` and the predicate against the error;
    /// either stop condition propagates the last observed error verbatim.
    /// Total attempts never exceed `max_retries + 1`.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> PuppetResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = PuppetResult<T>> + Send,
        T: Send,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= self.config.max_retries || !(self.should_retry)(&error) {
                        return Err(error);
                    }

                    let delay = self.backoff_delay(attempt);
                    if let Some(hook) = &self.hook {
                        hook.on_retry(attempt + 1, delay, &error);
                    }

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Computes the backoff delay for a 0-indexed attempt:
    /// `min(initial_delay * multiplier^attempt, max_delay)`, then jittered
    /// uniformly over `[0, value]` when jitter is enabled, floored to
    /// whole milliseconds.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.config.max_delay.as_millis() as f64);

        let millis = if self.config.jitter {
            rand::random::<f64>() * capped
        } else {
            capped
        };

        Duration::from_millis(millis as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_success_returns_immediately() {
        let executor = RetryExecutor::new(RetryConfig::default());
        let result = executor.execute(|| async { Ok::<_, PuppetError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_zero_retries_attempts_once() {
        let executor = RetryExecutor::new(quick(0));
        let attempts = AtomicU32::new(0);

        let result = executor
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(PuppetError::Network {
                        message: "down".to_string(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_propagates_last_error() {
        let executor = RetryExecutor::new(quick(2));
        let attempts = AtomicU32::new(0);

        let result = executor
            .execute(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err::<(), _>(PuppetError::Server {
                        status: 500,
                        message: format!("boom {}", n),
                    })
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match result {
            Err(PuppetError::Server { message, .. }) => {
                // The third failure is what surfaces, not a synthesized
                // gave-up error.
                assert_eq!(message, "boom 2");
            }
            other => panic!("expected Server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_aborts_immediately() {
        let executor = RetryExecutor::new(quick(5));
        let attempts = AtomicU32::new(0);

        let result = executor
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(PuppetError::Authentication {
                        message: "bad token".to_string(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_predicate_overrides_default() {
        let executor = RetryExecutor::new(quick(3))
            .with_should_retry(Arc::new(|_| false));
        let attempts = AtomicU32::new(0);

        let result = executor
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(PuppetError::Network {
                        message: "down".to_string(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_without_jitter() {
        let executor = RetryExecutor::new(RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            jitter: false,
        });

        assert_eq!(executor.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(executor.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(executor.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(executor.backoff_delay(3), Duration::from_millis(800));
        // Capped at max_delay from here on.
        assert_eq!(executor.backoff_delay(4), Duration::from_millis(1000));
        assert_eq!(executor.backoff_delay(10), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_with_jitter_stays_in_range() {
        let executor = RetryExecutor::new(RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            jitter: true,
        });

        for _ in 0..100 {
            let delay = executor.backoff_delay(2);
            assert!(delay <= Duration::from_millis(400));
        }
    }

    #[tokio::test]
    async fn test_hook_sees_one_indexed_attempts_and_delays() {
        use parking_lot::Mutex;

        #[derive(Default)]
        struct Recording {
            seen: Mutex<Vec<(u32, Duration)>>,
        }

        impl RetryHook for Recording {
            fn on_retry(&self, attempt: u32, delay: Duration, _error: &PuppetError) {
                self.seen.lock().push((attempt, delay));
            }
        }

        let hook = Arc::new(Recording::default());
        let executor = RetryExecutor::new(RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            jitter: false,
        })
        .with_hook(hook.clone());

        let _ = executor
            .execute(|| async {
                Err::<(), _>(PuppetError::Network {
                    message: "down".to_string(),
                })
            })
            .await;

        let seen = hook.seen.lock();
        assert_eq!(
            *seen,
            vec![
                (1, Duration::from_millis(1)),
                (2, Duration::from_millis(2)),
            ]
        );
    }
}
