use crate::error::ExecError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    /// A single attempt: requests are not retried unless configured.
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

/// Caller-side retry around whole requests. Only errors that
/// `ExecError::is_retryable` accepts are repeated.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub async fn retry<F, Fut, T>(&self, operation: F) -> Result<T, ExecError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ExecError>>,
    {
        let mut attempt = 0;
        let mut delay = self.config.initial_delay;

        loop {
            attempt += 1;

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        info!("Request succeeded after {} attempts", attempt);
                    }
                    return Ok(result);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= self.config.max_attempts.max(1) => {
                    if attempt > 1 {
                        warn!("Request failed after {} attempts: {}", attempt, err);
                    }
                    return Err(err);
                }
                Err(err) => {
                    let actual_delay = if self.config.jitter {
                        let spread = delay.as_millis() as u64 / 2 + 1;
                        delay + Duration::from_millis(rand::random::<u64>() % spread)
                    } else {
                        delay
                    };
                    warn!(
                        "Attempt {} failed: {}. Retrying in {:?}...",
                        attempt, err, actual_delay
                    );
                    sleep(actual_delay).await;

                    delay = Duration::from_secs_f64(
                        (delay.as_secs_f64() * self.config.multiplier)
                            .min(self.config.max_delay.as_secs_f64()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: false,
        })
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let policy = RetryPolicy::default();
        let result = policy.retry(|| async { Ok::<_, ExecError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_default_policy_makes_one_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = RetryPolicy::default()
            .retry(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(ExecError::Timeout { timeout_ms: 10 })
                }
            })
            .await;

        assert_eq!(result, Err(ExecError::Timeout { timeout_ms: 10 }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_transient_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = fast(3)
            .retry(|| {
                let counter = counter_clone.clone();
                async move {
                    let count = counter.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err(ExecError::Transport("connection reset".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = fast(5)
            .retry(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(ExecError::HttpStatus {
                        status: 404,
                        body: String::new(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(ExecError::HttpStatus { status: 404, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exponential_backoff() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let start = std::time::Instant::now();
        let _ = fast(4)
            .retry(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(ExecError::HttpStatus {
                        status: 503,
                        body: String::new(),
                    })
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 4);
        // 10 + 20 + 40
        assert!(start.elapsed() >= Duration::from_millis(70));
    }

    #[tokio::test]
    async fn test_jitter_still_bounded_by_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let policy = RetryPolicy::new(RetryConfig {
            jitter: true,
            ..fast(2).config().clone()
        });

        let result = policy
            .retry(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(ExecError::Timeout { timeout_ms: 5 })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
