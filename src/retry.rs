use crate::errors::AppError;
use std::future::Future;
use std::time::Duration;

/// Rate-limit retry settings.
///
/// `attempts` counts every call, including the first. The delay grows
/// linearly with the attempt number and is capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryOptions {
    pub fn new(attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Delay after the failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(attempt.max(1))
            .min(self.max_delay)
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1_000), Duration::from_millis(10_000))
    }
}

/// Runs `operation`, retrying only while the remote API answers 429.
///
/// Any other error, or a 429 on the last attempt, is returned as is
/// (the latter converted to `AppError::RateLimited`).
pub async fn with_rate_limit_retry<T, F, Fut>(
    operation_name: &str,
    options: RetryOptions,
    mut operation: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() && attempt < options.attempts => {
                let delay = options.delay_for_attempt(attempt);
                tracing::warn!(
                    "{} rate limited (attempt {}/{}), retrying in {:?}",
                    operation_name,
                    attempt,
                    options.attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) if e.is_rate_limited() => {
                return Err(AppError::RateLimited(format!(
                    "{} gave up after {} attempts: {}",
                    operation_name, attempt, e
                )));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Polling schedule used to wait for a created resource to become visible.
///
/// Delays double from `initial_delay` and are capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl PollPolicy {
    /// A single check with no waiting.
    pub fn once() -> Self {
        Self {
            attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before poll number `attempt + 1`, where `attempt` is 1-based.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        self.initial_delay
            .saturating_mul(1_u32 << shift)
            .min(self.max_delay)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(8_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn rate_limited() -> AppError {
        AppError::RemoteApi {
            status: 429,
            message: "Too many requests".to_string(),
        }
    }

    fn fast() -> RetryOptions {
        RetryOptions::new(3, Duration::from_millis(1), Duration::from_millis(2))
    }

    #[test]
    fn test_linear_delay_capped() {
        let options = RetryOptions::new(5, Duration::from_millis(300), Duration::from_millis(800));
        assert_eq!(options.delay_for_attempt(1), Duration::from_millis(300));
        assert_eq!(options.delay_for_attempt(2), Duration::from_millis(600));
        assert_eq!(options.delay_for_attempt(3), Duration::from_millis(800));
    }

    #[test]
    fn test_poll_delay_doubles_and_caps() {
        let policy = PollPolicy {
            attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(3_000),
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(3_000));
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = with_rate_limit_retry("test op", fast(), || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(rate_limited())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_propagate_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), AppError> = with_rate_limit_retry("test op", fast(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::RemoteApi {
                    status: 400,
                    message: "bad".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(AppError::RemoteApi { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_rate_limit() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), AppError> = with_rate_limit_retry("test op", fast(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(rate_limited())
            }
        })
        .await;

        assert!(matches!(result, Err(AppError::RateLimited(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
