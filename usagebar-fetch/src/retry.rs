//! Retry policy for HTTP requests.
//!
//! Backoff is linear: the wait before attempt `n` is `(n - 1) × base_delay`,
//! so with the defaults a request is tried at t=0, t=1s and t=3s.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff unit.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `(n - 1) × base_delay`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a new retry policy with the default backoff unit.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Sets the backoff unit.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Returns the wait before the given 1-based attempt.
    ///
    /// The first attempt never waits.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * attempt.saturating_sub(1)
    }

    /// Sum of all backoff waits if every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        (1..=self.max_attempts)
            .map(|a| self.delay_before_attempt(a))
            .sum()
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last observed error is returned.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut op: F, is_retryable: impl Fn(&E) -> bool) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                    attempt += 1;
                    let delay = self.delay_before_attempt(attempt);
                    warn!(
                        error = %e,
                        next_attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn transient(e: &TestError) -> bool {
        *e == TestError::Transient
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_before_attempt(1), Duration::ZERO);
        assert_eq!(policy.delay_before_attempt(2), Duration::from_secs(1));
        assert_eq!(policy.delay_before_attempt(3), Duration::from_secs(2));
        assert_eq!(policy.total_backoff(), Duration::from_secs(3));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
        assert_eq!(RetryPolicy::no_retry().total_backoff(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds_with_linear_waits() {
        let policy = RetryPolicy::default();
        let start = Instant::now();
        let mut seen = Vec::new();

        let result = policy
            .run(
                |attempt| {
                    seen.push((attempt, start.elapsed()));
                    async move {
                        if attempt < 3 {
                            Err(TestError::Transient)
                        } else {
                            Ok("payload")
                        }
                    }
                },
                transient,
            )
            .await;

        assert_eq!(result, Ok("payload"));
        assert_eq!(
            seen,
            vec![
                (1, Duration::ZERO),
                (2, Duration::from_secs(1)),
                (3, Duration::from_secs(3)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = RetryPolicy::default()
            .run(
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(TestError::Transient) }
                },
                transient,
            )
            .await;

        assert_eq!(result, Err(TestError::Transient));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let start = Instant::now();

        let result: Result<(), _> = RetryPolicy::default()
            .run(
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(TestError::Fatal) }
                },
                transient,
            )
            .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
