//! Cancellable retry-with-backoff for reads against the hosted backend.
//!
//! Delays follow `min(base * 2^attempt, max) + random_jitter`, and the whole
//! loop aborts as soon as the owning context cancels, so a torn-down screen
//! never resumes a timer.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            max_attempts: 5,
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given zero-based attempt.
    /// `jitter_fraction` must be in `[0, 1]`; callers feed it from a RNG,
    /// tests feed it directly.
    pub fn delay_for(&self, attempt: u32, jitter_fraction: f64) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jitter = self.max_jitter.mul_f64(jitter_fraction.clamp(0.0, 1.0));
        exponential + jitter
    }

    fn sample_delay(&self, attempt: u32) -> Duration {
        self.delay_for(attempt, rand::random::<f64>())
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cancellation handle owned by the UI context driving an operation.
/// Cloning shares the flag; cancelling wakes every pending retry timer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
        self.state.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    async fn cancelled_wait(&self) {
        while !self.is_cancelled() {
            self.state.notify.notified().await;
        }
    }
}

/// Outcome classification after the retry loop gives up.
#[derive(Debug)]
pub enum RetryError<E> {
    Cancelled,
    Exhausted(E),
    Terminal(E),
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::Cancelled => write!(f, "operation cancelled by its owning context"),
            RetryError::Exhausted(source) => write!(f, "retries exhausted: {source}"),
            RetryError::Terminal(source) => write!(f, "terminal backend error: {source}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Cancelled => None,
            RetryError::Exhausted(source) | RetryError::Terminal(source) => Some(source),
        }
    }
}

/// Drive `operation` until it succeeds, fails terminally, is cancelled, or
/// the attempt budget runs out. Only errors `is_transient` classifies as
/// retriable are retried.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    is_transient: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 0..attempts {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if !is_transient(&error) => return Err(RetryError::Terminal(error)),
            Err(error) if attempt + 1 == attempts => return Err(RetryError::Exhausted(error)),
            Err(_) => {
                let delay = policy.sample_delay(attempt);
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = cancel.cancelled_wait() => return Err(RetryError::Cancelled),
                }
            }
        }
    }

    unreachable!("retry loop returns from within the final attempt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            max_attempts: 4,
            max_jitter: Duration::from_millis(50),
        }
    }

    #[test]
    fn delays_double_then_cap() {
        let policy = policy();
        assert_eq!(policy.delay_for(0, 0.0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1, 0.0), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2, 0.0), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3, 0.0), Duration::from_millis(400));
        assert_eq!(policy.delay_for(10, 0.0), Duration::from_millis(400));
    }

    #[test]
    fn jitter_is_bounded_by_the_policy() {
        let policy = policy();
        let floor = policy.delay_for(1, 0.0);
        let ceiling = policy.delay_for(1, 1.0);
        assert_eq!(ceiling - floor, policy.max_jitter);
        // Out-of-range fractions clamp instead of overflowing the budget.
        assert_eq!(policy.delay_for(1, 7.5), ceiling);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_until_success() {
        let calls = AtomicU32::new(0);
        let result = run_with_retry(
            &policy(),
            &CancelToken::new(),
            |_: &&str| true,
            || {
                let attempt = calls.fetch_add(1, Ordering::Relaxed);
                async move {
                    if attempt < 2 {
                        Err("backend not ready")
                    } else {
                        Ok(attempt)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.expect("eventually succeeds"), 2);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = run_with_retry(
            &policy(),
            &CancelToken::new(),
            |_: &&str| false,
            || {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Err("forbidden") }
            },
        )
        .await;

        assert!(matches!(result, Err(RetryError::Terminal(_))));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = run_with_retry(
            &policy(),
            &CancelToken::new(),
            |_: &&str| true,
            || {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Err("still down") }
            },
        )
        .await;

        assert!(matches!(result, Err(RetryError::Exhausted(_))));
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins_over_pending_timers() {
        let cancel = CancelToken::new();
        let cancel_clone = cancel.clone();

        let handle = tokio::spawn(async move {
            run_with_retry(
                &RetryPolicy {
                    base_delay: Duration::from_secs(3600),
                    max_delay: Duration::from_secs(3600),
                    max_attempts: 5,
                    max_jitter: Duration::ZERO,
                },
                &cancel_clone,
                |_: &&str| true,
                || async { Err::<u32, _>("down") },
            )
            .await
        });

        // Let the first attempt fail and park on its timer, then tear down.
        tokio::task::yield_now().await;
        cancel.cancel();

        let result = handle.await.expect("task joins");
        assert!(matches!(result, Err(RetryError::Cancelled)));
    }
}
