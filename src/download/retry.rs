//! Retry logic with exponential backoff for failed transfers.
//!
//! This module provides the [`RetryPolicy`] that computes backoff delays and
//! [`run_with_retry`], which drives one retryable unit of work (resume check
//! plus transfer) through the policy.
//!
//! # Delay Calculation
//!
//! ```text
//! base(n)  = 1s * 2^(n-2)                 for attempt n >= 2
//! delay(n) = min(base(n) * (1 + 0.25 * u), 30s)   u uniform in [-1, 1]
//! ```
//!
//! Every failure class is retried the same way; only cancellation stops the
//! loop early.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use myrient_dl::download::RetryPolicy;
//!
//! let policy = RetryPolicy::with_max_attempts(3);
//! let delay = policy.delay_before(2);
//! assert!(delay >= Duration::from_millis(750) && delay <= Duration::from_millis(1250));
//! ```

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::DownloadError;
use super::constants::{BACKOFF_BASE_DELAY, BACKOFF_JITTER_FRACTION, BACKOFF_MAX_DELAY};

/// Default number of attempts per file (initial attempt included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Configuration for retry behavior with exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `base_delay`: 1 second
/// - `max_delay`: 30 seconds
/// - `jitter_fraction`: 0.25
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay before the second attempt.
    base_delay: Duration,

    /// Maximum delay cap, jitter included.
    max_delay: Duration,

    /// Jitter spread as a fraction of the un-jittered delay.
    jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: BACKOFF_BASE_DELAY,
            max_delay: BACKOFF_MAX_DELAY,
            jitter_fraction: BACKOFF_JITTER_FRACTION,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    ///
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff to wait before attempt `attempt` (1-indexed, meaningful for >= 2),
    /// with random jitter.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let unit = rand::thread_rng().gen_range(-1.0..=1.0);
        self.delay_with_jitter(attempt, unit)
    }

    /// Deterministic form of [`delay_before`](Self::delay_before).
    ///
    /// `unit` in `[-1, 1]` selects where in the jitter band the delay lands;
    /// values outside are clamped.
    #[must_use]
    pub fn delay_with_jitter(&self, attempt: u32, unit: f64) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(2)).unwrap_or(i32::MAX);
        let base_secs = self.base_delay.as_secs_f64() * 2f64.powi(exponent);
        let jittered = base_secs * (1.0 + self.jitter_fraction * unit.clamp(-1.0, 1.0));
        let capped = jittered.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

/// Waits out a backoff delay.
///
/// Abstracted so tests can record delays instead of sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    /// Completes after `delay`.
    async fn sleep(&self, delay: Duration);
}

/// [`Sleeper`] backed by the Tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are spent.
///
/// `operation` receives the 1-indexed attempt number. Between attempts the
/// backoff wait is raced against `cancel`; `on_retry` is told about every
/// retry before the wait starts. A [`DownloadError::Cancelled`] from the
/// operation, or cancellation observed between attempts, ends the loop
/// without further retries.
///
/// # Errors
///
/// Returns [`DownloadError::RetriesExhausted`] wrapping the last failure, or
/// [`DownloadError::Cancelled`].
#[instrument(skip_all, fields(max_attempts = policy.max_attempts()))]
pub async fn run_with_retry<T, F, Fut, R>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    mut on_retry: R,
    mut operation: F,
) -> Result<T, DownloadError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DownloadError>>,
    R: FnMut(u32, Duration, &DownloadError),
{
    let mut attempt = 1u32;

    loop {
        debug!(attempt, "attempting transfer");

        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(DownloadError::Cancelled) => return Err(DownloadError::Cancelled),
            Err(e) => e,
        };

        if attempt >= policy.max_attempts() {
            debug!(attempt, error = %error, "max attempts reached");
            return Err(DownloadError::retries_exhausted(attempt, error));
        }
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let delay = policy.delay_before(attempt + 1);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            error = %error,
            "will retry"
        );
        on_retry(attempt, delay, &error);

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::Cancelled),
            () = sleeper.sleep(delay) => {}
        }

        attempt += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Records requested delays and returns immediately.
    #[derive(Debug, Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    /// Never wakes up; only cancellation can end the wait.
    #[derive(Debug, Default)]
    struct StuckSleeper;

    #[async_trait]
    impl Sleeper for StuckSleeper {
        async fn sleep(&self, _delay: Duration) {
            std::future::pending::<()>().await;
        }
    }

    fn failing() -> DownloadError {
        DownloadError::http_status("http://example.com/file.zip", 503)
    }

    // ==================== Delay Calculation Tests ====================

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert!((policy.jitter_fraction - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_retry_policy_max_attempts_minimum_is_one() {
        assert_eq!(RetryPolicy::with_max_attempts(0).max_attempts(), 1);
    }

    #[test]
    fn test_delay_without_jitter_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_with_jitter(2, 0.0), Duration::from_secs(1));
        assert_eq!(policy.delay_with_jitter(3, 0.0), Duration::from_secs(2));
        assert_eq!(policy.delay_with_jitter(4, 0.0), Duration::from_secs(4));
        assert_eq!(policy.delay_with_jitter(5, 0.0), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_jitter_band_edges() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_with_jitter(3, -1.0), Duration::from_millis(1500));
        assert_eq!(policy.delay_with_jitter(3, 1.0), Duration::from_millis(2500));
        // Out-of-range jitter is clamped to the band.
        assert_eq!(policy.delay_with_jitter(3, 7.0), Duration::from_millis(2500));
    }

    #[test]
    fn test_delay_capped_at_thirty_seconds() {
        let policy = RetryPolicy::default();
        // Attempt 7 has a 32s base.
        assert_eq!(policy.delay_with_jitter(7, 0.0), Duration::from_secs(30));
        assert_eq!(policy.delay_with_jitter(7, 1.0), Duration::from_secs(30));
        assert_eq!(policy.delay_with_jitter(40, 1.0), Duration::from_secs(30));
    }

    #[test]
    fn test_random_delay_within_band() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.delay_before(2);
            assert!(delay >= Duration::from_millis(750), "{delay:?} below band");
            assert!(delay <= Duration::from_millis(1250), "{delay:?} above band");
        }
    }

    #[test]
    fn test_random_delay_increases_between_attempts() {
        let policy = RetryPolicy::default();
        // Bands [0.75, 1.25] and [1.5, 2.5] never overlap.
        for _ in 0..100 {
            assert!(policy.delay_before(3) > policy.delay_before(2));
        }
    }

    // ==================== Retry Loop Tests ====================

    #[tokio::test]
    async fn test_always_failing_operation_attempted_max_times() {
        let policy = RetryPolicy::with_max_attempts(4);
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let mut retries = Vec::new();

        let result: Result<(), _> = run_with_retry(
            &policy,
            &sleeper,
            &CancellationToken::new(),
            |attempt, _delay, _error| retries.push(attempt),
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(failing()) }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(retries, vec![1, 2, 3]);
        match result {
            Err(DownloadError::RetriesExhausted { attempts, source }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(*source, DownloadError::HttpStatus { status: 503, .. }));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }

        let delays = sleeper.delays.lock().unwrap().clone();
        assert_eq!(delays.len(), 3);
        assert!(delays.windows(2).all(|pair| pair[1] > pair[0]));
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_single_attempt_policy_never_sleeps() {
        let policy = RetryPolicy::with_max_attempts(1);
        let sleeper = RecordingSleeper::default();

        let result: Result<(), _> = run_with_retry(
            &policy,
            &sleeper,
            &CancellationToken::new(),
            |_, _, _| {},
            |_| async { Err(failing()) },
        )
        .await;

        assert!(matches!(
            result,
            Err(DownloadError::RetriesExhausted { attempts: 1, .. })
        ));
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_success_after_failure_returns_value() {
        let policy = RetryPolicy::with_max_attempts(3);
        let sleeper = RecordingSleeper::default();

        let result = run_with_retry(
            &policy,
            &sleeper,
            &CancellationToken::new(),
            |_, _, _| {},
            |attempt| async move {
                if attempt < 2 {
                    Err(failing())
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_operation_is_not_retried() {
        let policy = RetryPolicy::with_max_attempts(5);
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = run_with_retry(
            &policy,
            &sleeper,
            &CancellationToken::new(),
            |_, _, _| {},
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DownloadError::Cancelled) }
            },
        )
        .await;

        assert!(matches!(result, Err(DownloadError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_backoff_wait() {
        let policy = RetryPolicy::with_max_attempts(5);
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let trigger = cancel.clone();

        let result: Result<(), _> = run_with_retry(
            &policy,
            &StuckSleeper,
            &cancel,
            |_, _, _| trigger.cancel(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(failing()) }
            },
        )
        .await;

        assert!(matches!(result, Err(DownloadError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_after_cancellation_is_not_retried() {
        let policy = RetryPolicy::with_max_attempts(5);
        let sleeper = RecordingSleeper::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<(), _> = run_with_retry(
            &policy,
            &sleeper,
            &cancel,
            |_, _, _| {},
            |_| async { Err(failing()) },
        )
        .await;

        assert!(matches!(result, Err(DownloadError::Cancelled)));
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }
}
