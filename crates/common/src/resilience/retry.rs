//! Bounded retry with capped exponential backoff
//!
//! An operation runs up to `max_retries + 1` times. After every attempt the
//! [`RetryPolicy`] inspects the full outcome (success value or error) and
//! decides whether another attempt is worthwhile. When the policy declines,
//! or the attempt budget runs out, the last outcome is handed back exactly as
//! the operation produced it. Exhaustion is not turned into a new error kind.

use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "runtime")]
use std::future::Future;

use thiserror::Error;
#[cfg(feature = "runtime")]
use tracing::{debug, instrument, warn};

/// HTTP statuses treated as transient by [`policies::TransientStatusPolicy`]
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Rejected retry configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid retry configuration: {message}")]
pub struct RetryConfigError {
    pub message: String,
}

impl RetryConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Exponential backoff: `min(base_delay * multiplier^n, max_delay)`
///
/// `n` is zero-based, so the first retry waits `base_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl ExponentialBackoff {
    pub fn new(base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self { base_delay, max_delay, multiplier }
    }

    /// Delay before retry number `retry` (zero-based)
    ///
    /// Computed in floating point and rounded to the nearest nanosecond. The
    /// result never exceeds `max_delay`, including when the power overflows.
    pub fn delay(&self, retry: u32) -> Duration {
        let max_nanos = duration_nanos(self.max_delay);
        let raw = duration_nanos(self.base_delay) * self.multiplier.powf(f64::from(retry));

        let nanos = if raw.is_nan() { max_nanos } else { raw.min(max_nanos).max(0.0) };
        Duration::from_nanos(nanos.round() as u64)
    }
}

fn duration_nanos(duration: Duration) -> f64 {
    duration.as_nanos().min(u128::from(u64::MAX)) as f64
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    pub max_retries: u32,
    pub backoff: ExponentialBackoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: ExponentialBackoff::new(Duration::from_secs(1), 2.0, Duration::from_secs(30)),
        }
    }
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    ///
    /// The multiplier must be finite and at least 1 so delays never shrink
    /// between retries, and the ceiling may not sit below the base delay.
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        let backoff = &self.backoff;
        if !backoff.multiplier.is_finite() || backoff.multiplier < 1.0 {
            return Err(RetryConfigError::new(format!(
                "backoff multiplier must be a finite number >= 1, got {}",
                backoff.multiplier
            )));
        }
        if backoff.max_delay < backoff.base_delay {
            return Err(RetryConfigError::new(format!(
                "max_delay ({:?}) must not be below base_delay ({:?})",
                backoff.max_delay, backoff.base_delay
            )));
        }
        Ok(())
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.backoff.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.backoff.max_delay = delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff.multiplier = multiplier;
        self
    }

    pub fn exponential_backoff(
        mut self,
        base_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = ExponentialBackoff::new(base_delay, multiplier, max_delay);
        self
    }

    pub fn build(self) -> Result<RetryConfig, RetryConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Anything that carries an HTTP status code
pub trait HttpStatus {
    fn status_code(&self) -> u16;
}

/// Errors that may succeed if the same request is sent again
pub trait TransientFailure {
    fn is_transient(&self) -> bool;
}

/// Decides whether an attempt's outcome warrants another attempt
pub trait RetryPolicy<T, E> {
    fn is_retryable(&self, outcome: &Result<T, E>) -> bool;
}

impl<T, E, P: RetryPolicy<T, E> + ?Sized> RetryPolicy<T, E> for Arc<P> {
    fn is_retryable(&self, outcome: &Result<T, E>) -> bool {
        (**self).is_retryable(outcome)
    }
}

impl<T, E, P: RetryPolicy<T, E> + ?Sized> RetryPolicy<T, E> for Box<P> {
    fn is_retryable(&self, outcome: &Result<T, E>) -> bool {
        (**self).is_retryable(outcome)
    }
}

/// Pre-defined retry policies
pub mod policies {
    use super::*;

    /// Retry transient transport failures and a fixed set of HTTP statuses
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct TransientStatusPolicy {
        statuses: Vec<u16>,
    }

    impl TransientStatusPolicy {
        pub fn new(statuses: impl IntoIterator<Item = u16>) -> Self {
            Self { statuses: statuses.into_iter().collect() }
        }

        pub fn statuses(&self) -> &[u16] {
            &self.statuses
        }
    }

    impl Default for TransientStatusPolicy {
        fn default() -> Self {
            Self::new(DEFAULT_RETRYABLE_STATUSES)
        }
    }

    impl<T: HttpStatus, E: TransientFailure> RetryPolicy<T, E> for TransientStatusPolicy {
        fn is_retryable(&self, outcome: &Result<T, E>) -> bool {
            match outcome {
                Ok(response) => self.statuses.contains(&response.status_code()),
                Err(error) => error.is_transient(),
            }
        }
    }

    /// Never retry policy
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NeverRetry;

    impl<T, E> RetryPolicy<T, E> for NeverRetry {
        fn is_retryable(&self, _outcome: &Result<T, E>) -> bool {
            false
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<T, E, F> RetryPolicy<T, E> for PredicateRetry<F>
    where
        F: Fn(&Result<T, E>) -> bool,
    {
        fn is_retryable(&self, outcome: &Result<T, E>) -> bool {
            (self.predicate)(outcome)
        }
    }
}

/// Outcome of a retry execution including result and summary statistics
#[cfg(feature = "runtime")]
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// The last attempt's result, untouched
    pub result: Result<T, E>,
    pub attempts: u32,
    pub total_delay: Duration,
    /// True when the policy still wanted a retry but the budget was spent
    pub exhausted: bool,
}

#[cfg(feature = "runtime")]
impl<T, E> RetryOutcome<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// The retry executor
///
/// Holds an immutable configuration and policy and can be shared across any
/// number of concurrent calls. Cancellation is by drop: dropping the future
/// returned by `execute*` aborts the in-flight attempt or backoff sleep.
#[cfg(feature = "runtime")]
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

#[cfg(feature = "runtime")]
impl<P> RetryExecutor<P> {
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Create with default configuration
    pub fn with_policy(policy: P) -> Self {
        Self::new(RetryConfig::default(), policy)
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Run `operation` with the configured retry budget
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        P: RetryPolicy<T, E>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_retries(operation, self.config.max_retries).await
    }

    /// Run `operation` with an explicit retry budget
    pub async fn execute_with_retries<F, Fut, T, E>(
        &self,
        operation: F,
        max_retries: u32,
    ) -> Result<T, E>
    where
        P: RetryPolicy<T, E>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation, max_retries).await.into_result()
    }

    /// Run `operation` and report attempt statistics alongside the result
    #[instrument(skip(self, operation), fields(max_attempts = max_retries.saturating_add(1)))]
    pub async fn execute_with_outcome<F, Fut, T, E>(
        &self,
        mut operation: F,
        max_retries: u32,
    ) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<T, E>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut total_delay = Duration::ZERO;
        let mut retry: u32 = 0;

        loop {
            let attempt = retry + 1;
            debug!(attempt, "executing operation");

            let result = operation().await;

            if !self.policy.is_retryable(&result) {
                if retry > 0 {
                    debug!(retries = retry, "operation settled after retries");
                }
                return RetryOutcome {
                    result,
                    attempts: attempt,
                    total_delay,
                    exhausted: false,
                };
            }

            if retry >= max_retries {
                warn!(attempts = attempt, "retry attempts exhausted, returning last outcome");
                return RetryOutcome {
                    result,
                    attempts: attempt,
                    total_delay,
                    exhausted: true,
                };
            }

            let delay = self.config.backoff.delay(retry);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "retryable outcome, backing off");
            drop(result);

            tokio::time::sleep(delay).await;
            total_delay += delay;
            retry += 1;
        }
    }
}

/// Convenience function to create a retry executor and execute an operation
#[cfg(feature = "runtime")]
pub async fn retry_with_policy<F, Fut, T, E, P>(
    config: RetryConfig,
    policy: P,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: RetryPolicy<T, E>,
{
    RetryExecutor::new(config, policy).execute(operation).await
}

#[cfg(test)]
mod tests {
    //! Unit tests for backoff arithmetic, retry policies, and the executor
    //!
    //! Executor tests use millisecond delays so the suite stays fast while
    //! still exercising the sleep path.

    use super::policies::*;
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Status(u16);

    impl HttpStatus for Status {
        fn status_code(&self) -> u16 {
            self.0
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum FakeError {
        Transport,
        Rejected,
    }

    impl TransientFailure for FakeError {
        fn is_transient(&self) -> bool {
            matches!(self, FakeError::Transport)
        }
    }

    fn backoff_1s_x2_cap_10s() -> ExponentialBackoff {
        ExponentialBackoff::new(Duration::from_secs(1), 2.0, Duration::from_secs(10))
    }

    /// Validates the documented delay sequence for a 1s base, doubling,
    /// capped at 10s.
    ///
    /// Assertions:
    /// - delay(0)=1s, delay(1)=2s, delay(2)=4s.
    /// - delay(3)=8s and delay(10) is clamped to 10s.
    #[test]
    fn exponential_delay_sequence() {
        let backoff = backoff_1s_x2_cap_10s();

        assert_eq!(backoff.delay(0), Duration::from_secs(1));
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(2), Duration::from_secs(4));
        assert_eq!(backoff.delay(3), Duration::from_secs(8));
        assert_eq!(backoff.delay(10), Duration::from_secs(10));
    }

    #[test]
    fn delay_is_monotonic_and_capped() {
        let backoff =
            ExponentialBackoff::new(Duration::from_millis(150), 1.7, Duration::from_secs(5));

        let mut previous = Duration::ZERO;
        for retry in 0..64 {
            let delay = backoff.delay(retry);
            assert!(delay >= previous, "delay({retry}) shrank: {delay:?} < {previous:?}");
            assert!(delay <= Duration::from_secs(5));
            previous = delay;
        }
    }

    #[test]
    fn delay_survives_overflowing_power() {
        let backoff = backoff_1s_x2_cap_10s();
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn builder_validates_backoff() {
        assert!(RetryConfig::builder().multiplier(0.5).build().is_err());
        assert!(RetryConfig::builder().multiplier(f64::INFINITY).build().is_err());

        let err = RetryConfig::builder()
            .base_delay(Duration::from_secs(5))
            .max_delay(Duration::from_secs(1))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_delay"));

        let config = RetryConfig::builder().max_retries(5).build().unwrap();
        assert_eq!(config.max_attempts(), 6);
    }

    #[test]
    fn default_config_matches_provider_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff.base_delay, Duration::from_secs(1));
        assert_eq!(config.backoff.max_delay, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    /// Validates the transient-status classification.
    ///
    /// Assertions:
    /// - 429/500/502/503/504 responses are retryable.
    /// - 200, 400, 401, 404 responses are not.
    /// - Transport errors are retryable, other errors are not.
    #[test]
    fn transient_status_policy_classification() {
        let policy = TransientStatusPolicy::default();
        let check = |outcome: Result<Status, FakeError>| policy.is_retryable(&outcome);

        for status in [429, 500, 502, 503, 504] {
            assert!(check(Ok(Status(status))), "{status} should retry");
        }
        for status in [200, 201, 400, 401, 404] {
            assert!(!check(Ok(Status(status))), "{status} should not retry");
        }
        assert!(check(Err(FakeError::Transport)));
        assert!(!check(Err(FakeError::Rejected)));
        assert_eq!(policy.statuses(), &DEFAULT_RETRYABLE_STATUSES);
    }

    #[test]
    fn custom_status_set_replaces_defaults() {
        let policy = TransientStatusPolicy::new([503, 409]);

        assert_eq!(policy.statuses(), &[503, 409]);
        assert!(policy.is_retryable(&Ok::<_, FakeError>(Status(409))));
        assert!(!policy.is_retryable(&Ok::<_, FakeError>(Status(500))));
        assert!(policy.is_retryable(&Err::<Status, _>(FakeError::Transport)));
    }

    #[test]
    fn predicate_policy_sees_full_outcome() {
        let policy = PredicateRetry::new(|outcome: &Result<u32, ()>| matches!(outcome, Ok(0)));
        assert!(policy.is_retryable(&Ok(0)));
        assert!(!policy.is_retryable(&Ok(1)));
        assert!(!policy.is_retryable(&Err(())));
    }

    #[test]
    fn shared_policy_trait_object_delegates() {
        let policy: Arc<dyn RetryPolicy<Status, FakeError> + Send + Sync> =
            Arc::new(TransientStatusPolicy::new([418]));
        assert!(policy.is_retryable(&Ok(Status(418))));
        assert!(!policy.is_retryable(&Ok(Status(503))));

        let boxed: Box<dyn RetryPolicy<Status, FakeError>> = Box::new(NeverRetry);
        assert!(!boxed.is_retryable(&Err(FakeError::Transport)));
    }

    #[cfg(feature = "runtime")]
    mod executor {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        use super::*;

        fn fast_executor() -> RetryExecutor<TransientStatusPolicy> {
            let config = RetryConfig::builder()
                .exponential_backoff(Duration::from_millis(1), 2.0, Duration::from_millis(4))
                .build()
                .unwrap();
            RetryExecutor::new(config, TransientStatusPolicy::default())
        }

        /// Validates that a 503, 503, 200 sequence settles on the third call.
        ///
        /// Assertions:
        /// - Exactly three invocations.
        /// - The final result is the 200 response.
        #[tokio::test]
        async fn retries_until_success() {
            let executor = fast_executor();
            let calls = Arc::new(AtomicU32::new(0));
            let statuses = [503, 503, 200];

            let outcome = executor
                .execute_with_outcome(
                    || {
                        let calls = calls.clone();
                        async move {
                            let n = calls.fetch_add(1, Ordering::SeqCst) as usize;
                            Ok::<_, FakeError>(Status(statuses[n]))
                        }
                    },
                    3,
                )
                .await;

            assert_eq!(calls.load(Ordering::SeqCst), 3);
            assert_eq!(outcome.attempts, 3);
            assert!(!outcome.exhausted);
            assert_eq!(outcome.result, Ok(Status(200)));
            assert_eq!(outcome.total_delay, Duration::from_millis(3));
        }

        #[tokio::test]
        async fn transport_errors_then_success() {
            let executor = fast_executor();
            let calls = AtomicU32::new(0);

            let result = executor
                .execute_with_retries(
                    || {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        async move {
                            if n < 2 {
                                Err(FakeError::Transport)
                            } else {
                                Ok(Status(200))
                            }
                        }
                    },
                    3,
                )
                .await;

            assert_eq!(calls.load(Ordering::SeqCst), 3);
            assert_eq!(result, Ok(Status(200)));
        }

        #[tokio::test]
        async fn non_retryable_status_returns_immediately() {
            let executor = fast_executor();
            let calls = AtomicU32::new(0);

            let result = executor
                .execute_with_retries(
                    || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Ok::<_, FakeError>(Status(400)) }
                    },
                    3,
                )
                .await;

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(result, Ok(Status(400)));
        }

        /// Validates exhaustion with an always-failing transport.
        ///
        /// Assertions:
        /// - maxRetries=3 yields exactly four invocations.
        /// - The last transport error is returned verbatim.
        #[tokio::test]
        async fn exhaustion_returns_last_error() {
            let executor = fast_executor();
            let calls = AtomicU32::new(0);

            let outcome = executor
                .execute_with_outcome(
                    || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Err::<Status, _>(FakeError::Transport) }
                    },
                    3,
                )
                .await;

            assert_eq!(calls.load(Ordering::SeqCst), 4);
            assert!(outcome.exhausted);
            assert_eq!(outcome.result, Err(FakeError::Transport));
            // 1ms + 2ms + 4ms, and no sleep after the final attempt
            assert_eq!(outcome.total_delay, Duration::from_millis(7));
        }

        #[tokio::test]
        async fn exhaustion_returns_last_response() {
            let executor = fast_executor();

            let result = executor
                .execute_with_retries(|| async { Ok::<_, FakeError>(Status(502)) }, 1)
                .await;

            assert_eq!(result, Ok(Status(502)));
        }

        #[tokio::test]
        async fn zero_retries_means_single_attempt() {
            let executor = fast_executor();
            let calls = AtomicU32::new(0);

            let result = executor
                .execute_with_retries(
                    || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Err::<Status, _>(FakeError::Transport) }
                    },
                    0,
                )
                .await;

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(result, Err(FakeError::Transport));
        }

        #[tokio::test]
        async fn non_transient_error_is_not_retried() {
            let executor = fast_executor();
            let calls = AtomicU32::new(0);

            let result = executor
                .execute(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<Status, _>(FakeError::Rejected) }
                })
                .await;

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(result, Err(FakeError::Rejected));
        }

        #[tokio::test]
        async fn dropping_the_future_stops_retrying() {
            let config = RetryConfig::builder()
                .exponential_backoff(Duration::from_secs(60), 2.0, Duration::from_secs(60))
                .build()
                .unwrap();
            let executor = RetryExecutor::new(config, TransientStatusPolicy::default());
            let calls = AtomicU32::new(0);

            let run = executor.execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, FakeError>(Status(503)) }
            });
            let timed = tokio::time::timeout(Duration::from_millis(50), run).await;

            assert!(timed.is_err());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn retry_with_policy_uses_given_config() {
            let config = RetryConfig::builder()
                .max_retries(2)
                .exponential_backoff(Duration::from_millis(1), 1.0, Duration::from_millis(1))
                .build()
                .unwrap();
            let calls = AtomicU32::new(0);

            let result = retry_with_policy(config, TransientStatusPolicy::default(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, FakeError>(Status(500)) }
            })
            .await;

            assert_eq!(calls.load(Ordering::SeqCst), 3);
            assert_eq!(result, Ok(Status(500)));
        }
    }
}
