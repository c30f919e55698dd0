//! Integration tests for resilience module
//!
//! Drives the retry executor through the public API the way the HTTP layer
//! uses it: one shared executor, many concurrent operations, and outcomes
//! classified by status code.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use veeam_common::resilience::{
    policies, Clock, HttpStatus, MockClock, RetryConfig, RetryExecutor, TransientFailure,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Response(u16);

impl HttpStatus for Response {
    fn status_code(&self) -> u16 {
        self.0
    }
}

/// Custom error type for testing
#[derive(Debug, Clone, PartialEq, Eq)]
struct TestError {
    message: String,
    transient: bool,
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TestError {}

impl TransientFailure for TestError {
    fn is_transient(&self) -> bool {
        self.transient
    }
}

fn fast_config(max_retries: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_retries(max_retries)
        .exponential_backoff(Duration::from_millis(2), 2.0, Duration::from_millis(10))
        .build()
        .expect("valid retry config")
}

/// Validates that one executor can serve many concurrent operations without
/// their attempt counts bleeding into each other.
///
/// # Test Steps
/// 1. Share one executor across eight tasks
/// 2. Each task fails with 503 twice, then succeeds
/// 3. Confirm every task made exactly three attempts
#[tokio::test(flavor = "multi_thread")]
async fn test_shared_executor_isolates_operations() {
    let executor =
        Arc::new(RetryExecutor::new(fast_config(3), policies::TransientStatusPolicy::default()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let executor = Arc::clone(&executor);
        handles.push(tokio::spawn(async move {
            let calls = Arc::new(AtomicU32::new(0));
            let outcome = executor
                .execute_with_outcome(
                    || {
                        let calls = Arc::clone(&calls);
                        async move {
                            let n = calls.fetch_add(1, Ordering::SeqCst);
                            let status = if n < 2 { 503 } else { 200 };
                            Ok::<_, TestError>(Response(status))
                        }
                    },
                    3,
                )
                .await;
            (outcome.attempts, outcome.into_result())
        }));
    }

    for handle in handles {
        let (attempts, result) = handle.await.expect("task completed");
        assert_eq!(attempts, 3);
        assert_eq!(result, Ok(Response(200)));
    }
}

/// Validates that a mix of transport failures and retryable statuses is
/// retried until a definitive response arrives.
#[tokio::test]
async fn test_transport_errors_and_statuses_share_budget() {
    let executor = RetryExecutor::new(fast_config(4), policies::TransientStatusPolicy::default());
    let calls = AtomicU32::new(0);

    let result = executor
        .execute(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    0 => Err(TestError { message: "connection reset".into(), transient: true }),
                    1 => Ok(Response(429)),
                    2 => Ok(Response(502)),
                    _ => Ok(Response(404)),
                }
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(result, Ok(Response(404)));
}

/// Validates that a non-transient error ends the sequence on the spot.
#[tokio::test]
async fn test_terminal_error_short_circuits() {
    let executor = RetryExecutor::new(fast_config(5), policies::TransientStatusPolicy::default());
    let calls = AtomicU32::new(0);

    let result = executor
        .execute(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<Response, _>(TestError { message: "cancelled".into(), transient: false })
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.unwrap_err().message, "cancelled");
}

/// Validates a custom predicate that retries on a response body condition
/// rather than on status codes.
#[tokio::test]
async fn test_predicate_policy_drives_executor() {
    let policy = policies::PredicateRetry::new(|outcome: &Result<u32, TestError>| {
        matches!(outcome, Ok(value) if *value < 3)
    });
    let executor = RetryExecutor::new(fast_config(10), policy);
    let counter = AtomicU32::new(0);

    let result = executor
        .execute(|| {
            let value = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, TestError>(value) }
        })
        .await;

    assert_eq!(result, Ok(3));
}

/// Validates that the mock clock can stand in for the system clock behind a
/// trait object.
#[test]
fn test_mock_clock_behind_trait_object() {
    let clock = MockClock::new();
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let before = shared.utc_now();

    clock.advance_secs(301);

    assert_eq!((shared.utc_now() - before).num_seconds(), 301);
}
