//! Shared resilience utilities for the Veeam API access core.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: clock abstraction, backoff arithmetic, retry classification
//! - `runtime`: async retry executor (tokio)
//! - `observability`: tracing of retry attempts (implied by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

#[cfg(feature = "foundation")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use resilience::{
    policies, Clock, ExponentialBackoff, HttpStatus, MockClock, RetryConfig, RetryConfigBuilder,
    RetryConfigError, RetryPolicy, SystemClock, TransientFailure, DEFAULT_RETRYABLE_STATUSES,
};
#[cfg(feature = "runtime")]
pub use resilience::{retry_with_policy, RetryExecutor, RetryOutcome};
