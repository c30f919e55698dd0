//! Resilience patterns for transient HTTP failures
//!
//! - **Retry**: bounded retries with capped exponential backoff, driven by a
//!   pluggable [`RetryPolicy`] that looks at each attempt's full outcome
//!   (response or error). Exhaustion hands back the last attempt verbatim.
//! - **Clock**: wall-clock abstraction so expiry checks can be tested without
//!   sleeping.

pub mod clock;
pub mod retry;

pub use clock::{Clock, MockClock, SystemClock};
pub use retry::{
    policies, ExponentialBackoff, HttpStatus, RetryConfig, RetryConfigBuilder, RetryConfigError,
    RetryPolicy, TransientFailure, DEFAULT_RETRYABLE_STATUSES,
};
#[cfg(feature = "runtime")]
pub use retry::{retry_with_policy, RetryExecutor, RetryOutcome};
