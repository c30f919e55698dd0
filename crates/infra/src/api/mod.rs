//! Backup server API client
//!
//! - Session credential with refresh-before-expiry ([`TokenManager`])
//! - Verb facade over a retrying executor ([`ApiClient`])
//! - Per-call cancellation and deadlines ([`ApiRequest`])

pub mod auth;
pub mod client;
pub mod errors;
pub mod request;

pub use auth::{authenticate, AccessTokenProvider, TokenManager};
pub use client::{ApiClient, ApiClientBuilder, SharedRetryPolicy};
pub use errors::{ApiError, ApiErrorCategory, AuthStage};
pub use request::ApiRequest;
