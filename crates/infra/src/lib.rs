//! # Veeam Infrastructure
//!
//! Authenticated, retrying access to the Veeam Backup & Replication REST API.
//!
//! This crate contains:
//! - Single-attempt HTTP transport ([`HttpClient`])
//! - Token acquisition and expiry-aware refresh ([`TokenManager`])
//! - The verb facade used by resources ([`ApiClient`])
//! - Configuration loading from environment and files
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Builds on `veeam-domain` for payloads and configuration
//! - Uses the retry executor from `veeam-common`
//! - Contains all I/O

pub mod api;
pub mod config;
mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{
    authenticate, AccessTokenProvider, ApiClient, ApiClientBuilder, ApiError, ApiErrorCategory,
    ApiRequest, AuthStage, TokenManager,
};
pub use http::{HttpClient, HttpClientBuilder, HttpResponse};
pub use observability::{init_tracing, LogFormat};
