//! API-specific error types
//!
//! Provides error classification for API operations with retry metadata.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use veeam_common::resilience::{TransientFailure, DEFAULT_RETRYABLE_STATUSES};

/// Which token endpoint rejected the credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    /// Initial username/password exchange
    Authenticate,
    /// Refresh-token exchange
    Refresh,
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticate => f.write_str("authentication"),
            Self::Refresh => f.write_str("token refresh"),
        }
    }
}

/// Categories of API errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Token endpoint rejected the credential - never retried
    Authentication,
    /// Rate limiting errors (429) - retry with backoff
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx) - non-retryable
    Client,
    /// Network/connection errors - retryable
    Network,
    /// Request or response payload could not be (de)serialized
    Payload,
    /// Configuration errors - non-retryable
    Config,
    /// Caller cancelled the call or its deadline elapsed
    Cancelled,
}

/// API operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Connection, DNS, TLS, or transport timeout failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx status from the token or refresh endpoint
    #[error("{stage} failed with status {status}")]
    Auth { stage: AuthStage, status: u16 },

    /// Non-2xx status from a resource endpoint
    #[error("API request failed with status {status}")]
    Api { status: u16 },

    #[error("Failed to encode request body: {0}")]
    Encode(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied deadline elapsed before the call settled
    #[error("Deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Transport(_) => ApiErrorCategory::Network,
            Self::Auth { .. } => ApiErrorCategory::Authentication,
            Self::Api { status: 429 } => ApiErrorCategory::RateLimit,
            Self::Api { status } if *status >= 500 => ApiErrorCategory::Server,
            Self::Api { .. } => ApiErrorCategory::Client,
            Self::Encode(_) | Self::Decode(_) => ApiErrorCategory::Payload,
            Self::Config(_) => ApiErrorCategory::Config,
            Self::Timeout(_) | Self::Cancelled => ApiErrorCategory::Cancelled,
        }
    }

    /// Check if this error should be retried
    ///
    /// Transport failures always qualify. API statuses qualify only when they
    /// are in the transient set (429, 500, 502, 503, 504).
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status } => DEFAULT_RETRYABLE_STATUSES.contains(status),
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Api { status } => Some(*status),
            _ => None,
        }
    }
}

impl TransientFailure for ApiError {
    fn is_transient(&self) -> bool {
        self.should_retry()
    }
}
