//! Token endpoint payloads and the session credential
//!
//! The [`Credential`] is the only mutable piece of session state. It is
//! created from a successful [`TokenResponse`] and later merged with refresh
//! responses, never partially: either the access token and expiry are both
//! replaced or nothing changes.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::REFRESH_GRANT_TYPE;
use crate::errors::{Result, VeeamError};

// Longer lifetimes are clamped so expiry arithmetic cannot overflow.
const MAX_TOKEN_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Body of `POST /api/v1/token`
#[derive(Clone, Serialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl AuthRequest {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into(), domain: None }
    }

    /// Attach a login domain; empty strings are treated as "no domain"
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        self.domain = if domain.is_empty() { None } else { Some(domain) };
        self
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

/// Body of `POST /api/v1/refresh`
#[derive(Clone, Serialize)]
pub struct TokenRefreshRequest {
    pub refresh_token: String,
    pub grant_type: String,
}

impl TokenRefreshRequest {
    #[must_use]
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self { refresh_token: refresh_token.into(), grant_type: REFRESH_GRANT_TYPE.to_string() }
    }
}

impl fmt::Debug for TokenRefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefreshRequest")
            .field("refresh_token", &"<redacted>")
            .field("grant_type", &self.grant_type)
            .finish()
    }
}

/// Response of both the token and the refresh endpoint
///
/// Everything except `access_token` and `expires_in` may be omitted by the
/// refresh endpoint, so those fields default to empty.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Reject responses that cannot produce a credential valid in the future
    ///
    /// # Errors
    /// Returns `VeeamError::InvalidInput` for an empty access token or a
    /// non-positive lifetime.
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(VeeamError::InvalidInput("token response has an empty access_token".into()));
        }
        if self.expires_in <= 0 {
            return Err(VeeamError::InvalidInput(format!(
                "token response has non-positive expires_in ({})",
                self.expires_in
            )));
        }
        Ok(())
    }

    fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::seconds(self.expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS))
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Bearer credential held by the API client
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
}

impl Credential {
    /// Build a credential from a token endpoint response received at `now`
    ///
    /// A missing token type falls back to `Bearer`.
    #[must_use]
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        let expires_at = response.expires_at(now);
        let token_type =
            if response.token_type.is_empty() { "Bearer".to_string() } else { response.token_type };

        Self {
            access_token: response.access_token,
            token_type,
            refresh_token: response.refresh_token,
            expires_at,
            scope: response.scope.filter(|s| !s.is_empty()),
        }
    }

    /// Merge a refresh response received at `now`
    ///
    /// Access token and expiry are always replaced. Token type, refresh
    /// token, and scope are only replaced when the server sent non-empty
    /// values.
    pub fn apply_refresh(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.expires_at = response.expires_at(now);
        self.access_token = response.access_token;

        if !response.token_type.is_empty() {
            self.token_type = response.token_type;
        }
        if !response.refresh_token.is_empty() {
            self.refresh_token = response.refresh_token;
        }
        if let Some(scope) = response.scope.filter(|s| !s.is_empty()) {
            self.scope = Some(scope);
        }
    }

    /// `true` once `now` is past the expiry instant
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// `true` if `now + window` is past the expiry instant
    #[must_use]
    pub fn will_expire_soon_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        match now.checked_add_signed(window) {
            Some(deadline) => deadline > self.expires_at,
            None => true,
        }
    }

    /// Wall-clock variant of [`Credential::is_expired_at`]
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Seconds until expiry (negative once expired)
    #[must_use]
    pub fn seconds_until_expiry_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}
