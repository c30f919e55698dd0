//! Session credential management
//!
//! Exchanges username/password for a bearer credential and keeps it fresh:
//! - Authenticate once against the token endpoint
//! - Refresh before expiry (configurable window, default 5 min)
//! - Single-flight refresh: concurrent callers wait for one refresh
//!
//! Authentication and refresh failures are returned as-is and never retried
//! here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use veeam_common::resilience::{Clock, SystemClock};
use veeam_domain::constants::{DEFAULT_REFRESH_WINDOW_SECS, REFRESH_ENDPOINT, TOKEN_ENDPOINT};
use veeam_domain::{AuthRequest, Credential, TokenRefreshRequest, TokenResponse};

use super::errors::{ApiError, AuthStage};
use crate::http::HttpClient;

/// Trait for providing access tokens
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Refresh the credential if it expires within the refresh window
    ///
    /// A failure means the caller's request must not be sent.
    async fn ensure_fresh(&self) -> Result<(), ApiError>;

    /// Current access token, without refreshing
    async fn access_token(&self) -> Result<String, ApiError>;
}

/// Exchange username/password for a credential
///
/// Any non-2xx status is [`ApiError::Auth`]; failing to reach the server is
/// [`ApiError::Transport`].
#[instrument(skip(http, request, clock), fields(username = %request.username))]
pub async fn authenticate(
    http: &HttpClient,
    base_url: &str,
    request: &AuthRequest,
    clock: &dyn Clock,
) -> Result<Credential, ApiError> {
    let response =
        exchange(http, base_url, TOKEN_ENDPOINT, request, AuthStage::Authenticate).await?;
    let credential = Credential::from_response(response, clock.utc_now());

    info!(expires_at = %credential.expires_at, "authenticated");
    Ok(credential)
}

async fn exchange<B: Serialize + ?Sized>(
    http: &HttpClient,
    base_url: &str,
    endpoint: &str,
    body: &B,
    stage: AuthStage,
) -> Result<TokenResponse, ApiError> {
    let url = format!("{base_url}{endpoint}");
    let response = http.send(http.request(Method::POST, &url).json(body)).await?;

    let status = response.status();
    if !status.is_success() {
        warn!(%stage, status = status.as_u16(), "token endpoint rejected request");
        return Err(ApiError::Auth { stage, status: status.as_u16() });
    }

    let token: TokenResponse = response.json().await?;
    token.validate()?;
    Ok(token)
}

/// Owns the session credential and refreshes it on demand
pub struct TokenManager {
    http: HttpClient,
    base_url: String,
    refresh_window: Duration,
    clock: Arc<dyn Clock>,
    credential: Mutex<Credential>,
}

impl TokenManager {
    /// Wrap an existing credential
    ///
    /// Uses the default 5 minute refresh window and the system clock.
    pub fn new(http: HttpClient, base_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            refresh_window: Duration::from_secs(DEFAULT_REFRESH_WINDOW_SECS),
            clock: Arc::new(SystemClock),
            credential: Mutex::new(credential),
        }
    }

    /// Authenticate and wrap the resulting credential
    pub async fn login(
        http: HttpClient,
        base_url: impl Into<String>,
        request: &AuthRequest,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let credential = authenticate(&http, &base_url, request, &SystemClock).await?;
        Ok(Self::new(http, base_url, credential))
    }

    #[must_use]
    pub fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn refresh_window(&self) -> Duration {
        self.refresh_window
    }

    /// Snapshot of the current credential
    pub async fn credential(&self) -> Credential {
        self.credential.lock().await.clone()
    }

    /// Refresh when `now + refresh_window > expires_at`, otherwise do nothing
    ///
    /// The lock is held across the check and the refresh round-trip, so
    /// callers that queued behind a refresh see the new expiry and skip.
    #[instrument(skip(self))]
    pub async fn ensure_fresh(&self) -> Result<(), ApiError> {
        let mut credential = self.credential.lock().await;

        let now = self.clock.utc_now();
        if !credential.will_expire_soon_at(now, self.refresh_window) {
            return Ok(());
        }

        debug!(
            seconds_left = credential.seconds_until_expiry_at(now),
            "credential inside refresh window"
        );
        self.refresh_locked(&mut credential).await
    }

    async fn refresh_locked(&self, credential: &mut Credential) -> Result<(), ApiError> {
        let request = TokenRefreshRequest::new(credential.refresh_token.clone());
        let response =
            exchange(&self.http, &self.base_url, REFRESH_ENDPOINT, &request, AuthStage::Refresh)
                .await
                .inspect_err(|err| warn!(error = %err, "token refresh failed"))?;

        credential.apply_refresh(response, self.clock.utc_now());
        info!(expires_at = %credential.expires_at, "credential refreshed");
        Ok(())
    }
}

#[async_trait]
impl AccessTokenProvider for TokenManager {
    async fn ensure_fresh(&self) -> Result<(), ApiError> {
        TokenManager::ensure_fresh(self).await
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        Ok(self.credential.lock().await.access_token.clone())
    }
}
