//! API client with token refresh and retry logic
//!
//! Every call refreshes the credential if needed, then runs the request
//! through the retry executor. Each attempt reads the current access token
//! when it is sent.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;
use veeam_common::resilience::{policies, RetryConfig, RetryExecutor, RetryPolicy};
use veeam_domain::{normalize_base_url, normalize_endpoint, AuthRequest, ProviderConfig};

use super::auth::{AccessTokenProvider, TokenManager};
use super::errors::ApiError;
use super::request::ApiRequest;
use crate::http::{HttpClient, HttpResponse};

/// Retry policy shared by every call of one client
pub type SharedRetryPolicy = Arc<dyn RetryPolicy<HttpResponse, ApiError> + Send + Sync>;

/// Authenticated client for the backup server REST API
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    auth: Arc<dyn AccessTokenProvider>,
    executor: RetryExecutor<SharedRetryPolicy>,
}

impl ApiClient {
    /// Validate `config`, authenticate once, and return a ready client
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] for invalid configuration, and the
    /// authentication error if the token endpoint rejects the credentials.
    #[instrument(skip(config), fields(host = %config.host, username = %config.username))]
    pub async fn connect(config: &ProviderConfig) -> Result<Self, ApiError> {
        config.validate()?;

        let base_url = config.base_url();
        if config.insecure {
            warn!("TLS certificate verification is disabled");
        }
        let http = HttpClient::builder()
            .timeout(config.timeout())
            .accept_invalid_certs(config.insecure)
            .build()?;

        let mut request = AuthRequest::new(&config.username, &config.password);
        if let Some(domain) = &config.domain {
            request = request.with_domain(domain.as_str());
        }
        let tokens = TokenManager::login(http.clone(), &base_url, &request)
            .await?
            .with_refresh_window(config.refresh_window());

        let retry = RetryConfig::builder()
            .max_retries(config.retry.max_retries)
            .exponential_backoff(
                config.retry.base_delay(),
                config.retry.multiplier,
                config.retry.max_delay(),
            )
            .build()
            .map_err(|err| ApiError::Config(err.to_string()))?;

        info!(base_url = %base_url, "connected to backup server");

        Self::builder()
            .base_url(base_url)
            .http_client(http)
            .auth(Arc::new(tokens))
            .retry_config(retry)
            .build()
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_config(&self) -> &RetryConfig {
        self.executor.config()
    }

    /// Start a request with per-call options
    pub fn request(&self, method: Method, endpoint: &str) -> ApiRequest<'_> {
        ApiRequest::new(self, method, endpoint)
    }

    /// GET, returning the final response whatever its status
    pub async fn get(&self, endpoint: &str) -> Result<HttpResponse, ApiError> {
        self.request(Method::GET, endpoint).send().await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<HttpResponse, ApiError> {
        self.request(Method::POST, endpoint).json(body).send().await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<HttpResponse, ApiError> {
        self.request(Method::PUT, endpoint).json(body).send().await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<HttpResponse, ApiError> {
        self.request(Method::DELETE, endpoint).send().await
    }

    /// GET and decode the JSON response
    ///
    /// # Errors
    ///
    /// Status 400 or above is [`ApiError::Api`] without reading the body;
    /// a malformed body is [`ApiError::Decode`].
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint).send_json().await
    }

    /// POST a JSON body and decode the JSON response
    ///
    /// Use `serde::de::IgnoredAny` as `T` to skip decoding.
    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, endpoint).json(body).send_json().await
    }

    pub async fn put_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, endpoint).json(body).send_json().await
    }

    /// DELETE and check the status; the response body is ignored
    pub async fn delete_json(&self, endpoint: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, endpoint).send_checked().await.map(drop)
    }

    #[instrument(
        skip(self, method, endpoint, body, max_retries),
        fields(method = %method, endpoint = %endpoint)
    )]
    pub(crate) async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
        max_retries: Option<u32>,
    ) -> Result<HttpResponse, ApiError> {
        self.auth.ensure_fresh().await?;

        let url = format!("{}{}", self.base_url, normalize_endpoint(endpoint));
        let retries = max_retries.unwrap_or(self.executor.config().max_retries);

        let response = self
            .executor
            .execute_with_retries(|| self.attempt(method.clone(), &url, body.as_deref()), retries)
            .await?;

        debug!(status = response.status().as_u16(), "request settled");
        Ok(response)
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, ApiError> {
        let token = self.auth.access_token().await?;

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        self.http.send(request).await
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    http: Option<HttpClient>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
    retry: Option<RetryConfig>,
    policy: Option<SharedRetryPolicy>,
}

impl ApiClientBuilder {
    /// Server host or URL; `https://` is assumed when no scheme is given
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Set the authentication provider
    pub fn auth(mut self, auth: Arc<dyn AccessTokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Replace the default transient-status retry policy
    pub fn retry_policy(mut self, policy: SharedRetryPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if required fields are missing or client creation fails
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = normalize_base_url(self.base_url.as_deref().unwrap_or_default());
        if base_url.is_empty() {
            return Err(ApiError::Config("Base URL not set".to_string()));
        }
        Url::parse(&base_url)
            .map_err(|err| ApiError::Config(format!("invalid base URL {base_url}: {err}")))?;
        let auth = self.auth.ok_or_else(|| ApiError::Config("Auth provider not set".to_string()))?;
        let http = match self.http {
            Some(http) => http,
            None => HttpClient::new()?,
        };
        let policy: SharedRetryPolicy = match self.policy {
            Some(policy) => policy,
            None => Arc::new(policies::TransientStatusPolicy::default()),
        };
        let executor = RetryExecutor::new(self.retry.unwrap_or_default(), policy);

        Ok(ApiClient { http, base_url, auth, executor })
    }
}
