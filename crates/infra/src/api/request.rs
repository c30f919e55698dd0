//! Per-call options for [`ApiClient`] requests

use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::client::ApiClient;
use super::errors::ApiError;
use crate::http::HttpResponse;

/// A request being assembled against an [`ApiClient`]
///
/// Nothing is sent until one of the `send*` methods is awaited.
#[must_use = "requests do nothing until sent"]
pub struct ApiRequest<'a> {
    client: &'a ApiClient,
    method: Method,
    endpoint: String,
    body: Option<Result<Vec<u8>, ApiError>>,
    cancel: Option<CancellationToken>,
    deadline: Option<Duration>,
    max_retries: Option<u32>,
}

impl<'a> ApiRequest<'a> {
    pub(crate) fn new(client: &'a ApiClient, method: Method, endpoint: &str) -> Self {
        Self {
            client,
            method,
            endpoint: endpoint.to_string(),
            body: None,
            cancel: None,
            deadline: None,
            max_retries: None,
        }
    }

    /// Attach a JSON body, serialized once and resent on every attempt
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(
            serde_json::to_vec(body).map_err(|err| ApiError::Encode(err.to_string())),
        );
        self
    }

    /// Abort the call when `token` is cancelled
    ///
    /// Cancellation drops the in-flight attempt or backoff sleep and fails
    /// the call with [`ApiError::Cancelled`]. It is never retried.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Bound the whole call, refresh and retries included
    ///
    /// Elapsing fails the call with [`ApiError::Timeout`].
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Override the client's retry budget for this call
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Send and return the final response whatever its status
    pub async fn send(self) -> Result<HttpResponse, ApiError> {
        self.run(|client, method, endpoint, body, retries| async move {
            client.execute(method, &endpoint, body, retries).await
        })
        .await
    }

    /// Send and fail with [`ApiError::Api`] on status 400 or above
    pub async fn send_checked(self) -> Result<HttpResponse, ApiError> {
        self.run(|client, method, endpoint, body, retries| async move {
            client.execute(method, &endpoint, body, retries).await?.error_for_status()
        })
        .await
    }

    /// Send and decode a JSON response
    ///
    /// Status 400 or above is [`ApiError::Api`] and the body is not read.
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        self.run(|client, method, endpoint, body, retries| async move {
            client.execute(method, &endpoint, body, retries).await?.error_for_status()?.json().await
        })
        .await
    }

    async fn run<F, Fut, T>(self, call: F) -> Result<T, ApiError>
    where
        F: FnOnce(&'a ApiClient, Method, String, Option<Vec<u8>>, Option<u32>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let Self { client, method, endpoint, body, cancel, deadline, max_retries } = self;
        let call = call(client, method, endpoint, body.transpose()?, max_retries);

        let bounded = async move {
            match deadline {
                Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                    debug!(deadline_ms = limit.as_millis() as u64, "request deadline exceeded");
                    Err(ApiError::Timeout(limit))
                }),
                None => call.await,
            }
        };

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("request cancelled by caller");
                        Err(ApiError::Cancelled)
                    }
                    result = bounded => result,
                }
            }
            None => bounded.await,
        }
    }
}
