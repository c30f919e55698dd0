//! Conversions from external infrastructure errors into API errors.

use reqwest::Error as HttpError;
use veeam_domain::VeeamError;

use crate::api::errors::ApiError;

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for ApiError {
    fn from(err: HttpError) -> Self {
        if err.is_timeout() {
            return ApiError::Transport(format!("HTTP request timed out: {err}"));
        }

        if err.is_connect() {
            return ApiError::Transport(format!("HTTP connection failure: {err}"));
        }

        if err.is_decode() {
            return ApiError::Decode(err.to_string());
        }

        if err.is_builder() {
            return ApiError::Config(format!("invalid HTTP request: {err}"));
        }

        if let Some(status) = err.status() {
            return ApiError::Api { status: status.as_u16() };
        }

        ApiError::Transport(err.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* VeeamError → ApiError */
/* -------------------------------------------------------------------------- */

impl From<VeeamError> for ApiError {
    fn from(err: VeeamError) -> Self {
        match err {
            VeeamError::Config(message) | VeeamError::Internal(message) => {
                ApiError::Config(message)
            }
            VeeamError::InvalidInput(message) => ApiError::Decode(message),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
