//! Provider configuration
//!
//! Everything the API access core consumes from the surrounding provider:
//! connection details, credentials, and tuning knobs for the token refresh
//! window and the retry policy.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_REFRESH_WINDOW_SECS, DEFAULT_SCHEME, DEFAULT_TIMEOUT_SECS, ENV_HOST, ENV_PASSWORD,
    ENV_USERNAME,
};
use crate::errors::{Result, VeeamError};

/// Provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Server hostname, IP, or URL (scheme optional)
    pub host: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Optional login domain sent with the token request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_window_secs")]
    pub refresh_window_secs: u64,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Retry tuning for resource calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetrySettings {
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// # Errors
    /// Returns `VeeamError::Config` for a non-finite multiplier or one below
    /// 1, or a ceiling below the base delay.
    pub fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(VeeamError::Config(format!(
                "retry multiplier must be a finite number >= 1, got {}",
                self.multiplier
            )));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(VeeamError::Config(format!(
                "retry max_delay_ms ({}) must not be below base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_refresh_window_secs() -> u64 {
    DEFAULT_REFRESH_WINDOW_SECS
}

impl ProviderConfig {
    /// Configuration with defaults for everything but the connection details
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            domain: None,
            insecure: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh_window_secs: DEFAULT_REFRESH_WINDOW_SECS,
            retry: RetrySettings::default(),
        }
    }

    /// Check that the provider can be configured from these values
    ///
    /// # Errors
    /// Returns `VeeamError::Config` naming the first missing or invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(missing("Host", "host", ENV_HOST));
        }
        if self.username.is_empty() {
            return Err(missing("Username", "username", ENV_USERNAME));
        }
        if self.password.is_empty() {
            return Err(missing("Password", "password", ENV_PASSWORD));
        }
        if self.timeout_secs == 0 {
            return Err(VeeamError::Config("timeout_secs must be greater than 0".into()));
        }
        self.retry.validate()
    }

    /// Scheme-qualified base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> String {
        normalize_base_url(&self.host)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn refresh_window(&self) -> Duration {
        Duration::from_secs(self.refresh_window_secs)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .field("insecure", &self.insecure)
            .field("timeout_secs", &self.timeout_secs)
            .field("refresh_window_secs", &self.refresh_window_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

fn missing(title: &str, attribute: &str, env: &str) -> VeeamError {
    VeeamError::Config(format!(
        "Missing {title} Configuration: the provider requires a {attribute} to be configured. \
         Please provide a value for the {attribute} attribute or set the {env} environment variable."
    ))
}

/// Prepend `https://` when `host` carries no scheme and drop trailing slashes
///
/// An empty host stays empty.
#[must_use]
pub fn normalize_base_url(host: &str) -> String {
    let host = host.trim();
    if host.is_empty() {
        return String::new();
    }

    let qualified = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{host}")
    };

    qualified.trim_end_matches('/').to_string()
}

/// Make sure `endpoint` starts with exactly one `/`
#[must_use]
pub fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{endpoint}")
    }
}
