//! Domain constants
//!
//! Endpoint paths, environment variable names, and defaults shared by the
//! configuration loader and the API client.

// Token endpoints (relative to the normalized base URL)
pub const TOKEN_ENDPOINT: &str = "/api/v1/token";
pub const REFRESH_ENDPOINT: &str = "/api/v1/refresh";
pub const REFRESH_GRANT_TYPE: &str = "refresh_token";

// Base URL normalization
pub const DEFAULT_SCHEME: &str = "https://";

// Transport defaults
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("veeam-provider/", env!("CARGO_PKG_VERSION"));

// Credential refresh window (5 minutes before expiry)
pub const DEFAULT_REFRESH_WINDOW_SECS: u64 = 300;

// Retry defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

// Environment variables consumed by the configuration loader
pub const ENV_HOST: &str = "VEEAM_HOST";
pub const ENV_USERNAME: &str = "VEEAM_USERNAME";
pub const ENV_PASSWORD: &str = "VEEAM_PASSWORD";
pub const ENV_INSECURE: &str = "VEEAM_INSECURE";
pub const ENV_TIMEOUT_SECS: &str = "VEEAM_TIMEOUT_SECS";
pub const ENV_REFRESH_WINDOW_SECS: &str = "VEEAM_REFRESH_WINDOW_SECS";
pub const ENV_MAX_RETRIES: &str = "VEEAM_MAX_RETRIES";
