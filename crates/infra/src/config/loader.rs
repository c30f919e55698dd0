//! Configuration loader
//!
//! Loads provider configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `VEEAM_HOST`: Server hostname or URL (required)
//! - `VEEAM_USERNAME`: Login user (required)
//! - `VEEAM_PASSWORD`: Login password (required)
//! - `VEEAM_INSECURE`: Skip TLS verification (true/false)
//! - `VEEAM_TIMEOUT_SECS`: Per-attempt HTTP timeout in seconds
//! - `VEEAM_REFRESH_WINDOW_SECS`: Refresh the token this long before expiry
//! - `VEEAM_MAX_RETRIES`: Retries after the first attempt
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./veeam.json` or `./veeam.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../` and `../../` variants of the above
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use veeam_domain::constants::{
    ENV_HOST, ENV_INSECURE, ENV_MAX_RETRIES, ENV_PASSWORD, ENV_REFRESH_WINDOW_SECS,
    ENV_TIMEOUT_SECS, ENV_USERNAME,
};
use veeam_domain::{ProviderConfig, Result, VeeamError};

const CONFIG_FILE_NAMES: [&str; 4] = ["veeam.json", "veeam.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `VeeamError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<ProviderConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Host, username, and password must be set; everything else falls back to
/// its default.
///
/// # Errors
/// Returns `VeeamError::Config` if required variables are missing or a
/// numeric variable does not parse.
pub fn load_from_env() -> Result<ProviderConfig> {
    let mut config = ProviderConfig::new(
        env_string(ENV_HOST),
        env_string(ENV_USERNAME),
        env_string(ENV_PASSWORD),
    );
    config.insecure = env_bool(ENV_INSECURE, false);

    if let Some(timeout) = env_parse::<u64>(ENV_TIMEOUT_SECS)? {
        config.timeout_secs = timeout;
    }
    if let Some(window) = env_parse::<u64>(ENV_REFRESH_WINDOW_SECS)? {
        config.refresh_window_secs = window;
    }
    if let Some(retries) = env_parse::<u32>(ENV_MAX_RETRIES)? {
        config.retry.max_retries = retries;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// `VEEAM_PASSWORD` fills in a password the file leaves out.
///
/// # Errors
/// Returns `VeeamError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<ProviderConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(VeeamError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            VeeamError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| VeeamError::Config(format!("Failed to read config file: {}", e)))?;

    let mut config = parse_config(&contents, &config_path)?;
    if config.password.is_empty() {
        config.password = env_string(ENV_PASSWORD);
    }

    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ProviderConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| VeeamError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| VeeamError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(VeeamError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| [root.clone(), root.join(".."), root.join("../..")])
        .flat_map(|dir| CONFIG_FILE_NAMES.map(|name| dir.join(name)))
        .find(|path| path.exists())
}

/// Read an environment variable, treating unset as empty
fn env_string(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `VeeamError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| VeeamError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
