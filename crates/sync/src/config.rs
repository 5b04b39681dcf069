//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PURESTREAM_REMOTE_URL` - Base URL of the remote order source
//!
//! ## Optional
//! - `PURESTREAM_API_KEY` - Bearer token for the remote source
//! - `PURESTREAM_POLL_INTERVAL_SECS` - Refresh cadence (default: 30,
//!   accepted range: 5-300)
//! - `PURESTREAM_DELIVERY_LEAD_DAYS` - Lead time for derived delivery
//!   estimates (default: 7)
//! - `PURESTREAM_DEFAULT_COUNTRY` - Country elided from formatted
//!   addresses (default: India)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const MIN_POLL_INTERVAL_SECS: u64 = 5;
const MAX_POLL_INTERVAL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Sync engine configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SyncConfig {
    /// Base URL of the remote order source.
    pub remote_url: String,
    /// Bearer token for the remote source, when it requires one.
    pub api_key: Option<SecretString>,
    /// Refresh cadence for sync schedulers.
    pub poll_interval: Duration,
    /// Lead time added to the order date for derived delivery estimates.
    pub delivery_lead_days: i64,
    /// Country elided from formatted addresses.
    pub default_country: String,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("remote_url", &self.remote_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("poll_interval", &self.poll_interval)
            .field("delivery_lead_days", &self.delivery_lead_days)
            .field("default_country", &self.default_country)
            .finish()
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any
    /// variable fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let remote_url = get_required_env("PURESTREAM_REMOTE_URL")?;
        let api_key = get_optional_env("PURESTREAM_API_KEY").map(SecretString::from);
        let poll_interval = parse_poll_interval(&get_env_or_default(
            "PURESTREAM_POLL_INTERVAL_SECS",
            &DEFAULT_POLL_INTERVAL_SECS.to_string(),
        ))?;
        let delivery_lead_days = get_env_or_default("PURESTREAM_DELIVERY_LEAD_DAYS", "7")
            .parse::<i64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PURESTREAM_DELIVERY_LEAD_DAYS".to_string(), e.to_string())
            })?;
        let default_country = get_env_or_default("PURESTREAM_DEFAULT_COUNTRY", "India");

        Ok(Self {
            remote_url,
            api_key,
            poll_interval,
            delivery_lead_days,
            default_country,
        })
    }
}

fn parse_poll_interval(value: &str) -> Result<Duration, ConfigError> {
    let secs = value.parse::<u64>().map_err(|e| {
        ConfigError::InvalidEnvVar("PURESTREAM_POLL_INTERVAL_SECS".to_string(), e.to_string())
    })?;
    if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&secs) {
        return Err(ConfigError::InvalidEnvVar(
            "PURESTREAM_POLL_INTERVAL_SECS".to_string(),
            format!("must be between {MIN_POLL_INTERVAL_SECS} and {MAX_POLL_INTERVAL_SECS} seconds (got {secs})"),
        ));
    }
    Ok(Duration::from_secs(secs))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
