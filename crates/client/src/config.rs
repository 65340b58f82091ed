//! Client configuration.
//!
//! Loads from environment variables with sensible defaults; read once at
//! client construction time.
//!
//! ## Environment Variables
//! - `API_BASE_URL`: base URL of the backend API
//! - `API_TIMEOUT_MS`: per-request timeout in milliseconds

use std::time::Duration;

use crate::errors::ApiError;

/// Default backend origin.
pub const DEFAULT_BASE_URL: &str = "https://api.huddle.app/v1";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Configuration for an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL all request paths are appended to (no trailing slash).
    pub base_url: String,
    /// Per-request timeout. The health probe carries its own, shorter
    /// deadline; see `huddle_common::resilience`.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string(), timeout: DEFAULT_TIMEOUT }
    }
}

impl ClientConfig {
    /// Create a configuration for a given backend with the default
    /// timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: normalize(&base_url.into()), timeout: DEFAULT_TIMEOUT }
    }

    /// Load configuration from the environment, falling back to defaults
    /// for unset variables.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = match std::env::var("API_BASE_URL") {
            Ok(raw) if !raw.trim().is_empty() => normalize(raw.trim()),
            _ => DEFAULT_BASE_URL.to_string(),
        };

        let timeout = match std::env::var("API_TIMEOUT_MS") {
            Ok(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|e| {
                    ApiError::Config(format!("invalid API_TIMEOUT_MS '{raw}': {e}"))
                })?;
                Duration::from_millis(millis)
            }
            Err(_) => DEFAULT_TIMEOUT,
        };

        let config = Self { base_url, timeout };
        config.validate()?;

        tracing::debug!(base_url = %config.base_url, timeout_ms = config.timeout.as_millis() as u64, "client configuration loaded");
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ApiError> {
        url::Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL '{}': {e}", self.base_url)))?;
        if self.timeout.is_zero() {
            return Err(ApiError::Config("timeout must be greater than zero".into()));
        }
        Ok(())
    }

    /// URL of the health endpoint derived from the configured base.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

fn normalize(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
