//! Health probe seam.
//!
//! The recovery loop asks a [`HealthProbe`] whether the backend is
//! reachable. Production uses [`HttpHealthProbe`]; tests inject scripted
//! probes.

use async_trait::async_trait;
use tracing::debug;

use super::health::ConfigError;

/// Reachability check against the backend health endpoint.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Returns `true` if the backend produced any response at all.
    ///
    /// Only transport-level failures (timeout, DNS, refused connection)
    /// count as unreachable. A 404 from a backend without a dedicated
    /// health route is still proof of life, and recovery must treat it as
    /// such.
    async fn check(&self, url: &str) -> bool;
}

/// Probe that issues a bare GET outside the interceptor pipeline.
///
/// Deliberately does not share the API client: the probe must never be
/// gated by the breaker, carry auth headers, or feed the classifier.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HttpHealthProbe {
    /// Build the probe with its own connection pool.
    pub fn new() -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder().no_proxy().build().map_err(|e| {
            ConfigError::Invalid { message: format!("failed to build probe client: {e}") }
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn check(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                // Any status code, success or not, means the server answered.
                debug!(%url, status = %response.status(), "health probe got a response");
                true
            }
            Err(err) => {
                debug!(%url, error = %err, "health probe transport failure");
                false
            }
        }
    }
}
