//! Request interceptor.
//!
//! Runs before every outbound call, in order:
//! 1. Breaker gate: fail fast with the unreachable sentinel while the
//!    health monitor reports DOWN; the network is never attempted.
//! 2. Bearer injection: authenticated clients attach the session token
//!    when one is present; the public variant skips this step.
//! 3. Content-type negotiation: JSON bodies get `application/json`;
//!    multipart bodies get nothing from this layer, because overriding
//!    the transport's `multipart/form-data; boundary=…` corrupts the
//!    upload.

use std::sync::Arc;

use huddle_common::HealthMonitor;
use tracing::debug;

use crate::errors::ApiError;
use crate::session::SessionProvider;

/// Outbound payload shape; drives content-type negotiation.
pub(crate) enum RequestPayload {
    Empty,
    Json(serde_json::Value),
    Multipart(reqwest::multipart::Form),
}

impl RequestPayload {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Json(_) => "json",
            Self::Multipart(_) => "multipart",
        }
    }
}

/// Apply the interceptor steps to a request under construction.
pub(crate) async fn before_request(
    health: &HealthMonitor,
    session: Option<&Arc<dyn SessionProvider>>,
    mut builder: reqwest::RequestBuilder,
    payload: RequestPayload,
) -> Result<reqwest::RequestBuilder, ApiError> {
    if health.is_server_down() {
        debug!("request rejected locally: server marked unreachable");
        return Err(ApiError::Unreachable);
    }

    if let Some(session) = session {
        if let Some(token) = session.access_token().await {
            builder = builder.bearer_auth(token);
        }
    }

    debug!(payload = payload.kind(), "request prepared");
    let builder = match payload {
        RequestPayload::Empty => builder,
        // .json() sets Content-Type: application/json
        RequestPayload::Json(body) => builder.json(&body),
        // .multipart() owns the content type and its boundary
        RequestPayload::Multipart(form) => builder.multipart(form),
    };

    Ok(builder)
}
