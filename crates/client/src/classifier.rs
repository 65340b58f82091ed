//! Response classifier.
//!
//! Runs on every settled transfer as the last step before control
//! returns to the caller. Successes pass through untouched; failures are
//! mapped onto the [`ApiError`] taxonomy and the matching policy action
//! fires (session invalidation, notification, breaker feedback). The
//! original failure is always re-raised; this layer reacts to errors, it
//! never swallows them.

use std::sync::Arc;
use std::time::Duration;

use huddle_common::{HealthMonitor, Notifier, Severity};
use reqwest::{Method, Response, StatusCode};
use tracing::{debug, warn};

use crate::errors::{is_conflict_message, ApiError};
use crate::session::SessionProvider;

const GENERIC_CONFLICT: &str = "The request conflicts with existing data.";
const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Classify a settled transfer and run its policy action.
pub(crate) async fn after_response(
    result: Result<Response, reqwest::Error>,
    method: &Method,
    url: &str,
    timeout: Duration,
    health: &HealthMonitor,
    session: Option<&Arc<dyn SessionProvider>>,
    notifier: &Arc<dyn Notifier>,
) -> Result<Response, ApiError> {
    match result {
        Ok(response) if response.status().is_success() => Ok(response),
        Ok(response) => Err(classify_http_failure(response, method, url, session, notifier).await),
        Err(err) => Err(classify_transport_failure(&err, method, url, timeout, health)),
    }
}

async fn classify_http_failure(
    response: Response,
    method: &Method,
    url: &str,
    session: Option<&Arc<dyn SessionProvider>>,
    notifier: &Arc<dyn Notifier>,
) -> ApiError {
    let status = response.status();
    let server_message = extract_message(response).await;
    let context = request_context(method, url, status, server_message.as_deref());
    warn!(%method, url, status = status.as_u16(), "request failed");

    match status {
        StatusCode::UNAUTHORIZED => {
            if let Some(session) = session {
                let had_session = session.is_authenticated().await;
                session.invalidate().await;
                if had_session {
                    notifier.notify(
                        Severity::Warn,
                        "Session Expired",
                        Some("Please sign in again."),
                    );
                } else {
                    // Anonymous 401: clear silently, a "logged out" toast
                    // would be wrong for a user who never logged in.
                    debug!("anonymous 401; session cleared silently");
                }
            }
            ApiError::Unauthorized { message: context }
        }
        StatusCode::FORBIDDEN => {
            notifier.notify(
                Severity::Error,
                "Access Denied",
                Some("You do not have permission to do that."),
            );
            ApiError::Forbidden { message: context }
        }
        StatusCode::NOT_FOUND => {
            // Expected absence, especially for reads; no toast.
            ApiError::NotFound { message: context }
        }
        StatusCode::CONFLICT => {
            notify_conflict(notifier, server_message.as_deref());
            ApiError::Conflict { status: status.as_u16(), message: context }
        }
        _ if server_message.as_deref().is_some_and(is_conflict_message) => {
            // Conflict-shaped message behind a non-409 status
            notify_conflict(notifier, server_message.as_deref());
            ApiError::Conflict { status: status.as_u16(), message: context }
        }
        _ => {
            let detail = server_message.unwrap_or_else(|| GENERIC_FAILURE.to_string());
            notifier.notify(Severity::Error, "Request Failed", Some(&detail));
            ApiError::Api { status: status.as_u16(), message: context }
        }
    }
}

fn classify_transport_failure(
    err: &reqwest::Error,
    method: &Method,
    url: &str,
    timeout: Duration,
    health: &HealthMonitor,
) -> ApiError {
    warn!(%method, url, error = %err, "transport failure; feeding health monitor");
    // No per-request toast here: the status-change event drives a single
    // persistent banner instead of one toast per failed request.
    health.report_network_error();

    if err.is_timeout() {
        ApiError::Timeout(timeout)
    } else {
        ApiError::Network { message: format!("{method} {url}: {err}") }
    }
}

fn notify_conflict(notifier: &Arc<dyn Notifier>, server_message: Option<&str>) {
    notifier.notify(Severity::Warn, "Conflict", Some(server_message.unwrap_or(GENERIC_CONFLICT)));
}

/// Pull a human-readable message out of an error response body.
async fn extract_message(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    message_from_body(&text)
}

fn message_from_body(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return Some(message.to_string());
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn request_context(
    method: &Method,
    url: &str,
    status: StatusCode,
    message: Option<&str>,
) -> String {
    match message {
        Some(m) => format!("{method} {url} returned status {status}: {m}"),
        None => format!("{method} {url} returned status {status}"),
    }
}
