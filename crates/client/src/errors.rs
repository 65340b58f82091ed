//! API error taxonomy.
//!
//! Every failed request is classified into exactly one of these
//! categories; the classifier picks the policy action (session
//! invalidation, notification, breaker feedback) from the category and
//! then re-raises the error to the caller unchanged.

use std::time::Duration;

use thiserror::Error;

/// Sentinel message for requests rejected locally by the breaker gate,
/// distinguishable from genuine transport or HTTP failures.
pub const UNREACHABLE_SENTINEL: &str = "SERVER_UNREACHABLE";

/// API operation errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401. Session invalidation already happened by the time the
    /// caller sees this.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// HTTP 403.
    #[error("access denied: {message}")]
    Forbidden { message: String },

    /// HTTP 404. Treated as expected absence; never surfaces a toast.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// HTTP 409, or any error response whose message text is
    /// conflict-shaped (see [`is_conflict_message`]). `status` keeps the
    /// original code, which is not necessarily 409.
    #[error("conflict ({status}): {message}")]
    Conflict { status: u16, message: String },

    /// Any other HTTP error response.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Rejected locally by the breaker gate; the network was never
    /// attempted.
    #[error("SERVER_UNREACHABLE")]
    Unreachable,

    /// Transport-level failure (DNS, refused connection, reset).
    #[error("network error: {message}")]
    Network { message: String },

    /// The configured per-request deadline elapsed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Body (de)serialization failed.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status behind this error, or `None` for failures that never
    /// produced a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Unreachable
            | Self::Network { .. }
            | Self::Timeout(_)
            | Self::Config(_)
            | Self::Decode(_) => None,
        }
    }

    /// Whether this failure never reached the HTTP layer.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Unreachable | Self::Network { .. } | Self::Timeout(_))
    }
}

/// Case-insensitive check for conflict-shaped error messages.
///
/// Some backend paths answer 200/400 with a conflict-worded message
/// instead of a proper 409; those must still land in the conflict
/// category.
pub fn is_conflict_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("conflict") || lower.contains("already exists")
}
