//! User-facing notification contract.
//!
//! The networking layer never renders toasts itself; it calls an injected
//! [`Notifier`]. Hosts without a toast surface keep the [`NoopNotifier`]
//! default, so every call site can notify unconditionally.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

/// Toast severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
        }
    }
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    /// Surface a notification. `message` is optional detail text below the
    /// title.
    fn notify(&self, severity: Severity, title: &str, message: Option<&str>);
}

/// Default notifier that drops everything (logs at debug for diagnosis).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, severity: Severity, title: &str, message: Option<&str>) {
        debug!(%severity, title, message, "notification dropped (no notifier installed)");
    }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, severity: Severity, title: &str, message: Option<&str>) {
        (**self).notify(severity, title, message);
    }
}
