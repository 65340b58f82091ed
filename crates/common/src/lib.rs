//! Shared resilience primitives for the Huddle client stack.
//!
//! This crate carries the pieces that every Huddle client variant shares:
//! - `resilience`: the server health monitor (circuit breaker with a
//!   self-healing recovery poll) and its probe seam
//! - `events`: the server-status broadcast channel that UI banners and
//!   loggers subscribe to
//! - `notify`: the user-facing toast contract with a no-op default
//! - `time`: clock abstraction for deterministic tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod events;
pub mod notify;
pub mod resilience;
pub mod time;

// Re-export commonly used types for convenience
pub use events::{ServerStatus, StatusChannel, StatusReceiver};
pub use notify::{NoopNotifier, Notifier, Severity};
pub use resilience::{
    ConfigError, HealthConfig, HealthConfigBuilder, HealthMetrics, HealthMonitor,
    HealthMonitorBuilder, HealthProbe, HttpHealthProbe,
};
pub use time::{Clock, MockClock, SystemClock};
