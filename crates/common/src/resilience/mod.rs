//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request fails at the transport level:
//!     → HealthMonitor::report_network_error() (UP → DOWN, once)
//!     → recovery poll loop starts (health.rs)
//!     → every poll interval: HealthProbe::check() (probe.rs)
//!     → any HTTP response observed (DOWN → UP, loop cancelled)
//! ```
//!
//! # Design Decisions
//! - Two-state breaker: requests either flow or fail fast, no half-open
//!   trickle. Recovery is driven by the out-of-band probe instead.
//! - One breaker per backend origin, shared by all client variants.
//! - The probe bypasses the request pipeline entirely so it can never be
//!   gated by the breaker it is trying to close.

pub mod health;
pub mod probe;

pub use health::{
    ConfigError, HealthConfig, HealthConfigBuilder, HealthMetrics, HealthMonitor,
    HealthMonitorBuilder,
};
pub use probe::{HealthProbe, HttpHealthProbe};
