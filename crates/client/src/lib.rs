//! # Huddle API client
//!
//! HTTP access layer for the Huddle backend with built-in resilience:
//! every request passes through a breaker gate before touching the
//! network, and every settled response passes through a classifier that
//! maps failures to a closed taxonomy and drives the matching side
//! effects (session invalidation, user notification, breaker feedback).
//!
//! ## Architecture
//!
//! ```text
//! caller
//!   → interceptor (breaker gate → bearer auth → content-type)
//!   → transport (reqwest)
//!   → classifier (taxonomy → session/notify/health side effects)
//!   → caller (original error always re-raised)
//! ```
//!
//! Two variants are exposed: [`ApiClient::new`] builds the authenticated
//! client (bearer injection, 401 handling), [`ApiClient::public`] the
//! anonymous one (still breaker-protected and classified).

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

mod classifier;
mod interceptor;

pub mod client;
pub mod config;
pub mod errors;
pub mod session;

// Re-export commonly used items
pub use client::{ApiClient, ApiClientBuilder};
pub use config::ClientConfig;
pub use errors::{is_conflict_message, ApiError, UNREACHABLE_SENTINEL};
pub use session::{InMemorySession, SessionProvider};
