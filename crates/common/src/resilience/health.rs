//! Server health monitor (circuit breaker with self-healing poll).
//!
//! # States
//! - UP: outbound requests may attempt the network
//! - DOWN: outbound requests fail fast locally; a recovery poll loop is
//!   active
//!
//! # State Transitions
//! ```text
//! UP → DOWN: report_network_error() (idempotent; first call wins)
//! DOWN → UP: recovery probe observes any HTTP response
//! ```
//!
//! Exactly one status event is emitted per actual transition, and the
//! recovery loop exists iff the monitor is DOWN (until `shutdown`, which is
//! terminal teardown).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::probe::{HealthProbe, HttpHealthProbe};
use crate::events::{ServerStatus, StatusChannel, StatusReceiver};
use crate::notify::{NoopNotifier, Notifier, Severity};
use crate::time::{Clock, SystemClock};

/// Default interval between recovery probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Default deadline for a single probe attempt.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Simple configuration error for validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration result type.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration for the health monitor.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Absolute URL of the health endpoint (e.g. `https://api…/v1/health`).
    pub health_url: String,
    /// Interval between recovery probes while DOWN.
    pub poll_interval: Duration,
    /// Deadline for a single probe attempt; exceeding it counts as a
    /// failed probe, not a crash.
    pub probe_timeout: Duration,
}

impl HealthConfig {
    /// Create a configuration with default timings.
    pub fn new(health_url: impl Into<String>) -> Self {
        Self {
            health_url: health_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Create a configuration builder.
    pub fn builder(health_url: impl Into<String>) -> HealthConfigBuilder {
        HealthConfigBuilder { config: Self::new(health_url) }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.health_url.is_empty() {
            return Err(ConfigError::Invalid { message: "health_url must not be empty".into() });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                message: "poll_interval must be greater than zero".into(),
            });
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                message: "probe_timeout must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// Builder for [`HealthConfig`].
#[derive(Debug)]
pub struct HealthConfigBuilder {
    config: HealthConfig,
}

impl HealthConfigBuilder {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    pub fn build(self) -> ConfigResult<HealthConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Health monitor metrics for observability.
#[derive(Debug, Clone)]
pub struct HealthMetrics {
    pub is_down: bool,
    pub transitions_to_down: u64,
    pub probe_attempts: u64,
    pub last_transition: Option<Instant>,
}

/// Circuit breaker guarding a single backend origin.
///
/// Shared by every client variant via `Arc`; all mutation goes through
/// [`report_network_error`](Self::report_network_error) and the internal
/// recovery loop.
pub struct HealthMonitor<C: Clock = SystemClock> {
    config: HealthConfig,
    down: Arc<AtomicBool>,
    poll_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    probe: Arc<dyn HealthProbe>,
    status: StatusChannel,
    notifier: Arc<dyn Notifier>,
    clock: Arc<C>,
    transitions_to_down: Arc<AtomicU64>,
    probe_attempts: Arc<AtomicU64>,
    last_transition: Arc<Mutex<Option<Instant>>>,
}

impl HealthMonitor<SystemClock> {
    /// Create a monitor with the default probe, channel, and notifier.
    pub fn new(config: HealthConfig) -> ConfigResult<Self> {
        Self::builder(config).build()
    }

    /// Create a monitor using the builder pattern.
    pub fn builder(config: HealthConfig) -> HealthMonitorBuilder<SystemClock> {
        HealthMonitorBuilder::new(config)
    }
}

impl<C: Clock> HealthMonitor<C> {
    /// Current breaker position. Pure read; safe to call on every request.
    pub fn is_server_down(&self) -> bool {
        self.down.load(Ordering::SeqCst)
    }

    /// Report a transport-level failure.
    ///
    /// Transitions UP → DOWN at most once: repeated calls while already
    /// DOWN neither emit a second status event nor spawn a second poll
    /// loop. Must be called from within a tokio runtime.
    pub fn report_network_error(&self) {
        // swap() makes exactly one caller observe the transition.
        if self.down.swap(true, Ordering::SeqCst) {
            debug!("backend already marked down; ignoring repeated report");
            return;
        }

        self.transitions_to_down.fetch_add(1, Ordering::Relaxed);
        self.stamp_transition();
        warn!(health_url = %self.config.health_url, "backend unreachable; circuit opened");

        self.status.emit(ServerStatus { is_down: true });
        self.spawn_poll_loop();
    }

    /// Register a listener for UP/DOWN transitions.
    pub fn subscribe(&self) -> StatusReceiver {
        self.status.subscribe()
    }

    /// The underlying status channel (for wiring additional emitters or
    /// listeners at construction time).
    pub fn status_channel(&self) -> &StatusChannel {
        &self.status
    }

    /// Whether a recovery poll loop is currently active.
    ///
    /// Invariant outside of teardown: `is_polling() == is_server_down()`.
    pub fn is_polling(&self) -> bool {
        self.poll_task.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Snapshot of monitor metrics.
    pub fn metrics(&self) -> HealthMetrics {
        HealthMetrics {
            is_down: self.is_server_down(),
            transitions_to_down: self.transitions_to_down.load(Ordering::Relaxed),
            probe_attempts: self.probe_attempts.load(Ordering::Relaxed),
            last_transition: self.last_transition.lock().ok().and_then(|guard| *guard),
        }
    }

    /// Cancel the recovery loop if one is active.
    ///
    /// Safe to call repeatedly and from any state; this is terminal
    /// teardown and does not reset the breaker position.
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.poll_task.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
                debug!("health monitor poll loop cancelled");
            }
        }
    }

    fn stamp_transition(&self) {
        if let Ok(mut guard) = self.last_transition.lock() {
            *guard = Some(self.clock.now());
        }
    }

    fn spawn_poll_loop(&self) {
        let probe = Arc::clone(&self.probe);
        let down = Arc::clone(&self.down);
        let poll_task = Arc::clone(&self.poll_task);
        let probe_attempts = Arc::clone(&self.probe_attempts);
        let last_transition = Arc::clone(&self.last_transition);
        let clock = Arc::clone(&self.clock);
        let status = self.status.clone();
        let notifier = Arc::clone(&self.notifier);
        let poll_interval = self.config.poll_interval;
        let probe_timeout = self.config.probe_timeout;
        let health_url = self.config.health_url.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so the first
            // probe fires one full interval after the outage was reported.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                probe_attempts.fetch_add(1, Ordering::Relaxed);

                let reachable =
                    match tokio::time::timeout(probe_timeout, probe.check(&health_url)).await {
                        Ok(result) => result,
                        Err(_) => {
                            debug!(url = %health_url, "health probe timed out");
                            false
                        }
                    };

                if !reachable {
                    debug!(url = %health_url, "backend still unreachable; will probe again");
                    continue;
                }

                down.store(false, Ordering::SeqCst);
                if let Ok(mut guard) = last_transition.lock() {
                    *guard = Some(clock.now());
                }
                // Detach our own handle before announcing recovery, so a
                // listener that reacts to the event never finds a stale
                // handle for a loop that is about to exit.
                if let Ok(mut guard) = poll_task.lock() {
                    guard.take();
                }
                info!(url = %health_url, "backend reachable again; circuit closed");

                status.emit(ServerStatus { is_down: false });
                notifier.notify(
                    Severity::Success,
                    "Connection restored",
                    Some("The server is reachable again."),
                );
                break;
            }
        });

        if let Ok(mut guard) = self.poll_task.lock() {
            *guard = Some(handle);
        }
    }
}

impl<C: Clock> Drop for HealthMonitor<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<C: Clock> std::fmt::Debug for HealthMonitor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("config", &self.config)
            .field("is_down", &self.is_server_down())
            .field("is_polling", &self.is_polling())
            .finish()
    }
}

/// Builder for [`HealthMonitor`].
pub struct HealthMonitorBuilder<C: Clock = SystemClock> {
    config: HealthConfig,
    probe: Option<Arc<dyn HealthProbe>>,
    status: Option<StatusChannel>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: C,
}

impl HealthMonitorBuilder<SystemClock> {
    pub fn new(config: HealthConfig) -> Self {
        Self { config, probe: None, status: None, notifier: None, clock: SystemClock }
    }
}

impl<C: Clock> HealthMonitorBuilder<C> {
    /// Inject a probe implementation (defaults to [`HttpHealthProbe`]).
    pub fn probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Use an existing status channel instead of a fresh one.
    pub fn status_channel(mut self, status: StatusChannel) -> Self {
        self.status = Some(status);
        self
    }

    /// Inject a notifier (defaults to [`NoopNotifier`]).
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set a custom clock (useful for testing).
    pub fn clock<C2: Clock>(self, clock: C2) -> HealthMonitorBuilder<C2> {
        HealthMonitorBuilder {
            config: self.config,
            probe: self.probe,
            status: self.status,
            notifier: self.notifier,
            clock,
        }
    }

    pub fn build(self) -> ConfigResult<HealthMonitor<C>> {
        self.config.validate()?;

        let probe = match self.probe {
            Some(probe) => probe,
            None => Arc::new(HttpHealthProbe::new()?),
        };

        Ok(HealthMonitor {
            config: self.config,
            down: Arc::new(AtomicBool::new(false)),
            poll_task: Arc::new(Mutex::new(None)),
            probe,
            status: self.status.unwrap_or_default(),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier)),
            clock: Arc::new(self.clock),
            transitions_to_down: Arc::new(AtomicU64::new(0)),
            probe_attempts: Arc::new(AtomicU64::new(0)),
            last_transition: Arc::new(Mutex::new(None)),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the health monitor state machine.
    //!
    //! Tests cover idempotent DOWN reporting, recovery on any probe
    //! response, probe timeouts, teardown safety, and the poll-loop
    //! invariant.

    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::time::MockClock;

    /// Probe that always reports the same reachability.
    struct FixedProbe {
        reachable: bool,
        calls: AtomicUsize,
    }

    impl FixedProbe {
        fn new(reachable: bool) -> Arc<Self> {
            Arc::new(Self { reachable, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl HealthProbe for FixedProbe {
        async fn check(&self, _url: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable
        }
    }

    /// Probe that hangs longer than any sane probe timeout.
    struct HangingProbe;

    #[async_trait]
    impl HealthProbe for HangingProbe {
        async fn check(&self, _url: &str) -> bool {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            true
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        toasts: Mutex<Vec<(Severity, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, severity: Severity, title: &str, _message: Option<&str>) {
            if let Ok(mut toasts) = self.toasts.lock() {
                toasts.push((severity, title.to_string()));
            }
        }
    }

    fn fast_config() -> HealthConfig {
        HealthConfig::builder("http://localhost:9/health")
            .poll_interval(Duration::from_millis(10))
            .probe_timeout(Duration::from_millis(50))
            .build()
            .unwrap()
    }

    async fn recv_within(rx: &mut StatusReceiver, millis: u64) -> Option<ServerStatus> {
        tokio::time::timeout(Duration::from_millis(millis), rx.recv()).await.ok().flatten()
    }

    #[test]
    fn test_config_defaults() {
        let config = HealthConfig::new("http://api/health");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_validation() {
        assert!(HealthConfig::new("").validate().is_err());
        assert!(HealthConfig::builder("http://api/health")
            .poll_interval(Duration::ZERO)
            .build()
            .is_err());
        assert!(HealthConfig::builder("http://api/health")
            .probe_timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(HealthConfig::new("http://api/health").validate().is_ok());
    }

    #[tokio::test]
    async fn test_monitor_starts_up() {
        let monitor =
            HealthMonitor::builder(fast_config()).probe(FixedProbe::new(false)).build().unwrap();

        assert!(!monitor.is_server_down());
        assert!(!monitor.is_polling());
        assert_eq!(monitor.metrics().transitions_to_down, 0);
    }

    #[tokio::test]
    async fn test_report_network_error_transitions_down() {
        let monitor =
            HealthMonitor::builder(fast_config()).probe(FixedProbe::new(false)).build().unwrap();
        let mut rx = monitor.subscribe();

        monitor.report_network_error();

        assert!(monitor.is_server_down());
        assert!(monitor.is_polling());
        assert_eq!(recv_within(&mut rx, 100).await, Some(ServerStatus { is_down: true }));

        monitor.shutdown();
    }

    #[tokio::test]
    async fn test_report_network_error_is_idempotent() {
        let monitor =
            HealthMonitor::builder(fast_config()).probe(FixedProbe::new(false)).build().unwrap();
        let mut rx = monitor.subscribe();

        monitor.report_network_error();
        monitor.report_network_error();
        monitor.report_network_error();

        // Exactly one event, one transition
        assert_eq!(recv_within(&mut rx, 100).await, Some(ServerStatus { is_down: true }));
        assert_eq!(rx.try_recv(), None);
        assert_eq!(monitor.metrics().transitions_to_down, 1);

        monitor.shutdown();
    }

    #[tokio::test]
    async fn test_recovery_on_reachable_probe() {
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = HealthMonitor::builder(fast_config())
            .probe(FixedProbe::new(true))
            .notifier(notifier.clone())
            .build()
            .unwrap();
        let mut rx = monitor.subscribe();

        monitor.report_network_error();

        assert_eq!(recv_within(&mut rx, 100).await, Some(ServerStatus { is_down: true }));
        assert_eq!(recv_within(&mut rx, 500).await, Some(ServerStatus { is_down: false }));

        assert!(!monitor.is_server_down());
        // Poll loop detached itself after recovery
        assert!(!monitor.is_polling());

        let toasts = notifier.toasts.lock().unwrap();
        assert_eq!(toasts.len(), 1, "exactly one success toast");
        assert_eq!(toasts[0].0, Severity::Success);
        assert_eq!(toasts[0].1, "Connection restored");
    }

    #[tokio::test]
    async fn test_failed_probes_keep_monitor_down() {
        let notifier = Arc::new(RecordingNotifier::default());
        let probe = FixedProbe::new(false);
        let monitor = HealthMonitor::builder(fast_config())
            .probe(probe.clone())
            .notifier(notifier.clone())
            .build()
            .unwrap();
        let mut rx = monitor.subscribe();

        monitor.report_network_error();
        assert_eq!(recv_within(&mut rx, 100).await, Some(ServerStatus { is_down: true }));

        // Let several probe rounds fail
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(monitor.is_server_down());
        assert!(monitor.is_polling());
        assert!(probe.calls.load(Ordering::SeqCst) >= 1, "probe loop is live");
        assert_eq!(rx.try_recv(), None, "no event on repeated failures");
        assert!(notifier.toasts.lock().unwrap().is_empty(), "no toast spam while down");

        monitor.shutdown();
    }

    #[tokio::test]
    async fn test_probe_timeout_counts_as_failure() {
        let monitor =
            HealthMonitor::builder(fast_config()).probe(Arc::new(HangingProbe)).build().unwrap();

        monitor.report_network_error();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(monitor.is_server_down());
        assert!(monitor.is_polling());

        monitor.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_is_repeat_safe() {
        let monitor =
            HealthMonitor::builder(fast_config()).probe(FixedProbe::new(false)).build().unwrap();

        // From UP state
        monitor.shutdown();

        monitor.report_network_error();
        assert!(monitor.is_polling());

        monitor.shutdown();
        monitor.shutdown();
        assert!(!monitor.is_polling());
    }

    #[tokio::test]
    async fn test_down_after_recovery_can_reopen() {
        let monitor =
            HealthMonitor::builder(fast_config()).probe(FixedProbe::new(true)).build().unwrap();
        let mut rx = monitor.subscribe();

        monitor.report_network_error();
        assert_eq!(recv_within(&mut rx, 100).await, Some(ServerStatus { is_down: true }));
        assert_eq!(recv_within(&mut rx, 500).await, Some(ServerStatus { is_down: false }));

        // A fresh outage after recovery opens the breaker again
        monitor.report_network_error();
        assert!(monitor.is_server_down());
        assert_eq!(recv_within(&mut rx, 100).await, Some(ServerStatus { is_down: true }));
        assert_eq!(monitor.metrics().transitions_to_down, 2);

        monitor.shutdown();
    }

    #[tokio::test]
    async fn test_metrics_with_mock_clock() {
        let clock = MockClock::new();
        let monitor = HealthMonitor::builder(fast_config())
            .probe(FixedProbe::new(false))
            .clock(clock.clone())
            .build()
            .unwrap();

        assert!(monitor.metrics().last_transition.is_none());

        let before = clock.now();
        clock.advance(Duration::from_secs(42));
        monitor.report_network_error();

        let metrics = monitor.metrics();
        let stamped = metrics.last_transition.unwrap();
        assert_eq!(stamped.duration_since(before), Duration::from_secs(42));

        monitor.shutdown();
    }
}
