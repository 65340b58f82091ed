//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use huddle_client::{ApiClient, ClientConfig, InMemorySession, SessionProvider};
use huddle_common::{HealthConfig, HealthMonitor, HealthProbe, Notifier, Severity};

/// Initialize tracing for test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").with_test_writer().try_init();
}

/// Notifier that records every toast for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<(Severity, String, Option<String>)>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<(Severity, String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, title: &str, message: Option<&str>) {
        self.calls.lock().unwrap().push((
            severity,
            title.to_string(),
            message.map(str::to_string),
        ));
    }
}

/// Probe that never reports the backend as reachable; keeps a forced-down
/// monitor down for the duration of a test.
pub struct NeverUpProbe;

#[async_trait]
impl HealthProbe for NeverUpProbe {
    async fn check(&self, _url: &str) -> bool {
        false
    }
}

/// Health monitor wired to a dead probe with a fast poll cadence.
pub fn dead_end_monitor() -> Arc<HealthMonitor> {
    let config = HealthConfig::builder("http://localhost:9/health")
        .poll_interval(Duration::from_millis(10))
        .probe_timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    Arc::new(HealthMonitor::builder(config).probe(Arc::new(NeverUpProbe)).build().unwrap())
}

/// Health monitor that probes a real URL over HTTP with a fast cadence.
pub fn http_monitor(health_url: &str) -> Arc<HealthMonitor> {
    let config = HealthConfig::builder(health_url)
        .poll_interval(Duration::from_millis(25))
        .probe_timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    Arc::new(HealthMonitor::new(config).unwrap())
}

/// Authenticated client against `base_url` with a recording notifier.
pub fn authed_client(
    base_url: &str,
    health: Arc<HealthMonitor>,
    token: &str,
) -> (ApiClient, Arc<RecordingNotifier>, Arc<InMemorySession>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let session = Arc::new(InMemorySession::with_token(token));
    let client = ApiClient::builder()
        .config(ClientConfig::new(base_url))
        .health(health)
        .session(session.clone() as Arc<dyn SessionProvider>)
        .notifier(notifier.clone() as Arc<dyn Notifier>)
        .build()
        .unwrap();
    (client, notifier, session)
}

/// Public (anonymous) client against `base_url` with a recording notifier.
pub fn public_client(
    base_url: &str,
    health: Arc<HealthMonitor>,
) -> (ApiClient, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let client = ApiClient::builder()
        .config(ClientConfig::new(base_url))
        .health(health)
        .notifier(notifier.clone() as Arc<dyn Notifier>)
        .build()
        .unwrap();
    (client, notifier)
}
