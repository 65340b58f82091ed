//! Server-status broadcast channel.
//!
//! The health monitor emits one [`ServerStatus`] per actual UP/DOWN
//! transition. Any number of listeners (UI banners, loggers, tests) can
//! subscribe; emitting with zero subscribers is fine.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 16;

/// Payload broadcast on every breaker transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// `true` when the breaker is open (backend unreachable).
    pub is_down: bool,
}

/// Fan-out channel for server status changes.
///
/// Cloning the channel shares the underlying sender; every clone emits to
/// the same set of subscribers.
#[derive(Debug, Clone)]
pub struct StatusChannel {
    tx: broadcast::Sender<ServerStatus>,
}

impl StatusChannel {
    /// Create a channel that retains up to `capacity` pending updates per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a new listener.
    pub fn subscribe(&self) -> StatusReceiver {
        StatusReceiver { rx: self.tx.subscribe() }
    }

    /// Broadcast a status change to all current subscribers.
    pub fn emit(&self, status: ServerStatus) {
        // send() errs only when there are no subscribers; that is not a
        // failure for a broadcast of this kind.
        let delivered = self.tx.send(status).unwrap_or(0);
        debug!(is_down = status.is_down, delivered, "server status change emitted");
    }

    /// Number of currently registered listeners.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Listener side of a [`StatusChannel`].
#[derive(Debug)]
pub struct StatusReceiver {
    rx: broadcast::Receiver<ServerStatus>,
}

impl StatusReceiver {
    /// Wait for the next status change.
    ///
    /// Returns `None` once the channel is closed (all senders dropped).
    pub async fn recv(&mut self) -> Option<ServerStatus> {
        loop {
            match self.rx.recv().await {
                Ok(status) => return Some(status),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "status receiver lagged; missed updates dropped");
                }
            }
        }
    }

    /// Non-blocking read of a pending status change, if any.
    pub fn try_recv(&mut self) -> Option<ServerStatus> {
        loop {
            match self.rx.try_recv() {
                Ok(status) => return Some(status),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
