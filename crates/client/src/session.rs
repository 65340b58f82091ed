//! Session boundary.
//!
//! Token storage itself lives outside this layer (keychain, cookie jar,
//! whatever the host app uses); the client only needs the three
//! operations below. The trait mirrors how the interceptor and
//! classifier consume a session: read the token, check whether one was
//! active, and drop it on 401.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for supplying and clearing the bearer credential.
///
/// Allows dependency injection and testing with mock providers.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current bearer token, if a session is active.
    async fn access_token(&self) -> Option<String>;

    /// Whether a session is currently active.
    async fn is_authenticated(&self) -> bool;

    /// Drop the current session, if any. Must be idempotent.
    async fn invalidate(&self);
}

/// Simple in-process session holder.
#[derive(Debug, Default)]
pub struct InMemorySession {
    token: RwLock<Option<String>>,
}

impl InMemorySession {
    /// Create an anonymous (token-less) session holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session holder that starts authenticated.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: RwLock::new(Some(token.into())) }
    }

    /// Install or replace the bearer token.
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }
}

#[async_trait]
impl SessionProvider for InMemorySession {
    async fn access_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    async fn invalidate(&self) {
        let had_token = self.token.write().await.take().is_some();
        if had_token {
            debug!("session invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_anonymous() {
        let session = InMemorySession::new();
        assert!(!session.is_authenticated().await);
        assert_eq!(session.access_token().await, None);
    }

    #[tokio::test]
    async fn test_with_token() {
        let session = InMemorySession::with_token("tok-1");
        assert!(session.is_authenticated().await);
        assert_eq!(session.access_token().await, Some("tok-1".to_string()));
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let session = InMemorySession::with_token("tok-1");

        session.invalidate().await;
        assert!(!session.is_authenticated().await);

        // Second call is a no-op
        session.invalidate().await;
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_set_token_restores_session() {
        let session = InMemorySession::new();
        session.set_token("tok-2").await;
        assert!(session.is_authenticated().await);
        assert_eq!(session.access_token().await, Some("tok-2".to_string()));
    }
}
