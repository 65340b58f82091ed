//! API client.
//!
//! Thin typed surface over the interceptor → transport → classifier
//! pipeline. Two variants share one [`HealthMonitor`]: the authenticated
//! client injects the session bearer token and reacts to 401 by
//! invalidating the session; the public client skips auth but is still
//! breaker-gated and classified.

use std::sync::Arc;

use huddle_common::{HealthMonitor, NoopNotifier, Notifier};
use reqwest::{Client as ReqwestClient, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::classifier;
use crate::config::ClientConfig;
use crate::errors::ApiError;
use crate::interceptor::{self, RequestPayload};
use crate::session::SessionProvider;

/// HTTP client for the Huddle API with breaker protection and response
/// classification.
pub struct ApiClient {
    http: ReqwestClient,
    config: ClientConfig,
    health: Arc<HealthMonitor>,
    session: Option<Arc<dyn SessionProvider>>,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    /// Create the authenticated client variant.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the configuration is invalid or the
    /// transport cannot be constructed.
    pub fn new(
        config: ClientConfig,
        health: Arc<HealthMonitor>,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        Self::from_parts(config, health, Some(session), notifier)
    }

    /// Create the public (anonymous) client variant: no bearer
    /// injection, but the breaker gate and classifier still apply.
    pub fn public(
        config: ClientConfig,
        health: Arc<HealthMonitor>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        Self::from_parts(config, health, None, notifier)
    }

    /// Create a builder for fluent configuration.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    fn from_parts(
        config: ClientConfig,
        health: Arc<HealthMonitor>,
        session: Option<Arc<dyn SessionProvider>>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        config.validate()?;

        // Timeout is fixed at construction; the recovery probe uses its
        // own, shorter deadline inside the health monitor.
        let http = ReqwestClient::builder()
            .timeout(config.timeout)
            .no_proxy()
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config, health, session, notifier })
    }

    /// Current breaker position, for rendering an unreachable banner.
    pub fn is_server_down(&self) -> bool {
        self.health.is_server_down()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a GET request.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_json(Method::GET, path, RequestPayload::Empty).await
    }

    /// Execute a POST request with a JSON body.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Decode(format!("failed to serialize body: {e}")))?;
        self.execute_json(Method::POST, path, RequestPayload::Json(body)).await
    }

    /// Execute a PUT request with a JSON body.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Decode(format!("failed to serialize body: {e}")))?;
        self.execute_json(Method::PUT, path, RequestPayload::Json(body)).await
    }

    /// Execute a DELETE request.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_json(Method::DELETE, path, RequestPayload::Empty).await
    }

    /// Execute a POST request with a multipart form (file uploads).
    ///
    /// The transport owns the content type here; this layer must not set
    /// one, or the multipart boundary is lost.
    #[instrument(skip(self, form), fields(path = %path))]
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        self.execute_json(Method::POST, path, RequestPayload::Multipart(form)).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        payload: RequestPayload,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.config.base_url, path);

        let builder = self.http.request(method.clone(), &url);
        let builder =
            interceptor::before_request(&self.health, self.session.as_ref(), builder, payload)
                .await?;

        debug!(%method, %url, "sending request");
        let result = builder.send().await;

        classifier::after_response(
            result,
            &method,
            &url,
            self.config.timeout,
            &self.health,
            self.session.as_ref(),
            &self.notifier,
        )
        .await
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: RequestPayload,
    ) -> Result<T, ApiError> {
        let response = self.execute(method, path, payload).await?;
        let status = response.status();

        // 204/205 never carry a body; deserialize from JSON null so
        // callers expecting `()` or `Option<_>` still work.
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                ApiError::Decode(format!(
                    "no-content response ({}) cannot populate the expected type",
                    status.as_u16()
                ))
            });
        }

        response.json().await.map_err(|e| ApiError::Decode(format!("failed to parse response: {e}")))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("authenticated", &self.session.is_some())
            .finish()
    }
}

/// Builder for [`ApiClient`].
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    health: Option<Arc<HealthMonitor>>,
    session: Option<Arc<dyn SessionProvider>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ApiClientBuilder {
    /// Set the client configuration (defaults to [`ClientConfig::default`]).
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the shared health monitor (required).
    pub fn health(mut self, health: Arc<HealthMonitor>) -> Self {
        self.health = Some(health);
        self
    }

    /// Set the session provider; omit it for the public variant.
    pub fn session(mut self, session: Arc<dyn SessionProvider>) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the notifier (defaults to [`NoopNotifier`]).
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the health monitor is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        let health =
            self.health.ok_or_else(|| ApiError::Config("health monitor not set".to_string()))?;
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier));

        ApiClient::from_parts(config, health, self.session, notifier)
    }
}
