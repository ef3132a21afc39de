//! Flowlink broker client
//!
//! A typed client for the workflow broker gateway REST API, plus the
//! [`BrokerClient`] abstraction the worker runtime is written against.
//!
//! # Example
//!
//! ```no_run
//! use flowlink_client::GatewayClient;
//! use flowlink_core::dto::instance::CreateInstance;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GatewayClient::builder("http://localhost:8080").build()?;
//!
//!     let instance = client
//!         .create_instance(CreateInstance::latest("order-process"))
//!         .await?;
//!
//!     println!("Started instance {}", instance.process_instance_key);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod broker;
mod cluster;
mod deployments;
pub mod error;
mod instances;
mod jobs;
mod wire;
pub mod worker;

// Re-export commonly used types
pub use auth::OAuth2Credentials;
pub use broker::{BrokerClient, JobHandler, JobSubscription};
pub use error::{ClientError, Result};
pub use worker::{JobWorker, JobWorkerOptions};

use auth::TokenProvider;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// HTTP client for the broker gateway
///
/// Cloning is cheap and clones share the connection pool, the token cache
/// and the closed flag.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    /// Base URL of the gateway (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Bearer token source, if the gateway requires authentication
    tokens: Option<Arc<TokenProvider>>,
    /// Set once `close` has been called
    closed: Arc<AtomicBool>,
}

/// Builder for [`GatewayClient`]
#[derive(Debug, Clone)]
pub struct GatewayClientBuilder {
    address: String,
    request_timeout: Option<Duration>,
    keep_alive: Option<Duration>,
    ca_certificate_path: Option<PathBuf>,
    credentials: Option<OAuth2Credentials>,
}

impl GatewayClientBuilder {
    /// Default timeout applied to every request
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = Some(interval);
        self
    }

    /// Trust an additional PEM encoded root certificate
    pub fn ca_certificate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_certificate_path = Some(path.into());
        self
    }

    /// Authenticate with OAuth2 client credentials
    pub fn credentials(mut self, credentials: OAuth2Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> Result<GatewayClient> {
        let mut builder = Client::builder();

        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(interval) = self.keep_alive {
            builder = builder.tcp_keepalive(interval);
        }
        if let Some(path) = &self.ca_certificate_path {
            let pem = std::fs::read(path).map_err(|e| {
                ClientError::InvalidRequest(format!(
                    "cannot read CA certificate {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem)?;
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder.build()?;
        Ok(GatewayClient {
            base_url: self.address.trim_end_matches('/').to_string(),
            client,
            tokens: self.credentials.map(|c| Arc::new(TokenProvider::new(c))),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl GatewayClient {
    /// Create a client with default settings
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the gateway (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            tokens: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start configuring a client for the gateway at `address`
    pub fn builder(address: impl Into<String>) -> GatewayClientBuilder {
        GatewayClientBuilder {
            address: address.into(),
            request_timeout: None,
            keep_alive: None,
            ca_certificate_path: None,
            credentials: None,
        }
    }

    /// Get the base URL of the gateway
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the client closed. In-flight requests are not interrupted.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Closed gateway client for {}", self.base_url);
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =============================================================================
    // Request Dispatch
    // =============================================================================

    /// Attach credentials and send a request
    ///
    /// A 401 response drops the cached token so the next call re-authenticates.
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        if self.is_closed() {
            return Err(ClientError::Unavailable("client is closed".to_string()));
        }

        let request = match &self.tokens {
            Some(tokens) => request.bearer_auth(tokens.access_token(&self.client).await?),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ClientError::Unavailable(e.to_string())
            } else {
                ClientError::RequestFailed(e)
            }
        })?;

        if response.status() == StatusCode::UNAUTHORIZED
            && let Some(tokens) = &self.tokens
        {
            tokens.invalidate().await;
        }

        Ok(response)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = GatewayClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/v2/topology"), "http://localhost:8080/v2/topology");
    }

    #[test]
    fn test_builder_rejects_missing_certificate() {
        let result = GatewayClient::builder("https://gateway")
            .ca_certificate_path("/nonexistent/ca.pem")
            .build();
        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_closed_client_is_unavailable() {
        let client = GatewayClient::new("http://localhost:8080");
        let clone = client.clone();
        client.close();

        assert!(clone.is_closed());
        let result = clone.topology().await;
        assert!(matches!(result, Err(ClientError::Unavailable(_))));
    }
}
