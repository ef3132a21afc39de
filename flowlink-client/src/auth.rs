//! OAuth2 client credentials flow for gateway authentication
//!
//! Tokens are fetched lazily on the first request and cached until shortly
//! before they expire.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Audience requested for Camunda SaaS gateways
pub const DEFAULT_AUDIENCE: &str = "zeebe.camunda.io";

/// Token endpoint used when none is configured
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://login.cloud.camunda.io/oauth/token";

/// OAuth2 client credentials configuration
#[derive(Clone)]
pub struct OAuth2Credentials {
    /// OAuth2 client ID
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Token endpoint URL
    pub token_endpoint: String,
    /// Audience claim requested for the token
    pub audience: Option<String>,
}

impl OAuth2Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_endpoint: token_endpoint.into(),
            audience: None,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

impl std::fmt::Debug for OAuth2Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_endpoint", &self.token_endpoint)
            .field("audience", &self.audience)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenError {
    error: String,
    error_description: Option<String>,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<&'a str>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    obtained_at: Instant,
    expires_in: Option<u64>,
}

impl CachedToken {
    /// Expired 30 seconds ahead of the advertised lifetime
    fn is_expired(&self) -> bool {
        match self.expires_in {
            Some(expires_in) => {
                self.obtained_at.elapsed() + Duration::from_secs(30)
                    > Duration::from_secs(expires_in)
            }
            None => false,
        }
    }
}

/// Fetches and caches bearer tokens for one set of credentials
#[derive(Debug)]
pub struct TokenProvider {
    credentials: OAuth2Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(credentials: OAuth2Credentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid access token, fetching a new one when needed
    pub async fn access_token(&self, http: &Client) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.access_token.clone());
        }

        let token = self.fetch(http).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token so the next request fetches a fresh one
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn fetch(&self, http: &Client) -> Result<CachedToken> {
        let credentials = &self.credentials;
        let request_body = TokenRequest {
            grant_type: "client_credentials",
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
            audience: credentials.audience.as_deref(),
        };

        debug!(
            "Fetching OAuth2 token from {} for client {}",
            credentials.token_endpoint, credentials.client_id
        );

        let response = http
            .post(&credentials.token_endpoint)
            .form(&request_body)
            .send()
            .await
            .map_err(|e| ClientError::Authentication(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Authentication(format!("failed to read token body: {}", e)))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenError>(&body) {
                Ok(error) => error.to_string(),
                Err(_) => format!("status {}: {}", status, body),
            };
            warn!("OAuth2 token request failed: {}", message);
            return Err(ClientError::Authentication(message));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ClientError::Authentication(format!("invalid token response: {}", e)))?;

        debug!(
            "Obtained OAuth2 token (expires_in: {:?})",
            token.expires_in
        );

        Ok(CachedToken {
            access_token: token.access_token,
            obtained_at: Instant::now(),
            expires_in: token.expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let creds = OAuth2Credentials::new("client", "super-secret-value", DEFAULT_TOKEN_ENDPOINT)
            .with_audience(DEFAULT_AUDIENCE);
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("zeebe.camunda.io"));
        assert!(!debug_str.contains("super-secret-value"));
    }

    #[test]
    fn test_cached_token_expiry() {
        let fresh = CachedToken {
            access_token: "t".to_string(),
            obtained_at: Instant::now(),
            expires_in: Some(3600),
        };
        assert!(!fresh.is_expired());

        let short_lived = CachedToken {
            access_token: "t".to_string(),
            obtained_at: Instant::now(),
            expires_in: Some(10),
        };
        assert!(short_lived.is_expired());

        let unbounded = CachedToken {
            access_token: "t".to_string(),
            obtained_at: Instant::now(),
            expires_in: None,
        };
        assert!(!unbounded.is_expired());
    }

    #[test]
    fn test_token_error_display() {
        let error: TokenError = serde_json::from_str(
            r#"{"error":"invalid_client","error_description":"Client authentication failed"}"#,
        )
        .unwrap();
        assert_eq!(error.to_string(), "invalid_client: Client authentication failed");
    }
}
