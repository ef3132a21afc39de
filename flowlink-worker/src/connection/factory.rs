//! Broker client construction

use flowlink_client::auth::{DEFAULT_AUDIENCE, DEFAULT_TOKEN_ENDPOINT};
use flowlink_client::{BrokerClient, GatewayClient, OAuth2Credentials};
use std::sync::Arc;
use tracing::debug;

use crate::config::BrokerConfig;
use crate::error::Result;

/// Builds broker clients for the connection supervisor
pub trait ClientFactory: Send + Sync {
    fn create(&self, config: &BrokerConfig) -> Result<Arc<dyn BrokerClient>>;
}

/// Builds [`GatewayClient`]s, with OAuth2 when cloud credentials are set
#[derive(Debug, Default, Clone, Copy)]
pub struct GatewayClientFactory;

impl ClientFactory for GatewayClientFactory {
    fn create(&self, config: &BrokerConfig) -> Result<Arc<dyn BrokerClient>> {
        let url = config.gateway_url();
        debug!("Building gateway client for {}", url);

        let mut builder = GatewayClient::builder(url).request_timeout(config.default_request_timeout);
        if let Some(keep_alive) = config.keep_alive {
            builder = builder.keep_alive(keep_alive);
        }
        if let Some(path) = &config.ca_certificate_path {
            builder = builder.ca_certificate_path(path);
        }
        if let Some(cloud) = config.cloud_credentials() {
            let endpoint = config
                .authorization_server_url
                .as_deref()
                .unwrap_or(DEFAULT_TOKEN_ENDPOINT);
            builder = builder.credentials(
                OAuth2Credentials::new(cloud.client_id, cloud.client_secret, endpoint)
                    .with_audience(DEFAULT_AUDIENCE),
            );
        }

        Ok(Arc::new(builder.build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_builds_plaintext_and_cloud_clients() {
        let factory = GatewayClientFactory;
        assert!(factory.create(&BrokerConfig::default()).is_ok());

        let mut cloud = BrokerConfig::default();
        cloud.cluster_id = Some("c-1".to_string());
        cloud.client_id = Some("id".to_string());
        cloud.client_secret = Some("secret".to_string());
        assert!(factory.create(&cloud).is_ok());
    }

    #[test]
    fn test_missing_ca_certificate_fails() {
        let mut config = BrokerConfig::default();
        config.ca_certificate_path = Some(PathBuf::from("/nonexistent/flowlink-ca.pem"));
        assert!(GatewayClientFactory.create(&config).is_err());
    }
}
