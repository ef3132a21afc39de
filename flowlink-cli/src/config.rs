//! CLI configuration

use anyhow::{Context, Result};
use flowlink_worker::BrokerConfig;
use flowlink_worker::config::parse_duration;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address of the broker gateway
    pub gateway_address: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn new(gateway_address: String, timeout: &str) -> Result<Self> {
        let request_timeout =
            parse_duration(timeout).with_context(|| format!("Invalid --timeout '{}'", timeout))?;
        Ok(Self {
            gateway_address,
            request_timeout,
        })
    }

    /// Broker settings from the environment, with the gateway taken from the CLI
    ///
    /// Cloud credentials in the environment still take precedence over the
    /// plaintext address.
    pub fn broker_config(&self) -> Result<BrokerConfig> {
        let mut config = BrokerConfig::from_env().context("Invalid FLOWLINK_* environment")?;
        config.gateway_address = Some(self.gateway_address.clone());
        config.default_request_timeout = self.request_timeout;
        config.lazy_connection = false;
        config.enabled = true;
        config.validate()?;
        Ok(config)
    }
}
