//! Broker connection configuration
//!
//! Defines the connection surface used by the connection supervisor and the
//! defaults applied to registered workers and commands.

use std::path::PathBuf;
use std::time::Duration;

use crate::command::CommandKind;
use crate::error::{Result, WorkerError};

/// Gateway used when no address or cloud credentials are configured
pub const DEFAULT_GATEWAY_ADDRESS: &str = "http://localhost:8080";

/// Region used for cloud clusters when none is configured
pub const DEFAULT_REGION: &str = "bru-2";

/// Broker connection configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Whether the broker integration is active at all
    pub enabled: bool,

    /// Defer connecting until the connection is switched on explicitly
    pub lazy_connection: bool,

    /// Plaintext gateway address (e.g., "http://localhost:8080")
    pub gateway_address: Option<String>,

    /// Cloud cluster id
    pub cluster_id: Option<String>,

    /// Cloud OAuth2 client id
    pub client_id: Option<String>,

    /// Cloud OAuth2 client secret
    pub client_secret: Option<String>,

    /// Cloud region
    pub region: Option<String>,

    /// OAuth2 token endpoint for cloud credentials
    pub authorization_server_url: Option<String>,

    /// Timeout applied to broker requests
    pub default_request_timeout: Duration,

    /// Poll interval of workers that do not set one
    pub default_job_poll_interval: Duration,

    /// Activation timeout of workers that do not set one
    pub default_job_timeout: Duration,

    /// Time-to-live of published messages that do not set one
    pub default_message_ttl: Duration,

    /// Worker name reported on job activation
    pub default_worker_name: String,

    /// Size of the shared handler execution pool
    pub execution_threads: usize,

    pub keep_alive: Option<Duration>,

    /// Additional PEM root certificate for the gateway
    pub ca_certificate_path: Option<PathBuf>,

    /// Delay between health probes
    pub health_check_interval: Duration,

    /// Commands that may not be issued
    pub command_exclude: Vec<CommandKind>,
}

/// Cloud credentials, present only when every part is configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudCredentials<'a> {
    pub cluster_id: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub region: &'a str,
}

impl BrokerConfig {
    /// Creates a configuration with defaults for the given worker name
    pub fn new(default_worker_name: String) -> Self {
        Self {
            enabled: true,
            lazy_connection: false,
            gateway_address: None,
            cluster_id: None,
            client_id: None,
            client_secret: None,
            region: None,
            authorization_server_url: None,
            default_request_timeout: Duration::from_secs(20),
            default_job_poll_interval: Duration::from_millis(100),
            default_job_timeout: Duration::from_secs(300), // 5 minutes
            default_message_ttl: Duration::from_secs(3600),
            default_worker_name,
            execution_threads: 8,
            keep_alive: None,
            ca_certificate_path: None,
            health_check_interval: Duration::from_secs(5),
            command_exclude: Vec::new(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - FLOWLINK_ENABLED (default: true)
    /// - FLOWLINK_LAZY_CONNECTION (default: false)
    /// - FLOWLINK_GATEWAY_ADDRESS
    /// - FLOWLINK_CLUSTER_ID, FLOWLINK_CLIENT_ID, FLOWLINK_CLIENT_SECRET, FLOWLINK_REGION
    /// - FLOWLINK_AUTHORIZATION_SERVER_URL
    /// - FLOWLINK_DEFAULT_REQUEST_TIMEOUT (duration, default: 20s)
    /// - FLOWLINK_DEFAULT_JOB_POLL_INTERVAL (milliseconds, default: 100)
    /// - FLOWLINK_DEFAULT_JOB_TIMEOUT (duration, default: 5m)
    /// - FLOWLINK_DEFAULT_MESSAGE_TTL (duration, default: 1h)
    /// - FLOWLINK_DEFAULT_WORKER_NAME (default: FLOWLINK_APPLICATION_NAME, then a random UUID)
    /// - FLOWLINK_EXECUTION_THREADS (default: 8)
    /// - FLOWLINK_KEEP_ALIVE (duration)
    /// - FLOWLINK_CA_CERTIFICATE_PATH
    /// - FLOWLINK_HEALTH_CHECK_INTERVAL (duration, default: 5s)
    /// - FLOWLINK_COMMAND_EXCLUDE (comma-separated command names)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let worker_name = var("FLOWLINK_DEFAULT_WORKER_NAME")
            .or_else(|| var("FLOWLINK_APPLICATION_NAME"))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut config = Self::new(worker_name);

        if let Some(v) = var("FLOWLINK_ENABLED") {
            config.enabled = parse_bool("FLOWLINK_ENABLED", &v)?;
        }
        if let Some(v) = var("FLOWLINK_LAZY_CONNECTION") {
            config.lazy_connection = parse_bool("FLOWLINK_LAZY_CONNECTION", &v)?;
        }

        config.gateway_address = var("FLOWLINK_GATEWAY_ADDRESS");
        config.cluster_id = var("FLOWLINK_CLUSTER_ID");
        config.client_id = var("FLOWLINK_CLIENT_ID");
        config.client_secret = var("FLOWLINK_CLIENT_SECRET");
        config.region = var("FLOWLINK_REGION");
        config.authorization_server_url = var("FLOWLINK_AUTHORIZATION_SERVER_URL");

        if let Some(v) = var("FLOWLINK_DEFAULT_REQUEST_TIMEOUT") {
            config.default_request_timeout = parse_duration(&v)?;
        }
        if let Some(v) = var("FLOWLINK_DEFAULT_JOB_POLL_INTERVAL") {
            let millis = v.trim().parse::<u64>().map_err(|_| {
                WorkerError::Configuration(format!(
                    "FLOWLINK_DEFAULT_JOB_POLL_INTERVAL must be milliseconds, got '{}'",
                    v
                ))
            })?;
            config.default_job_poll_interval = Duration::from_millis(millis);
        }
        if let Some(v) = var("FLOWLINK_DEFAULT_JOB_TIMEOUT") {
            config.default_job_timeout = parse_duration(&v)?;
        }
        if let Some(v) = var("FLOWLINK_DEFAULT_MESSAGE_TTL") {
            config.default_message_ttl = parse_duration(&v)?;
        }
        if let Some(v) = var("FLOWLINK_EXECUTION_THREADS") {
            config.execution_threads = v.trim().parse::<usize>().map_err(|_| {
                WorkerError::Configuration(format!(
                    "FLOWLINK_EXECUTION_THREADS must be a number, got '{}'",
                    v
                ))
            })?;
        }
        if let Some(v) = var("FLOWLINK_KEEP_ALIVE") {
            config.keep_alive = Some(parse_duration(&v)?);
        }
        config.ca_certificate_path = var("FLOWLINK_CA_CERTIFICATE_PATH").map(PathBuf::from);
        if let Some(v) = var("FLOWLINK_HEALTH_CHECK_INTERVAL") {
            config.health_check_interval = parse_duration(&v)?;
        }
        if let Some(v) = var("FLOWLINK_COMMAND_EXCLUDE") {
            config.command_exclude = v
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::parse)
                .collect::<Result<Vec<CommandKind>>>()?;
        }

        Ok(config)
    }

    /// Returns cloud credentials when cluster id, client id and secret are all set
    pub fn cloud_credentials(&self) -> Option<CloudCredentials<'_>> {
        Some(CloudCredentials {
            cluster_id: self.cluster_id.as_deref()?,
            client_id: self.client_id.as_deref()?,
            client_secret: self.client_secret.as_deref()?,
            region: self.region.as_deref().unwrap_or(DEFAULT_REGION),
        })
    }

    /// Resolves the gateway URL from cloud settings or the plaintext address
    pub fn gateway_url(&self) -> String {
        match self.cloud_credentials() {
            Some(cloud) => format!(
                "https://{}.{}.zeebe.camunda.io",
                cloud.cluster_id, cloud.region
            ),
            None => self
                .gateway_address
                .clone()
                .unwrap_or_else(|| DEFAULT_GATEWAY_ADDRESS.to_string()),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.gateway_url();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(WorkerError::Configuration(format!(
                "gateway address must start with http:// or https://, got '{}'",
                url
            )));
        }

        if self.default_worker_name.is_empty() {
            return Err(WorkerError::Configuration(
                "default_worker_name cannot be empty".to_string(),
            ));
        }

        if self.execution_threads == 0 {
            return Err(WorkerError::Configuration(
                "execution_threads must be greater than 0".to_string(),
            ));
        }

        if self.default_job_poll_interval.is_zero() {
            return Err(WorkerError::Configuration(
                "default_job_poll_interval must be greater than 0".to_string(),
            ));
        }

        if self.health_check_interval.is_zero() {
            return Err(WorkerError::Configuration(
                "health_check_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(WorkerError::Configuration(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}

// =============================================================================
// Duration Parsing
// =============================================================================

/// Parse a duration in ISO-8601 (`PT5M`, `PT0.1S`, `P1DT2H`) or short form (`100ms`, `5s`, `5m`, `1h`, `2d`)
pub fn parse_duration(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    let parsed = if trimmed.starts_with(['P', 'p']) {
        parse_iso8601(trimmed)
    } else {
        parse_short(trimmed)
    };
    parsed.ok_or_else(|| WorkerError::InvalidDuration(input.to_string()))
}

fn parse_short(input: &str) -> Option<Duration> {
    let split = input.find(|c: char| !c.is_ascii_digit())?;
    let (number, unit) = input.split_at(split);
    let value: u64 = number.parse().ok()?;

    match unit.trim() {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(value.checked_mul(3600)?)),
        "d" => Some(Duration::from_secs(value.checked_mul(86_400)?)),
        _ => None,
    }
}

fn parse_iso8601(input: &str) -> Option<Duration> {
    let rest = &input[1..];
    let (date, time) = match rest.find(['T', 't']) {
        Some(i) => (&rest[..i], Some(&rest[i + 1..])),
        None => (rest, None),
    };

    if date.is_empty() && time.is_none_or(str::is_empty) {
        return None;
    }

    let mut total = Duration::ZERO;
    for (number, unit) in components(date)? {
        match unit {
            'D' => total += Duration::from_secs(number.parse::<u64>().ok()?.checked_mul(86_400)?),
            _ => return None,
        }
    }

    if let Some(time) = time {
        if time.is_empty() {
            return None;
        }
        for (number, unit) in components(time)? {
            match unit {
                'H' => total += Duration::from_secs(number.parse::<u64>().ok()?.checked_mul(3600)?),
                'M' => total += Duration::from_secs(number.parse::<u64>().ok()?.checked_mul(60)?),
                'S' => total += parse_seconds(number)?,
                _ => return None,
            }
        }
    }

    Some(total)
}

/// Split `1H30M` into `[("1", 'H'), ("30", 'M')]`
fn components(input: &str) -> Option<Vec<(&str, char)>> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, c) in input.char_indices() {
        if c.is_ascii_digit() || c == '.' {
            continue;
        }
        if i == start {
            return None;
        }
        parts.push((&input[start..i], c.to_ascii_uppercase()));
        start = i + c.len_utf8();
    }
    if start != input.len() {
        return None;
    }
    Some(parts)
}

fn parse_seconds(number: &str) -> Option<Duration> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if fraction.len() > 9 || (whole.is_empty() && fraction.is_empty()) {
        return None;
    }
    let secs = if whole.is_empty() { 0 } else { whole.parse::<u64>().ok()? };
    let nanos = if fraction.is_empty() {
        0
    } else {
        let digits: u32 = fraction.parse().ok()?;
        digits * 10u32.pow(9 - fraction.len() as u32)
    };
    Some(Duration::new(secs, nanos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert!(config.enabled);
        assert!(!config.lazy_connection);
        assert_eq!(config.default_job_poll_interval, Duration::from_millis(100));
        assert_eq!(config.default_job_timeout, Duration::from_secs(300));
        assert_eq!(config.execution_threads, 8);
        assert_eq!(config.health_check_interval, Duration::from_secs(5));
        assert_eq!(config.gateway_url(), DEFAULT_GATEWAY_ADDRESS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_iso8601_durations() {
        assert_eq!(parse_duration("PT5M").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("PT0.1S").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("PT10S").unwrap(), Duration::from_secs(10));
        assert_eq!(
            parse_duration("P1DT2H").unwrap(),
            Duration::from_secs(86_400 + 7_200)
        );
        assert_eq!(parse_duration("pt1h30m").unwrap(), Duration::from_secs(5_400));
    }

    #[test]
    fn test_short_durations() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_malformed_durations() {
        for input in ["", "P", "PT", "5", "5x", "PTS", "PT1.2.3S", "P1H", "soon"] {
            let result = parse_duration(input);
            assert!(
                matches!(result, Err(WorkerError::InvalidDuration(_))),
                "expected '{}' to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_cloud_credentials_require_all_parts() {
        let mut config = BrokerConfig::default();
        config.cluster_id = Some("abc".to_string());
        config.client_id = Some("id".to_string());
        assert!(config.cloud_credentials().is_none());
        assert_eq!(config.gateway_url(), DEFAULT_GATEWAY_ADDRESS);

        config.client_secret = Some("secret".to_string());
        let cloud = config.cloud_credentials().unwrap();
        assert_eq!(cloud.region, DEFAULT_REGION);
        assert_eq!(config.gateway_url(), "https://abc.bru-2.zeebe.camunda.io");
    }

    #[test]
    fn test_from_lookup() {
        let config = BrokerConfig::from_lookup(lookup(&[
            ("FLOWLINK_GATEWAY_ADDRESS", "http://broker:8080"),
            ("FLOWLINK_LAZY_CONNECTION", "true"),
            ("FLOWLINK_DEFAULT_JOB_POLL_INTERVAL", "250"),
            ("FLOWLINK_DEFAULT_MESSAGE_TTL", "PT30S"),
            ("FLOWLINK_APPLICATION_NAME", "billing"),
            ("FLOWLINK_COMMAND_EXCLUDE", "deploy, cancel-instance"),
        ]))
        .unwrap();

        assert_eq!(config.gateway_url(), "http://broker:8080");
        assert!(config.lazy_connection);
        assert_eq!(config.default_job_poll_interval, Duration::from_millis(250));
        assert_eq!(config.default_message_ttl, Duration::from_secs(30));
        assert_eq!(config.default_worker_name, "billing");
        assert_eq!(
            config.command_exclude,
            vec![CommandKind::Deploy, CommandKind::CancelInstance]
        );
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let result = BrokerConfig::from_lookup(lookup(&[("FLOWLINK_DEFAULT_JOB_TIMEOUT", "later")]));
        assert!(matches!(result, Err(WorkerError::InvalidDuration(_))));

        let result = BrokerConfig::from_lookup(lookup(&[("FLOWLINK_COMMAND_EXCLUDE", "explode")]));
        assert!(matches!(result, Err(WorkerError::Configuration(_))));
    }

    #[test]
    fn test_config_validation() {
        let mut config = BrokerConfig::default();
        assert!(config.validate().is_ok());

        config.gateway_address = Some("broker:26500".to_string());
        assert!(config.validate().is_err());

        config.gateway_address = None;
        config.execution_threads = 0;
        assert!(config.validate().is_err());
    }
}
