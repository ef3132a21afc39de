//! Runtime worker configuration

use flowlink_client::JobWorkerOptions;
use std::collections::BTreeMap;
use std::time::Duration;

use super::WorkerSpec;
use crate::binder::{ParameterSpec, fetch_variables};
use crate::config::{BrokerConfig, parse_duration};
use crate::error::{Result, WorkerError};
use crate::handler::{HandlerError, WorkerHandler};

/// Defaults applied to values a [`WorkerSpec`] leaves unset
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerDefaults {
    pub worker_name: String,
    pub timeout: Duration,
    pub max_jobs_active: usize,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl WorkerDefaults {
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            worker_name: config.default_worker_name.clone(),
            timeout: config.default_job_timeout,
            poll_interval: config.default_job_poll_interval,
            ..Self::default()
        }
    }
}

impl Default for WorkerDefaults {
    fn default() -> Self {
        Self {
            worker_name: "default".to_string(),
            timeout: Duration::from_secs(300),
            max_jobs_active: 32,
            poll_interval: Duration::from_millis(100),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration of one registered worker
///
/// Identified by its job type. Only `enabled` changes after registration.
#[derive(Debug, Clone)]
pub struct WorkerConfiguration {
    pub job_type: String,
    pub enabled: bool,
    /// Worker name reported on activation
    pub worker_name: String,
    /// Lock duration of activated jobs
    pub timeout: Duration,
    pub max_jobs_active: usize,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub fetch_variables: Vec<String>,
    /// Business error code to the error kinds that raise it
    pub error_codes: BTreeMap<String, Vec<String>>,
    pub output_variable: String,
    pub auto_complete: bool,
    pub parameters: Vec<ParameterSpec>,
    pub handler: WorkerHandler,
}

impl WorkerConfiguration {
    /// Resolve a spec against the defaults
    ///
    /// Fails on malformed durations or a zero concurrency limit.
    pub fn from_spec(spec: &WorkerSpec, defaults: &WorkerDefaults) -> Result<Self> {
        let job_type = spec.resolved_job_type();

        let timeout = match spec.timeout.as_deref() {
            Some(value) => parse_duration(value)?,
            None => defaults.timeout,
        };
        let request_timeout = match spec.request_timeout.as_deref() {
            Some(value) => parse_duration(value)?,
            None => defaults.request_timeout,
        };
        let max_jobs_active = spec.max_jobs_active.unwrap_or(defaults.max_jobs_active);
        if max_jobs_active == 0 {
            return Err(WorkerError::Configuration(format!(
                "worker '{}': max_jobs_active must be greater than 0",
                job_type
            )));
        }
        let poll_interval = spec
            .poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);
        if poll_interval.is_zero() {
            return Err(WorkerError::Configuration(format!(
                "worker '{}': poll interval must be greater than 0",
                job_type
            )));
        }

        Ok(Self {
            enabled: true,
            worker_name: defaults.worker_name.clone(),
            timeout,
            max_jobs_active,
            poll_interval,
            request_timeout,
            fetch_variables: fetch_variables(&spec.fetch_variables, &spec.parameters),
            error_codes: spec.error_codes.clone(),
            output_variable: spec.resolved_output_variable(),
            auto_complete: spec.auto_complete.unwrap_or(true),
            parameters: spec.parameters.clone(),
            handler: spec.handler.clone(),
            job_type,
        })
    }

    /// Business error code configured for a failure, if any
    ///
    /// Codes are checked in ascending order and the first match wins.
    pub fn error_code_for(&self, error: &HandlerError) -> Option<&str> {
        let root = error.root_cause();
        self.error_codes
            .iter()
            .find(|(_, kinds)| kinds.iter().any(|kind| root.is_kind(kind)))
            .map(|(code, _)| code.as_str())
    }

    /// Subscription options for this worker
    pub fn job_worker_options(&self) -> JobWorkerOptions {
        JobWorkerOptions {
            job_type: self.job_type.clone(),
            worker_name: self.worker_name.clone(),
            timeout: self.timeout,
            max_jobs_active: self.max_jobs_active,
            poll_interval: self.poll_interval,
            request_timeout: self.request_timeout,
            fetch_variables: self.fetch_variables.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{Binding, TargetType};

    fn spec() -> WorkerSpec {
        WorkerSpec::new("billing", "charge", WorkerHandler::blocking(|_| Ok(())))
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfiguration::from_spec(&spec(), &WorkerDefaults::default()).unwrap();

        assert_eq!(config.job_type, "billing");
        assert!(config.enabled);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.max_jobs_active, 32);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.auto_complete);
        assert_eq!(config.output_variable, "billing_charge");
        assert!(config.fetch_variables.is_empty());
    }

    #[test]
    fn test_overrides_and_fetch_variables() {
        let spec = spec()
            .job_type("charge-card")
            .timeout("PT1M")
            .request_timeout("30s")
            .max_jobs_active(4)
            .poll_interval_ms(500)
            .fetch_variable("orderId")
            .auto_complete(false)
            .parameter(ParameterSpec::new(
                "amount",
                Binding::variable("amount"),
                TargetType::Integer,
            ));

        let config = WorkerConfiguration::from_spec(&spec, &WorkerDefaults::default()).unwrap();
        assert_eq!(config.job_type, "charge-card");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_jobs_active, 4);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert!(!config.auto_complete);
        assert_eq!(config.fetch_variables, vec!["orderId", "amount"]);

        let options = config.job_worker_options();
        assert_eq!(options.job_type, "charge-card");
        assert_eq!(options.max_jobs_active, 4);
        assert_eq!(options.fetch_variables, vec!["orderId", "amount"]);
    }

    #[test]
    fn test_malformed_values_are_configuration_errors() {
        let bad_timeout = spec().timeout("forever");
        let err = WorkerConfiguration::from_spec(&bad_timeout, &WorkerDefaults::default()).unwrap_err();
        assert!(err.is_configuration_error());

        let zero = spec().max_jobs_active(0);
        let err = WorkerConfiguration::from_spec(&zero, &WorkerDefaults::default()).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_error_code_lookup() {
        let spec = spec()
            .error_code("11", "InsufficientFunds")
            .error_code("12", "Fraud");
        let config = WorkerConfiguration::from_spec(&spec, &WorkerDefaults::default()).unwrap();

        let wrapped = HandlerError::raised("billing::InsufficientFunds", "low balance").wrap();
        assert_eq!(config.error_code_for(&wrapped), Some("11"));
        assert_eq!(config.error_code_for(&HandlerError::of_kind("Fraud")), Some("12"));
        assert_eq!(config.error_code_for(&HandlerError::of_kind("Timeout")), None);
    }
}
