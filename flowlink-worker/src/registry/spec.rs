//! Static worker declarations

use std::collections::BTreeMap;

use crate::binder::ParameterSpec;
use crate::handler::{WorkerHandler, short_type_name};

/// Everything needed to register one worker
///
/// Durations are strings in the formats accepted by
/// [`parse_duration`](crate::config::parse_duration). Unset values fall back
/// to the registry defaults.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    /// Job type; empty or unset uses the handler owner
    pub job_type: Option<String>,
    pub documentation: Option<String>,
    pub timeout: Option<String>,
    pub request_timeout: Option<String>,
    pub max_jobs_active: Option<usize>,
    /// Poll interval in milliseconds
    pub poll_interval_ms: Option<u64>,
    pub fetch_variables: Vec<String>,
    /// Business error code to the error kinds that raise it
    pub error_codes: BTreeMap<String, Vec<String>>,
    /// Output variable name; unset uses `{owner}_{name}`
    pub output_variable: Option<String>,
    /// Name of the handler's output type
    pub output_type: Option<String>,
    /// Whether the handler may return no output
    pub output_optional: bool,
    pub auto_complete: Option<bool>,
    /// Component the handler belongs to
    pub handler_owner: String,
    pub handler_name: String,
    pub parameters: Vec<ParameterSpec>,
    pub handler: WorkerHandler,
}

impl WorkerSpec {
    pub fn new(
        handler_owner: impl Into<String>,
        handler_name: impl Into<String>,
        handler: WorkerHandler,
    ) -> Self {
        Self {
            job_type: None,
            documentation: None,
            timeout: None,
            request_timeout: None,
            max_jobs_active: None,
            poll_interval_ms: None,
            fetch_variables: Vec::new(),
            error_codes: BTreeMap::new(),
            output_variable: None,
            output_type: None,
            output_optional: false,
            auto_complete: None,
            handler_owner: handler_owner.into(),
            handler_name: handler_name.into(),
            parameters: Vec::new(),
            handler,
        }
    }

    pub fn job_type(mut self, job_type: impl Into<String>) -> Self {
        self.job_type = Some(job_type.into());
        self
    }

    pub fn documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn request_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.request_timeout = Some(timeout.into());
        self
    }

    pub fn max_jobs_active(mut self, max: usize) -> Self {
        self.max_jobs_active = Some(max);
        self
    }

    pub fn poll_interval_ms(mut self, millis: u64) -> Self {
        self.poll_interval_ms = Some(millis);
        self
    }

    pub fn fetch_variable(mut self, name: impl Into<String>) -> Self {
        self.fetch_variables.push(name.into());
        self
    }

    /// Map an error kind to a business error code
    pub fn error_code(mut self, code: impl Into<String>, kind: impl Into<String>) -> Self {
        self.error_codes
            .entry(code.into())
            .or_default()
            .push(kind.into());
        self
    }

    /// Map the error type `E` to a business error code
    pub fn error_type<E: ?Sized>(self, code: impl Into<String>) -> Self {
        self.error_code(code, short_type_name::<E>())
    }

    pub fn output_variable(mut self, name: impl Into<String>) -> Self {
        self.output_variable = Some(name.into());
        self
    }

    /// Describe the handler output for worker documentation
    pub fn output<T: ?Sized>(mut self, optional: bool) -> Self {
        self.output_type = Some(short_type_name::<T>().to_string());
        self.output_optional = optional;
        self
    }

    pub fn auto_complete(mut self, enabled: bool) -> Self {
        self.auto_complete = Some(enabled);
        self
    }

    pub fn parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Job type after applying the owner fallback
    pub fn resolved_job_type(&self) -> String {
        self.job_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.handler_owner.clone())
    }

    /// Output variable name after applying the `{owner}_{name}` fallback
    pub fn resolved_output_variable(&self) -> String {
        self.output_variable
            .as_deref()
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_{}", self.handler_owner, self.handler_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct InsufficientFunds;

    fn spec() -> WorkerSpec {
        WorkerSpec::new("billing", "charge", WorkerHandler::blocking(|_| Ok(())))
    }

    #[test]
    fn test_fallbacks() {
        let spec = spec();
        assert_eq!(spec.resolved_job_type(), "billing");
        assert_eq!(spec.resolved_output_variable(), "billing_charge");

        let spec = spec.job_type("  ").output_variable("");
        assert_eq!(spec.resolved_job_type(), "billing");
        assert_eq!(spec.resolved_output_variable(), "billing_charge");
    }

    #[test]
    fn test_error_codes_accumulate() {
        let spec = spec()
            .error_code("11", "Timeout")
            .error_type::<InsufficientFunds>("11")
            .error_code("12", "Fraud");

        assert_eq!(
            spec.error_codes.get("11"),
            Some(&vec!["Timeout".to_string(), "InsufficientFunds".to_string()])
        );
        assert_eq!(spec.error_codes.len(), 2);
    }
}
