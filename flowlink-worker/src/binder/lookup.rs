//! Binders for direct variable and header lookups

use flowlink_core::domain::job::ActivatedJob;
use serde_json::Value;

use super::{Binder, Binding, BindingResult, ParameterSpec};

/// Resolves a top-level variable
#[derive(Debug, Default, Clone, Copy)]
pub struct VariableBinder;

impl Binder for VariableBinder {
    fn bind(&self, job: &ActivatedJob, parameter: &ParameterSpec) -> BindingResult {
        let name = match &parameter.binding {
            Binding::Variable { name: Some(name) } => name.as_str(),
            _ => parameter.name.as_str(),
        };

        match job.variable(name) {
            Some(value) => BindingResult::from_conversion(parameter.target.convert(value)),
            None => BindingResult::Empty,
        }
    }
}

/// Resolves a custom header
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderBinder;

impl Binder for HeaderBinder {
    fn bind(&self, job: &ActivatedJob, parameter: &ParameterSpec) -> BindingResult {
        let name = match &parameter.binding {
            Binding::Header { name: Some(name) } => name.as_str(),
            _ => parameter.name.as_str(),
        };

        match job.header(name) {
            Some(value) => {
                BindingResult::from_conversion(parameter.target.convert(&Value::from(value)))
            }
            None => BindingResult::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::TargetType;
    use crate::testing::sample_job;
    use serde_json::json;

    #[test]
    fn test_variable_by_explicit_name_or_parameter_name() {
        let job = sample_job(json!({"order_id": "A-1", "count": 2}));

        let explicit = ParameterSpec::new("id", Binding::variable("order_id"), TargetType::String);
        assert_eq!(
            VariableBinder.bind(&job, &explicit),
            BindingResult::Present(json!("A-1"))
        );

        let implicit = ParameterSpec::new(
            "count",
            Binding::Variable { name: None },
            TargetType::Integer,
        );
        assert_eq!(
            VariableBinder.bind(&job, &implicit),
            BindingResult::Present(json!(2))
        );

        let missing = ParameterSpec::new("total", Binding::variable("total"), TargetType::Any);
        assert_eq!(VariableBinder.bind(&job, &missing), BindingResult::Empty);
    }

    #[test]
    fn test_header_lookup() {
        let job = sample_job(json!({}));

        let present = ParameterSpec::new("channel", Binding::Header { name: None }, TargetType::String);
        assert_eq!(
            HeaderBinder.bind(&job, &present),
            BindingResult::Present(json!("web"))
        );

        let absent = ParameterSpec::new("x", Binding::header("priority"), TargetType::String);
        assert_eq!(HeaderBinder.bind(&job, &absent), BindingResult::Empty);
    }
}
