//! Worker documentation

use serde::{Deserialize, Serialize};

use super::{WorkerConfiguration, WorkerSpec};
use crate::binder::{Binding, TargetType};

/// Public description of a registered worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSpecification {
    pub type_name: String,
    pub documentation: String,
    pub headers: Vec<HeaderSpecification>,
    pub variables: Vec<VariableSpecification>,
    pub errors: Vec<ErrorSpecification>,
    pub output: VariableSpecification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderSpecification {
    pub header_name: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSpecification {
    pub variable_name: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSpecification {
    pub code: String,
    pub cause_errors: Vec<String>,
}

impl WorkerSpecification {
    pub fn describe(spec: &WorkerSpec, configuration: &WorkerConfiguration) -> Self {
        let documentation = spec
            .documentation
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| spec.handler_owner.clone());

        let mut headers = Vec::new();
        let mut variables = Vec::new();
        for parameter in &spec.parameters {
            match &parameter.binding {
                Binding::Header { name } => headers.push(HeaderSpecification {
                    header_name: name.clone().unwrap_or_else(|| parameter.name.clone()),
                    required: !parameter.nullable,
                }),
                Binding::Variable { name } => variables.push(VariableSpecification {
                    variable_name: name.clone().unwrap_or_else(|| parameter.name.clone()),
                    required: !parameter.nullable,
                    type_name: target_name(parameter.target).to_string(),
                }),
                Binding::Mapper { path, .. } => variables.push(VariableSpecification {
                    variable_name: path.clone().unwrap_or_else(|| parameter.name.clone()),
                    required: !parameter.nullable,
                    type_name: target_name(parameter.target).to_string(),
                }),
                Binding::Default | Binding::Custom { .. } => {}
            }
        }

        let errors = configuration
            .error_codes
            .iter()
            .map(|(code, kinds)| ErrorSpecification {
                code: code.clone(),
                cause_errors: kinds.clone(),
            })
            .collect();

        let output = VariableSpecification {
            variable_name: configuration.output_variable.clone(),
            required: !spec.output_optional,
            type_name: spec
                .output_type
                .clone()
                .unwrap_or_else(|| target_name(TargetType::Any).to_string()),
        };

        Self {
            type_name: configuration.job_type.clone(),
            documentation,
            headers,
            variables,
            errors,
            output,
        }
    }
}

fn target_name(target: TargetType) -> &'static str {
    match target {
        TargetType::Any => "Any",
        TargetType::Bool => "Bool",
        TargetType::Integer => "Integer",
        TargetType::Float => "Float",
        TargetType::String => "String",
        TargetType::Map => "Map",
        TargetType::List => "List",
        TargetType::Object => "Object",
        TargetType::Job => "Job",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::ParameterSpec;
    use crate::handler::WorkerHandler;
    use crate::registry::WorkerDefaults;

    #[test]
    fn test_describe_worker() {
        let spec = WorkerSpec::new("billing", "charge", WorkerHandler::blocking(|_| Ok(Some(1))))
            .job_type("charge-card")
            .error_code("11", "InsufficientFunds")
            .output::<i64>(true)
            .parameter(ParameterSpec::new("amount", Binding::variable("amount"), TargetType::Integer))
            .parameter(
                ParameterSpec::new("channel", Binding::Header { name: None }, TargetType::String)
                    .optional(),
            )
            .parameter(ParameterSpec::new("key", Binding::Default, TargetType::Integer));
        let configuration = WorkerConfiguration::from_spec(&spec, &WorkerDefaults::default()).unwrap();

        let described = WorkerSpecification::describe(&spec, &configuration);
        assert_eq!(described.type_name, "charge-card");
        assert_eq!(described.documentation, "billing");
        assert_eq!(
            described.headers,
            vec![HeaderSpecification {
                header_name: "channel".to_string(),
                required: false
            }]
        );
        assert_eq!(described.variables.len(), 1);
        assert_eq!(described.variables[0].type_name, "Integer");
        assert_eq!(described.errors[0].code, "11");
        assert_eq!(described.output.variable_name, "billing_charge");
        assert_eq!(described.output.type_name, "i64");
        assert!(!described.output.required);
    }

    #[test]
    fn test_untyped_output_is_any() {
        let spec = WorkerSpec::new("billing", "refund", WorkerHandler::blocking(|_| Ok(())));
        let configuration = WorkerConfiguration::from_spec(&spec, &WorkerDefaults::default()).unwrap();

        let described = WorkerSpecification::describe(&spec, &configuration);
        assert_eq!(described.output.type_name, target_name(TargetType::Any));
        assert_eq!(described.output.variable_name, "billing_refund");
    }
}
