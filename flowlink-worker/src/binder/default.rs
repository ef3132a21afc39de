//! Binder for well-known job metadata

use flowlink_core::domain::job::ActivatedJob;
use serde_json::Value;

use super::{Binder, BindingResult, ParameterSpec, TargetType};

/// Resolves parameters from job metadata by name
///
/// Names match case-insensitively with underscores ignored, so `job_key` and
/// `jobKey` are the same parameter. Unknown names bind to nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBinder;

impl Binder for DefaultBinder {
    fn bind(&self, job: &ActivatedJob, parameter: &ParameterSpec) -> BindingResult {
        if parameter.target == TargetType::Job {
            return match serde_json::to_value(job) {
                Ok(value) => BindingResult::Present(value),
                Err(_) => BindingResult::Empty,
            };
        }

        let value = match normalize(&parameter.name).as_str() {
            "key" | "jobkey" => Value::from(job.key),
            "processinstancekey" => Value::from(job.process_instance_key),
            "bpmnprocessid" => Value::from(job.bpmn_process_id.clone()),
            "processdefinitionversion" => Value::from(job.process_definition_version),
            "processdefinitionkey" => Value::from(job.process_definition_key),
            "elementid" => Value::from(job.element_id.clone()),
            "elementinstancekey" => Value::from(job.element_instance_key),
            "retries" => Value::from(job.retries),
            "deadline" => Value::from(job.deadline),
            "type" | "jobtype" => Value::from(job.job_type.clone()),
            "worker" => Value::from(job.worker.clone()),
            "headers" => Value::Object(
                job.custom_headers
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                    .collect(),
            ),
            "variables" => Value::Object(job.variables.clone()),
            _ => return BindingResult::Empty,
        };

        BindingResult::from_conversion(parameter.target.convert(&value))
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Binding;
    use crate::testing::sample_job;
    use serde_json::json;

    fn param(name: &str, target: TargetType) -> ParameterSpec {
        ParameterSpec::new(name, Binding::Default, target)
    }

    #[test]
    fn test_binds_metadata_by_name() {
        let job = sample_job(json!({"amount": 10}));
        let binder = DefaultBinder;

        assert_eq!(
            binder.bind(&job, &param("jobKey", TargetType::Integer)),
            BindingResult::Present(json!(job.key))
        );
        assert_eq!(
            binder.bind(&job, &param("process_instance_key", TargetType::Any)),
            BindingResult::Present(json!(job.process_instance_key))
        );
        assert_eq!(
            binder.bind(&job, &param("retries", TargetType::Integer)),
            BindingResult::Present(json!(3))
        );
        assert_eq!(
            binder.bind(&job, &param("variables", TargetType::Map)),
            BindingResult::Present(json!({"amount": 10}))
        );
        assert_eq!(
            binder.bind(&job, &param("headers", TargetType::Map)),
            BindingResult::Present(json!({"channel": "web"}))
        );
    }

    #[test]
    fn test_unknown_name_is_empty() {
        let job = sample_job(json!({"amount": 10}));
        assert_eq!(
            DefaultBinder.bind(&job, &param("amount", TargetType::Any)),
            BindingResult::Empty
        );
    }

    #[test]
    fn test_binds_whole_job() {
        let job = sample_job(json!({}));
        let BindingResult::Present(value) = DefaultBinder.bind(&job, &param("job", TargetType::Job))
        else {
            panic!("job should bind");
        };
        let restored: ActivatedJob = serde_json::from_value(value).unwrap();
        assert_eq!(restored, job);
    }
}
