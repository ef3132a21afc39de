//! Gateway REST payloads
//!
//! The v2 REST API carries keys as strings and names processes by
//! `processDefinitionId`. These types translate between that shape and the
//! domain types in `flowlink-core`.

use flowlink_core::Variables;
use flowlink_core::domain::deployment::{DeploymentEvent, ProcessMetadata};
use flowlink_core::domain::instance::{ProcessInstanceEvent, ProcessInstanceResult};
use flowlink_core::domain::job::ActivatedJob;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Accept a key either as a JSON number or as a decimal string
pub(crate) fn de_key<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Key {
        Number(i64),
        Text(String),
    }

    match Key::deserialize(deserializer)? {
        Key::Number(n) => Ok(n),
        Key::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// Jobs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActivateJobsBody<'a> {
    #[serde(rename = "type")]
    pub job_type: &'a str,
    pub worker: &'a str,
    pub timeout: u64,
    pub max_jobs_to_activate: u32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub fetch_variable: &'a [String],
    pub request_timeout: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivateJobsResponse {
    #[serde(default)]
    pub jobs: Vec<WireJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireJob {
    #[serde(deserialize_with = "de_key")]
    pub job_key: i64,
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(deserialize_with = "de_key")]
    pub process_instance_key: i64,
    pub process_definition_id: String,
    pub process_definition_version: i32,
    #[serde(deserialize_with = "de_key")]
    pub process_definition_key: i64,
    pub element_id: String,
    #[serde(deserialize_with = "de_key")]
    pub element_instance_key: i64,
    #[serde(default)]
    pub worker: String,
    pub retries: i32,
    pub deadline: i64,
    #[serde(default)]
    pub custom_headers: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub variables: Variables,
}

impl From<WireJob> for ActivatedJob {
    fn from(job: WireJob) -> Self {
        let custom_headers = job
            .custom_headers
            .into_iter()
            .map(|(name, value)| match value {
                serde_json::Value::String(s) => (name, s),
                other => (name, other.to_string()),
            })
            .collect();

        ActivatedJob {
            key: job.job_key,
            job_type: job.job_type,
            process_instance_key: job.process_instance_key,
            bpmn_process_id: job.process_definition_id,
            process_definition_version: job.process_definition_version,
            process_definition_key: job.process_definition_key,
            element_id: job.element_id,
            element_instance_key: job.element_instance_key,
            worker: job.worker,
            retries: job.retries,
            deadline: job.deadline,
            custom_headers,
            variables: job.variables,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CompleteJobBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<&'a Variables>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FailJobBody<'a> {
    pub retries: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThrowErrorBody<'a> {
    pub error_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateJobBody {
    pub changeset: JobChangeset,
}

#[derive(Debug, Serialize)]
pub(crate) struct JobChangeset {
    pub retries: i32,
}

// =============================================================================
// Process instances
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateInstanceBody<'a> {
    pub process_definition_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_definition_version: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<&'a Variables>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub await_completion: bool,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub fetch_variables: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateInstanceResponse {
    #[serde(deserialize_with = "de_key")]
    pub process_definition_key: i64,
    pub process_definition_id: String,
    pub process_definition_version: i32,
    #[serde(deserialize_with = "de_key")]
    pub process_instance_key: i64,
    #[serde(default)]
    pub variables: Variables,
}

impl From<CreateInstanceResponse> for ProcessInstanceEvent {
    fn from(r: CreateInstanceResponse) -> Self {
        ProcessInstanceEvent {
            process_definition_key: r.process_definition_key,
            bpmn_process_id: r.process_definition_id,
            version: r.process_definition_version,
            process_instance_key: r.process_instance_key,
        }
    }
}

impl From<CreateInstanceResponse> for ProcessInstanceResult {
    fn from(r: CreateInstanceResponse) -> Self {
        ProcessInstanceResult {
            process_definition_key: r.process_definition_key,
            bpmn_process_id: r.process_definition_id,
            version: r.process_definition_version,
            process_instance_key: r.process_instance_key,
            variables: r.variables,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SetVariablesBody<'a> {
    pub variables: &'a Variables,
    pub local: bool,
}

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublishMessageBody<'a> {
    pub name: &'a str,
    pub correlation_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<&'a Variables>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublishMessageResponse {
    #[serde(deserialize_with = "de_key")]
    pub message_key: i64,
}

// =============================================================================
// Deployments
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeploymentResponse {
    #[serde(deserialize_with = "de_key")]
    pub deployment_key: i64,
    #[serde(default)]
    pub deployments: Vec<DeploymentEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeploymentEntry {
    pub process_definition: Option<WireProcessDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireProcessDefinition {
    pub process_definition_id: String,
    pub process_definition_version: i32,
    #[serde(deserialize_with = "de_key")]
    pub process_definition_key: i64,
    pub resource_name: String,
}

impl From<DeploymentResponse> for DeploymentEvent {
    fn from(r: DeploymentResponse) -> Self {
        let processes = r
            .deployments
            .into_iter()
            .filter_map(|entry| entry.process_definition)
            .map(|p| ProcessMetadata {
                bpmn_process_id: p.process_definition_id,
                version: p.process_definition_version,
                process_definition_key: p.process_definition_key,
                resource_name: p.resource_name,
            })
            .collect();

        DeploymentEvent {
            key: r.deployment_key,
            processes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_accepts_string_keys() {
        let json = r#"{
            "jobKey": "2251799813685249",
            "type": "payment",
            "processInstanceKey": "2251799813685240",
            "processDefinitionId": "order-process",
            "processDefinitionVersion": 3,
            "processDefinitionKey": 2251799813685230,
            "elementId": "charge",
            "elementInstanceKey": "2251799813685248",
            "worker": "billing",
            "retries": 3,
            "deadline": 1700000000000,
            "customHeaders": {"channel": "web", "attempts": 2},
            "variables": {"amount": 42}
        }"#;

        let job: ActivatedJob = serde_json::from_str::<WireJob>(json).unwrap().into();
        assert_eq!(job.key, 2251799813685249);
        assert_eq!(job.process_definition_key, 2251799813685230);
        assert_eq!(job.bpmn_process_id, "order-process");
        assert_eq!(job.header("channel"), Some("web"));
        assert_eq!(job.header("attempts"), Some("2"));
        assert_eq!(job.variable("amount"), Some(&serde_json::json!(42)));
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let json = r#"{"messageKey": "not-a-number"}"#;
        assert!(serde_json::from_str::<PublishMessageResponse>(json).is_err());
    }

    #[test]
    fn test_create_instance_body_omits_latest_version() {
        let body = CreateInstanceBody {
            process_definition_id: "order-process",
            process_definition_version: None,
            variables: None,
            await_completion: false,
            fetch_variables: &[],
            request_timeout: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, serde_json::json!({"processDefinitionId": "order-process"}));
    }

    #[test]
    fn test_deployment_skips_non_process_resources() {
        let json = r#"{
            "deploymentKey": "10",
            "deployments": [
                {"processDefinition": {
                    "processDefinitionId": "order-process",
                    "processDefinitionVersion": 1,
                    "processDefinitionKey": "11",
                    "resourceName": "order.bpmn"
                }},
                {"decisionDefinition": {"decisionDefinitionId": "d"}}
            ]
        }"#;
        let event: DeploymentEvent = serde_json::from_str::<DeploymentResponse>(json)
            .unwrap()
            .into();
        assert_eq!(event.key, 10);
        assert_eq!(event.processes.len(), 1);
        assert_eq!(event.processes[0].resource_name, "order.bpmn");
    }
}
