//! Deployment domain types

use serde::{Deserialize, Serialize};

/// Result of deploying one or more resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEvent {
    pub key: i64,
    #[serde(default)]
    pub processes: Vec<ProcessMetadata>,
}

/// A process definition created by a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetadata {
    pub bpmn_process_id: String,
    pub version: i32,
    pub process_definition_key: i64,
    pub resource_name: String,
}
