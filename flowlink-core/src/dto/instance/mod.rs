//! Process instance DTOs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Variables;

/// Request to create a process instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateInstance {
    pub bpmn_process_id: String,
    /// Process version; `None` selects the latest version
    pub version: Option<i32>,
    pub variables: Option<Variables>,
}

impl CreateInstance {
    pub fn latest(bpmn_process_id: impl Into<String>) -> Self {
        Self {
            bpmn_process_id: bpmn_process_id.into(),
            version: None,
            variables: None,
        }
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = Some(variables);
        self
    }
}

/// Request to create a process instance and wait for its completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateInstanceWithResult {
    pub instance: CreateInstance,
    /// Result variables to fetch; empty means all variables
    pub fetch_variables: Vec<String>,
    /// How long the broker waits for the instance to complete
    pub request_timeout: Option<Duration>,
}

/// Request to cancel a running process instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelInstance {
    pub process_instance_key: i64,
}

/// Request to set variables in the scope of an element instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetVariables {
    pub element_instance_key: i64,
    pub variables: Variables,
    /// Restrict the variables to the local scope of the element
    pub local: bool,
}

/// Request to resolve an incident
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveIncident {
    pub incident_key: i64,
}
