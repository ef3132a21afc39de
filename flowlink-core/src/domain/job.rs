//! Job domain types

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Variables;

/// A unit of work activated by the broker for one worker
///
/// Immutable once received. The execution pipeline consumes each job exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivatedJob {
    /// Unique key of the job
    pub key: i64,
    /// Job type the worker subscribed to
    #[serde(rename = "type")]
    pub job_type: String,
    pub process_instance_key: i64,
    pub bpmn_process_id: String,
    pub process_definition_version: i32,
    pub process_definition_key: i64,
    pub element_id: String,
    pub element_instance_key: i64,
    /// Name of the worker that activated the job
    #[serde(default)]
    pub worker: String,
    /// Remaining retries
    pub retries: i32,
    /// Unix timestamp in milliseconds until which the job is exclusively assigned
    pub deadline: i64,
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
    #[serde(default)]
    pub variables: Variables,
}

impl ActivatedJob {
    /// Activation deadline as a UTC timestamp
    ///
    /// Returns `None` if the broker sent a deadline outside the representable range.
    pub fn deadline_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.deadline).single()
    }

    /// Looks up a top-level variable
    pub fn variable(&self, name: &str) -> Option<&serde_json::Value> {
        self.variables.get(name)
    }

    /// Looks up a custom header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.custom_headers.get(name).map(String::as_str)
    }

    /// Maps the whole variable document into `T`
    pub fn variables_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.variables.clone()))
    }
}
