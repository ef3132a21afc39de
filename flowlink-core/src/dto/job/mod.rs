//! Job command DTOs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Variables;

/// Request to activate jobs of one type for a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivateJobsRequest {
    pub job_type: String,
    pub worker: String,
    /// How long activated jobs stay exclusively assigned to this worker
    pub timeout: Duration,
    pub max_jobs_to_activate: u32,
    /// Variables to fetch; empty means all variables
    pub fetch_variables: Vec<String>,
    /// Long-polling timeout of the activation call
    pub request_timeout: Duration,
}

/// Request to complete a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompleteJob {
    pub job_key: i64,
    pub variables: Option<Variables>,
}

/// Request to mark a job as failed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailJob {
    pub job_key: i64,
    pub retries: i32,
    pub error_message: Option<String>,
}

/// Request to report a business error for a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrowError {
    pub job_key: i64,
    pub error_code: String,
    pub error_message: Option<String>,
}

/// Request to change the remaining retries of a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRetries {
    pub job_key: i64,
    pub retries: i32,
}
