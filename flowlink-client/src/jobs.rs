//! Job endpoints

use flowlink_core::domain::job::ActivatedJob;
use flowlink_core::dto::job::{
    ActivateJobsRequest, CompleteJob, FailJob, ThrowError, UpdateRetries,
};
use std::time::Duration;

use crate::wire::{
    ActivateJobsBody, ActivateJobsResponse, CompleteJobBody, FailJobBody, JobChangeset,
    ThrowErrorBody, UpdateJobBody, millis,
};
use crate::{GatewayClient, Result};

/// Slack on top of the long-poll timeout before the HTTP request gives up
const ACTIVATION_GRACE: Duration = Duration::from_secs(5);

impl GatewayClient {
    /// Activate jobs of one type
    ///
    /// The gateway holds the request open for up to `request_timeout` when no
    /// jobs are available.
    pub async fn activate_jobs(&self, request: ActivateJobsRequest) -> Result<Vec<ActivatedJob>> {
        let body = ActivateJobsBody {
            job_type: &request.job_type,
            worker: &request.worker,
            timeout: millis(request.timeout),
            max_jobs_to_activate: request.max_jobs_to_activate,
            fetch_variable: &request.fetch_variables,
            request_timeout: millis(request.request_timeout),
        };

        let response = self
            .send(
                self.client
                    .post(self.url("/v2/jobs/activation"))
                    .timeout(request.request_timeout + ACTIVATION_GRACE)
                    .json(&body),
            )
            .await?;

        let activated: ActivateJobsResponse = self.handle_response(response).await?;
        Ok(activated.jobs.into_iter().map(ActivatedJob::from).collect())
    }

    /// Complete a job, optionally merging variables into its scope
    ///
    /// # Arguments
    /// * `request` - Job key and the variables to submit
    pub async fn complete_job(&self, request: CompleteJob) -> Result<()> {
        let body = CompleteJobBody {
            variables: request.variables.as_ref(),
        };
        let response = self
            .send(
                self.client
                    .post(self.url(&format!("/v2/jobs/{}/completion", request.job_key)))
                    .json(&body),
            )
            .await?;

        self.handle_empty_response(response).await
    }

    /// Mark a job as failed with the given remaining retries
    pub async fn fail_job(&self, request: FailJob) -> Result<()> {
        let body = FailJobBody {
            retries: request.retries,
            error_message: request.error_message.as_deref(),
        };
        let response = self
            .send(
                self.client
                    .post(self.url(&format!("/v2/jobs/{}/failure", request.job_key)))
                    .json(&body),
            )
            .await?;

        self.handle_empty_response(response).await
    }

    /// Raise a business error that a boundary event may catch
    pub async fn throw_error(&self, request: ThrowError) -> Result<()> {
        let body = ThrowErrorBody {
            error_code: &request.error_code,
            error_message: request.error_message.as_deref(),
        };
        let response = self
            .send(
                self.client
                    .post(self.url(&format!("/v2/jobs/{}/error", request.job_key)))
                    .json(&body),
            )
            .await?;

        self.handle_empty_response(response).await
    }

    pub async fn update_retries(&self, request: UpdateRetries) -> Result<()> {
        let body = UpdateJobBody {
            changeset: JobChangeset {
                retries: request.retries,
            },
        };
        let response = self
            .send(
                self.client
                    .patch(self.url(&format!("/v2/jobs/{}", request.job_key)))
                    .json(&body),
            )
            .await?;

        self.handle_empty_response(response).await
    }
}
