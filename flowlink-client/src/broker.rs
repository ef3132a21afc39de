//! Broker client abstraction
//!
//! [`BrokerClient`] is the seam between the worker runtime and the transport.
//! The HTTP gateway client implements it; tests substitute their own.

use async_trait::async_trait;
use flowlink_core::domain::deployment::DeploymentEvent;
use flowlink_core::domain::instance::{ProcessInstanceEvent, ProcessInstanceResult};
use flowlink_core::domain::job::ActivatedJob;
use flowlink_core::domain::topology::Topology;
use flowlink_core::dto::deployment::DeployResources;
use flowlink_core::dto::instance::{
    CancelInstance, CreateInstance, CreateInstanceWithResult, ResolveIncident, SetVariables,
};
use flowlink_core::dto::job::{
    ActivateJobsRequest, CompleteJob, FailJob, ThrowError, UpdateRetries,
};
use flowlink_core::dto::message::PublishMessage;
use std::sync::Arc;

use crate::error::Result;
use crate::worker::JobWorkerOptions;

/// Operations offered by a workflow broker connection
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Fetch the current cluster topology
    async fn topology(&self) -> Result<Topology>;

    /// Activate up to `max_jobs_to_activate` jobs of one type
    async fn activate_jobs(&self, request: ActivateJobsRequest) -> Result<Vec<ActivatedJob>>;

    async fn complete_job(&self, request: CompleteJob) -> Result<()>;

    async fn fail_job(&self, request: FailJob) -> Result<()>;

    /// Report a business error for a job
    async fn throw_error(&self, request: ThrowError) -> Result<()>;

    async fn update_retries(&self, request: UpdateRetries) -> Result<()>;

    async fn deploy_resources(&self, request: DeployResources) -> Result<DeploymentEvent>;

    async fn create_instance(&self, request: CreateInstance) -> Result<ProcessInstanceEvent>;

    /// Create an instance and wait for it to complete
    async fn create_instance_with_result(
        &self,
        request: CreateInstanceWithResult,
    ) -> Result<ProcessInstanceResult>;

    async fn cancel_instance(&self, request: CancelInstance) -> Result<()>;

    /// Publish a message, returning the message key
    async fn publish_message(&self, request: PublishMessage) -> Result<i64>;

    async fn set_variables(&self, request: SetVariables) -> Result<()>;

    async fn resolve_incident(&self, request: ResolveIncident) -> Result<()>;

    /// Start a job subscription that feeds activated jobs into `handler`
    fn open_worker(
        &self,
        options: JobWorkerOptions,
        handler: Arc<dyn JobHandler>,
    ) -> Result<Box<dyn JobSubscription>>;

    /// Release the connection. Further calls fail with `Unavailable`.
    async fn close(&self);
}

/// Receives jobs activated by a subscription
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Handle one activated job
    ///
    /// `client` is the connection that activated the job and should be used
    /// to report its outcome.
    async fn handle(&self, client: Arc<dyn BrokerClient>, job: ActivatedJob);
}

/// A live job subscription
///
/// Dropping the subscription stops polling. Jobs already handed to the
/// handler run to completion.
pub trait JobSubscription: Send + Sync {
    /// Job type this subscription polls for
    fn job_type(&self) -> &str;

    fn is_open(&self) -> bool;

    /// Stop polling. Idempotent.
    fn close(&self);
}

// =============================================================================
// Gateway implementation
// =============================================================================

#[async_trait]
impl BrokerClient for crate::GatewayClient {
    async fn topology(&self) -> Result<Topology> {
        crate::GatewayClient::topology(self).await
    }

    async fn activate_jobs(&self, request: ActivateJobsRequest) -> Result<Vec<ActivatedJob>> {
        crate::GatewayClient::activate_jobs(self, request).await
    }

    async fn complete_job(&self, request: CompleteJob) -> Result<()> {
        crate::GatewayClient::complete_job(self, request).await
    }

    async fn fail_job(&self, request: FailJob) -> Result<()> {
        crate::GatewayClient::fail_job(self, request).await
    }

    async fn throw_error(&self, request: ThrowError) -> Result<()> {
        crate::GatewayClient::throw_error(self, request).await
    }

    async fn update_retries(&self, request: UpdateRetries) -> Result<()> {
        crate::GatewayClient::update_retries(self, request).await
    }

    async fn deploy_resources(&self, request: DeployResources) -> Result<DeploymentEvent> {
        crate::GatewayClient::deploy_resources(self, request).await
    }

    async fn create_instance(&self, request: CreateInstance) -> Result<ProcessInstanceEvent> {
        crate::GatewayClient::create_instance(self, request).await
    }

    async fn create_instance_with_result(
        &self,
        request: CreateInstanceWithResult,
    ) -> Result<ProcessInstanceResult> {
        crate::GatewayClient::create_instance_with_result(self, request).await
    }

    async fn cancel_instance(&self, request: CancelInstance) -> Result<()> {
        crate::GatewayClient::cancel_instance(self, request).await
    }

    async fn publish_message(&self, request: PublishMessage) -> Result<i64> {
        crate::GatewayClient::publish_message(self, request).await
    }

    async fn set_variables(&self, request: SetVariables) -> Result<()> {
        crate::GatewayClient::set_variables(self, request).await
    }

    async fn resolve_incident(&self, request: ResolveIncident) -> Result<()> {
        crate::GatewayClient::resolve_incident(self, request).await
    }

    fn open_worker(
        &self,
        options: JobWorkerOptions,
        handler: Arc<dyn JobHandler>,
    ) -> Result<Box<dyn JobSubscription>> {
        if self.is_closed() {
            return Err(crate::ClientError::Unavailable(
                "client is closed".to_string(),
            ));
        }
        let client: Arc<dyn BrokerClient> = Arc::new(self.clone());
        Ok(Box::new(crate::JobWorker::open(client, options, handler)))
    }

    async fn close(&self) {
        crate::GatewayClient::close(self);
    }
}
