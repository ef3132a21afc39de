//! Job execution pipeline
//!
//! Takes one activated job to exactly one outcome: bind its arguments,
//! invoke the handler on the shared execution pool, then complete the job,
//! report a business error, or fail it.

use async_trait::async_trait;
use flowlink_client::{BrokerClient, JobHandler};
use flowlink_core::Variables;
use flowlink_core::domain::job::ActivatedJob;
use flowlink_core::dto::job::{CompleteJob, FailJob, ThrowError};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use super::{HandlerError, HandlerResult};
use crate::binder::BinderRegistry;
use crate::registry::WorkerConfiguration;

/// Bounded pool shared by the handlers of every job type
#[derive(Debug, Clone)]
pub struct ExecutionPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl ExecutionPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots not currently running a handler
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).acquire_owned().await.ok()
    }
}

/// Stage a job has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Activated,
    Bound,
    Invoked,
    Completed,
    BusinessErrorReported,
    Failed,
}

/// What the pipeline did with a job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed {
        variables: Option<Variables>,
    },
    BusinessErrorReported {
        code: String,
        message: String,
    },
    Failed {
        retries: i32,
        message: String,
    },
    /// Auto-complete is off; the handler reports the job itself
    Unreported {
        error: Option<HandlerError>,
    },
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            Self::Completed { .. } => JobState::Completed,
            Self::BusinessErrorReported { .. } => JobState::BusinessErrorReported,
            Self::Failed { .. } => JobState::Failed,
            Self::Unreported { .. } => JobState::Invoked,
        }
    }
}

/// Executes the jobs of one worker
pub struct JobPipeline {
    configuration: WorkerConfiguration,
    binders: Arc<BinderRegistry>,
    pool: ExecutionPool,
}

impl JobPipeline {
    pub fn new(
        configuration: &WorkerConfiguration,
        binders: Arc<BinderRegistry>,
        pool: ExecutionPool,
    ) -> Self {
        Self {
            configuration: configuration.clone(),
            binders,
            pool,
        }
    }

    /// Run one job to its outcome
    ///
    /// Failures of the reporting call are logged and not retried; the broker
    /// hands the job out again once its timeout lapses.
    pub async fn execute(&self, client: &dyn BrokerClient, job: ActivatedJob) -> JobOutcome {
        let _permit = self.pool.acquire().await;
        let job = Arc::new(job);
        debug!(
            job_key = job.key,
            state = ?JobState::Activated,
            "Executing job of type '{}'",
            self.configuration.job_type
        );

        let result = self.run(&job).await;

        if !self.configuration.auto_complete {
            debug!(job_key = job.key, "Auto-complete disabled, leaving job to handler");
            return JobOutcome::Unreported {
                error: result.err(),
            };
        }

        match result {
            Ok(output) => self.complete(client, &job, output).await,
            Err(error) => self.report_failure(client, &job, error).await,
        }
    }

    async fn run(&self, job: &Arc<ActivatedJob>) -> HandlerResult {
        let arguments = self
            .binders
            .bind_all(Arc::clone(job), &self.configuration.parameters)?;
        debug!(
            job_key = job.key,
            state = ?JobState::Bound,
            "Bound {} argument(s)",
            arguments.len()
        );

        let result = self.configuration.handler.invoke(arguments).await;
        debug!(
            job_key = job.key,
            state = ?JobState::Invoked,
            "Invoked {} handler",
            self.configuration.handler.shape()
        );
        result
    }

    async fn complete(
        &self,
        client: &dyn BrokerClient,
        job: &ActivatedJob,
        output: Option<Value>,
    ) -> JobOutcome {
        let variables = output.map(|value| {
            let mut variables = Variables::new();
            variables.insert(self.configuration.output_variable.clone(), value);
            variables
        });

        let request = CompleteJob {
            job_key: job.key,
            variables: variables.clone(),
        };
        match client.complete_job(request).await {
            Ok(()) => info!("Completed job {} of type '{}'", job.key, self.configuration.job_type),
            Err(e) => warn!("Failed to complete job {}: {:#}", job.key, e),
        }

        JobOutcome::Completed { variables }
    }

    async fn report_failure(
        &self,
        client: &dyn BrokerClient,
        job: &ActivatedJob,
        error: HandlerError,
    ) -> JobOutcome {
        let root = error.root_cause();
        let message = root.report_message().to_string();

        if let Some(code) = self.configuration.error_code_for(root).map(str::to_string) {
            info!(
                "Job {} raised business error '{}': {}",
                job.key, code, message
            );
            let request = ThrowError {
                job_key: job.key,
                error_code: code.clone(),
                error_message: Some(message.clone()),
            };
            if let Err(e) = client.throw_error(request).await {
                warn!("Failed to report business error for job {}: {:#}", job.key, e);
            }
            return JobOutcome::BusinessErrorReported { code, message };
        }

        let retries = job.retries.saturating_sub(1).max(0);
        warn!(
            "Job {} of type '{}' failed ({} retries left): {}",
            job.key, self.configuration.job_type, retries, error
        );
        let request = FailJob {
            job_key: job.key,
            retries,
            error_message: Some(message.clone()),
        };
        if let Err(e) = client.fail_job(request).await {
            warn!("Failed to report failure for job {}: {:#}", job.key, e);
        }

        JobOutcome::Failed { retries, message }
    }
}

#[async_trait]
impl JobHandler for JobPipeline {
    async fn handle(&self, client: Arc<dyn BrokerClient>, job: ActivatedJob) {
        self.execute(client.as_ref(), job).await;
    }
}
