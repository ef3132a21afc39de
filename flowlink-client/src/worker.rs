//! Job worker
//!
//! Polls the broker for jobs of one type and hands each activated job to a
//! [`JobHandler`] on its own task. At most `max_jobs_active` jobs are in
//! flight per worker.

use flowlink_core::dto::job::ActivateJobsRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing::{debug, info, warn};

use crate::broker::{BrokerClient, JobHandler, JobSubscription};

/// Upper bound for the delay between failed activation attempts
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Options for a single job subscription
#[derive(Debug, Clone, PartialEq)]
pub struct JobWorkerOptions {
    pub job_type: String,
    /// Worker name reported to the broker on activation
    pub worker_name: String,
    /// Lock duration of activated jobs
    pub timeout: Duration,
    pub max_jobs_active: usize,
    pub poll_interval: Duration,
    /// Long-poll timeout of one activation request
    pub request_timeout: Duration,
    /// Variables to fetch. Empty fetches all.
    pub fetch_variables: Vec<String>,
}

impl JobWorkerOptions {
    pub fn new(job_type: impl Into<String>) -> Self {
        Self {
            job_type: job_type.into(),
            worker_name: "default".to_string(),
            timeout: Duration::from_secs(300),
            max_jobs_active: 32,
            poll_interval: Duration::from_millis(100),
            request_timeout: Duration::from_secs(10),
            fetch_variables: Vec::new(),
        }
    }

    fn activation_request(&self, capacity: usize) -> ActivateJobsRequest {
        ActivateJobsRequest {
            job_type: self.job_type.clone(),
            worker: self.worker_name.clone(),
            timeout: self.timeout,
            max_jobs_to_activate: u32::try_from(capacity).unwrap_or(u32::MAX),
            fetch_variables: self.fetch_variables.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

/// Handle to a running poll loop
///
/// Closing or dropping the handle stops the loop.
pub struct JobWorker {
    job_type: String,
    shutdown: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl JobWorker {
    /// Spawn the poll loop on the current runtime
    pub fn open(
        client: Arc<dyn BrokerClient>,
        options: JobWorkerOptions,
        handler: Arc<dyn JobHandler>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let job_type = options.job_type.clone();
        let poller = Poller {
            semaphore: Arc::new(Semaphore::new(options.max_jobs_active.max(1))),
            client,
            options,
            handler,
        };
        let task = tokio::spawn(poller.run(shutdown_rx));

        Self {
            job_type,
            shutdown,
            task,
        }
    }
}

impl JobSubscription for JobWorker {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    fn is_open(&self) -> bool {
        !*self.shutdown.borrow() && !self.task.is_finished()
    }

    fn close(&self) {
        self.shutdown.send_replace(true);
    }
}

impl Drop for JobWorker {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

impl std::fmt::Debug for JobWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobWorker")
            .field("job_type", &self.job_type)
            .field("open", &self.is_open())
            .finish()
    }
}

struct Poller {
    client: Arc<dyn BrokerClient>,
    options: JobWorkerOptions,
    handler: Arc<dyn JobHandler>,
    semaphore: Arc<Semaphore>,
}

impl Poller {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting job worker for '{}' (interval: {:?}, max active: {})",
            self.options.job_type, self.options.poll_interval, self.options.max_jobs_active
        );

        let mut interval = time::interval(self.options.poll_interval);
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }

            let capacity = self.semaphore.available_permits();
            if capacity == 0 {
                debug!("Job worker '{}' at capacity", self.options.job_type);
                continue;
            }

            let request = self.options.activation_request(capacity);
            let activated = tokio::select! {
                result = self.client.activate_jobs(request) => result,
                _ = shutdown.changed() => break,
            };

            match activated {
                Ok(jobs) => {
                    failures = 0;
                    if !jobs.is_empty() {
                        debug!(
                            "Activated {} job(s) of type '{}'",
                            jobs.len(),
                            self.options.job_type
                        );
                    }
                    for job in jobs {
                        let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                            break;
                        };
                        let client = Arc::clone(&self.client);
                        let handler = Arc::clone(&self.handler);
                        tokio::spawn(async move {
                            handler.handle(client, job).await;
                            drop(permit);
                        });
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = backoff_delay(self.options.poll_interval, failures);
                    warn!(
                        "Failed to activate jobs of type '{}': {:#} (retrying in {:?})",
                        self.options.job_type, e, delay
                    );
                    tokio::select! {
                        _ = time::sleep(delay) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }

        info!("Job worker for '{}' stopped", self.options.job_type);
    }
}

/// Exponential delay after `failures` consecutive activation errors
fn backoff_delay(base: Duration, failures: u32) -> Duration {
    let factor = 2u32.saturating_pow(failures.saturating_sub(1).min(16));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}
