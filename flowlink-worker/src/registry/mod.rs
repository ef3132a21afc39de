//! Worker registry
//!
//! Maps each job type to its long-lived [`WorkerConfiguration`] and to at
//! most one live subscription. Every job type owns a lock slot; replacing or
//! closing its subscription only happens while that slot is held, so
//! operations on different job types never contend.

mod configuration;
mod spec;
mod specification;

pub use configuration::{WorkerConfiguration, WorkerDefaults};
pub use spec::WorkerSpec;
pub use specification::{
    ErrorSpecification, HeaderSpecification, VariableSpecification, WorkerSpecification,
};

use flowlink_client::JobSubscription;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::binder::BinderRegistry;
use crate::connection::ConnectionSupervisor;
use crate::error::{Result, WorkerError};
use crate::handler::{ExecutionPool, JobPipeline};

type Subscription = Option<Box<dyn JobSubscription>>;
type HandleSlot = Arc<Mutex<Subscription>>;

/// Registered workers and their live subscriptions
pub struct WorkerRegistry {
    supervisor: Arc<ConnectionSupervisor>,
    binders: Arc<BinderRegistry>,
    pool: ExecutionPool,
    defaults: WorkerDefaults,
    configurations: RwLock<HashMap<String, WorkerConfiguration>>,
    specifications: RwLock<HashMap<String, WorkerSpecification>>,
    handles: RwLock<HashMap<String, HandleSlot>>,
}

impl WorkerRegistry {
    pub fn new(
        supervisor: Arc<ConnectionSupervisor>,
        binders: Arc<BinderRegistry>,
        pool: ExecutionPool,
        defaults: WorkerDefaults,
    ) -> Self {
        Self {
            supervisor,
            binders,
            pool,
            defaults,
            configurations: RwLock::new(HashMap::new()),
            specifications: RwLock::new(HashMap::new()),
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Register a worker and start opening its subscription in the background
    ///
    /// Fails when the job type is already registered or the spec carries an
    /// invalid value. The existing registration is left untouched.
    pub fn register(self: &Arc<Self>, spec: WorkerSpec) -> Result<WorkerConfiguration> {
        let configuration = WorkerConfiguration::from_spec(&spec, &self.defaults)?;
        let job_type = configuration.job_type.clone();

        {
            let mut configurations = self.configurations.write();
            if configurations.contains_key(&job_type) {
                return Err(WorkerError::DuplicateWorker(job_type));
            }
            configurations.insert(job_type.clone(), configuration.clone());
        }
        self.specifications.write().insert(
            job_type.clone(),
            WorkerSpecification::describe(&spec, &configuration),
        );
        self.handles
            .write()
            .insert(job_type.clone(), Arc::new(Mutex::new(None)));

        info!(
            "Registered worker '{}' ({}::{})",
            job_type, spec.handler_owner, spec.handler_name
        );

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let registry = Arc::clone(self);
                runtime.spawn(async move {
                    if let Err(e) = registry.open_worker(&job_type).await {
                        warn!("Failed to open worker '{}': {}", job_type, e);
                    }
                });
            }
            Err(_) => debug!(
                "No async runtime, worker '{}' opens on next connection",
                job_type
            ),
        }

        Ok(configuration)
    }

    /// Open the subscription for a job type
    ///
    /// Returns `Ok(false)` without doing anything when the subscription is
    /// already open, the worker is disabled, or no client is available yet.
    pub async fn open_worker(&self, job_type: &str) -> Result<bool> {
        let slot = self.slot(job_type)?;
        let mut handle = slot.lock().await;
        self.open_locked(job_type, &mut handle)
    }

    fn open_locked(&self, job_type: &str, handle: &mut Subscription) -> Result<bool> {
        if handle.as_ref().is_some_and(|h| h.is_open()) {
            debug!("Worker '{}' is already open", job_type);
            return Ok(false);
        }

        let configuration = self
            .configuration(job_type)
            .ok_or_else(|| WorkerError::UnknownWorker(job_type.to_string()))?;
        if !configuration.enabled {
            debug!("Worker '{}' is disabled, not opening", job_type);
            return Ok(false);
        }

        let Some(client) = self.supervisor.client() else {
            debug!(
                "No broker client, deferring worker '{}' until connected",
                job_type
            );
            return Ok(false);
        };

        let pipeline = Arc::new(JobPipeline::new(
            &configuration,
            Arc::clone(&self.binders),
            self.pool.clone(),
        ));
        let subscription = client.open_worker(configuration.job_worker_options(), pipeline)?;
        *handle = Some(subscription);

        info!(
            "Opened worker '{}' (max_jobs_active={}, timeout={:?})",
            job_type, configuration.max_jobs_active, configuration.timeout
        );
        Ok(true)
    }

    /// Rebuild every enabled subscription against the current client
    pub async fn on_connection_established(&self) {
        for (job_type, slot) in self.slots() {
            let mut handle = slot.lock().await;
            if let Some(stale) = handle.take() {
                stale.close();
            }
            if let Err(e) = self.open_locked(&job_type, &mut handle) {
                warn!("Failed to reopen worker '{}': {}", job_type, e);
            }
        }
    }

    /// Forget every subscription; they died with the connection
    pub async fn on_connection_lost(&self) {
        let mut dropped = 0;
        for (_, slot) in self.slots() {
            if slot.lock().await.take().is_some() {
                dropped += 1;
            }
        }
        info!("Connection lost, dropped {} worker subscription(s)", dropped);
    }

    /// Close a worker's subscription and disable it
    ///
    /// Succeeds when the worker is already stopped or not registered.
    pub async fn stop_worker(&self, job_type: &str) -> Result<()> {
        let Ok(slot) = self.slot(job_type) else {
            debug!("Stop requested for unknown worker '{}'", job_type);
            return Ok(());
        };

        let mut handle = slot.lock().await;
        if let Some(subscription) = handle.take() {
            subscription.close();
        }
        self.set_enabled(job_type, false);
        info!("Stopped worker '{}'", job_type);
        Ok(())
    }

    /// Enable a worker and open its subscription
    pub async fn resume_worker(&self, job_type: &str) -> Result<bool> {
        let slot = self.slot(job_type)?;
        let mut handle = slot.lock().await;
        self.set_enabled(job_type, true);
        let opened = self.open_locked(job_type, &mut handle)?;
        info!("Resumed worker '{}'", job_type);
        Ok(opened)
    }

    /// Stop then resume a worker. Only a failing stop fails the restart.
    pub async fn restart_worker(&self, job_type: &str) -> Result<()> {
        self.stop_worker(job_type).await?;
        if let Err(e) = self.resume_worker(job_type).await {
            warn!("Worker '{}' stopped but did not resume: {}", job_type, e);
        }
        Ok(())
    }

    /// Close every subscription without disabling the workers
    pub async fn close_all(&self) {
        for (_, slot) in self.slots() {
            if let Some(subscription) = slot.lock().await.take() {
                subscription.close();
            }
        }
    }

    pub fn configuration(&self, job_type: &str) -> Option<WorkerConfiguration> {
        self.configurations.read().get(job_type).cloned()
    }

    /// All configurations, ordered by job type
    pub fn worker_configurations(&self) -> Vec<WorkerConfiguration> {
        let mut configurations: Vec<_> = self.configurations.read().values().cloned().collect();
        configurations.sort_by(|a, b| a.job_type.cmp(&b.job_type));
        configurations
    }

    /// All worker descriptions, ordered by job type
    pub fn worker_specifications(&self) -> Vec<WorkerSpecification> {
        let mut specifications: Vec<_> = self.specifications.read().values().cloned().collect();
        specifications.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        specifications
    }

    pub async fn is_open(&self, job_type: &str) -> bool {
        match self.slot(job_type) {
            Ok(slot) => slot.lock().await.as_ref().is_some_and(|h| h.is_open()),
            Err(_) => false,
        }
    }

    /// Number of open subscriptions
    pub async fn open_handles(&self) -> usize {
        let mut open = 0;
        for (_, slot) in self.slots() {
            if slot.lock().await.as_ref().is_some_and(|h| h.is_open()) {
                open += 1;
            }
        }
        open
    }

    fn slot(&self, job_type: &str) -> Result<HandleSlot> {
        self.handles
            .read()
            .get(job_type)
            .cloned()
            .ok_or_else(|| WorkerError::UnknownWorker(job_type.to_string()))
    }

    fn slots(&self) -> Vec<(String, HandleSlot)> {
        let mut slots: Vec<_> = self
            .handles
            .read()
            .iter()
            .map(|(job_type, slot)| (job_type.clone(), Arc::clone(slot)))
            .collect();
        slots.sort_by(|a, b| a.0.cmp(&b.0));
        slots
    }

    fn set_enabled(&self, job_type: &str, enabled: bool) {
        if let Some(configuration) = self.configurations.write().get_mut(job_type) {
            configuration.enabled = enabled;
        }
    }
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut job_types: Vec<_> = self.configurations.read().keys().cloned().collect();
        job_types.sort();
        f.debug_struct("WorkerRegistry")
            .field("job_types", &job_types)
            .field("pool", &self.pool)
            .finish()
    }
}
