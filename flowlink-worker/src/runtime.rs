//! Worker runtime
//!
//! Wires the connection supervisor, worker registry and command table
//! together. Once started, broker health is probed with a fixed delay and
//! every connectivity transition is forwarded to the registry.

use flowlink_core::domain::health::HealthReport;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::binder::{Binder, BinderRegistry, BindingKind};
use crate::command::CommandTable;
use crate::config::BrokerConfig;
use crate::connection::{
    ClientFactory, ConnectionEvent, ConnectionSupervisor, GatewayClientFactory,
};
use crate::error::Result;
use crate::handler::ExecutionPool;
use crate::registry::{WorkerConfiguration, WorkerDefaults, WorkerRegistry, WorkerSpec};

/// Builder for [`WorkerRuntime`]
pub struct WorkerRuntimeBuilder {
    config: BrokerConfig,
    specs: Vec<WorkerSpec>,
    factory: Arc<dyn ClientFactory>,
    binders: BinderRegistry,
}

impl WorkerRuntimeBuilder {
    /// Add a worker to register on build
    pub fn worker(mut self, spec: WorkerSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn workers(mut self, specs: impl IntoIterator<Item = WorkerSpec>) -> Self {
        self.specs.extend(specs);
        self
    }

    /// Replace the default [`GatewayClientFactory`]
    pub fn client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Register an extra argument binder
    pub fn binder(mut self, kind: BindingKind, binder: Arc<dyn Binder>) -> Self {
        self.binders.register(kind, binder);
        self
    }

    /// Validate the configuration and register every worker
    ///
    /// Fails on the first invalid or duplicate worker.
    pub fn build(self) -> Result<WorkerRuntime> {
        self.config.validate()?;

        let defaults = WorkerDefaults::from_config(&self.config);
        let pool = ExecutionPool::new(self.config.execution_threads);
        let supervisor = Arc::new(ConnectionSupervisor::new(self.config, self.factory));
        let registry = Arc::new(WorkerRegistry::new(
            Arc::clone(&supervisor),
            Arc::new(self.binders),
            pool,
            defaults,
        ));
        for spec in self.specs {
            registry.register(spec)?;
        }
        let commands = Arc::new(CommandTable::new(Arc::clone(&supervisor)));
        let (shutdown, _) = watch::channel(false);

        Ok(WorkerRuntime {
            supervisor,
            registry,
            commands,
            shutdown,
            tasks: Mutex::new(Vec::new()),
        })
    }
}

/// A running set of workers bound to one broker
pub struct WorkerRuntime {
    supervisor: Arc<ConnectionSupervisor>,
    registry: Arc<WorkerRegistry>,
    commands: Arc<CommandTable>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerRuntime {
    pub fn builder(config: BrokerConfig) -> WorkerRuntimeBuilder {
        WorkerRuntimeBuilder {
            config,
            specs: Vec::new(),
            factory: Arc::new(GatewayClientFactory),
            binders: BinderRegistry::default(),
        }
    }

    /// Spawn the health probe loop and the connectivity listener
    ///
    /// Calling `start` on a running runtime does nothing.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            debug!("Worker runtime already started");
            return;
        }

        let interval = self.supervisor.config().health_check_interval;
        info!(
            "Starting worker runtime with {} worker(s), health check every {:?}",
            self.registry.worker_configurations().len(),
            interval
        );

        // Subscribe before the first probe so no transition is missed
        let events = self.supervisor.subscribe();
        tasks.push(tokio::spawn(listen(
            Arc::clone(&self.supervisor),
            Arc::clone(&self.registry),
            events,
            self.shutdown.subscribe(),
        )));

        let supervisor = Arc::clone(&self.supervisor);
        let mut shutdown = self.shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            loop {
                supervisor.probe_health().await;
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.changed() => break,
                }
            }
            debug!("Health probe loop stopped");
        }));
    }

    /// Stop probing, close every subscription and the client
    pub async fn shutdown(&self) {
        info!("Shutting down worker runtime");
        self.shutdown.send_replace(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Runtime task ended abnormally: {}", e);
            }
        }

        self.registry.close_all().await;
        self.supervisor.close().await;
    }

    /// Register a worker after the runtime was built
    pub fn register(&self, spec: WorkerSpec) -> Result<WorkerConfiguration> {
        self.registry.register(spec)
    }

    pub async fn switch_connection(&self, enabled: bool) {
        self.supervisor.switch_connection(enabled).await;
    }

    pub fn health(&self) -> HealthReport {
        self.supervisor.health()
    }

    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor> {
        &self.supervisor
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    pub fn commands(&self) -> &Arc<CommandTable> {
        &self.commands
    }
}

/// Forward connectivity transitions to the registry
async fn listen(
    supervisor: Arc<ConnectionSupervisor>,
    registry: Arc<WorkerRegistry>,
    mut events: broadcast::Receiver<ConnectionEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown.changed() => break,
        };

        match event {
            Ok(ConnectionEvent::Established) => registry.on_connection_established().await,
            Ok(ConnectionEvent::Lost) => registry.on_connection_lost().await,
            Err(RecvError::Lagged(missed)) => {
                // Only the latest state matters
                warn!("Missed {} connection event(s), resynchronizing", missed);
                if supervisor.health().is_up() {
                    registry.on_connection_established().await;
                } else {
                    registry.on_connection_lost().await;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!("Connection listener stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{Binding, ParameterSpec, TargetType};
    use crate::handler::{HandlerError, WorkerHandler};
    use crate::testing::{MockClientFactory, RecordedCall, sample_job};
    use flowlink_core::dto::job::{CompleteJob, FailJob};
    use serde_json::json;
    use std::time::Duration;

    fn config() -> BrokerConfig {
        let mut config = BrokerConfig::default();
        config.health_check_interval = Duration::from_millis(20);
        config
    }

    async fn eventually(what: &str, check: impl Fn() -> bool) {
        for _ in 0..250 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("timed out waiting for {}", what);
    }

    fn doubler() -> WorkerSpec {
        WorkerSpec::new(
            "calc",
            "double",
            WorkerHandler::blocking(|args| {
                let value: i64 = args.require("value")?;
                Ok(value * 2)
            }),
        )
        .job_type("charge")
        .output_variable("result")
        .parameter(ParameterSpec::new(
            "value",
            Binding::variable("value"),
            TargetType::Integer,
        ))
    }

    #[tokio::test]
    async fn test_build_rejects_duplicate_workers() {
        let factory = MockClientFactory::new();
        let result = WorkerRuntime::builder(config())
            .client_factory(Arc::new(factory))
            .worker(doubler())
            .worker(doubler())
            .build();
        assert!(result.is_err_and(|e| e.is_configuration_error()));
    }

    #[tokio::test]
    async fn test_jobs_flow_end_to_end() {
        let factory = MockClientFactory::new();
        let runtime = WorkerRuntime::builder(config())
            .client_factory(Arc::new(factory.clone()))
            .worker(doubler())
            .build()
            .unwrap();
        runtime.start();

        eventually("worker to open", || factory.live_subscriptions() == 1).await;
        assert!(runtime.health().is_up());

        let job = sample_job(json!({"value": 21}));
        let key = job.key;
        factory.push_job(job);
        let mut failing = sample_job(json!({}));
        failing.key = 99;
        factory.push_job(failing);

        eventually("both jobs reported", || factory.calls().len() == 2).await;
        let calls = factory.calls();
        let mut expected = flowlink_core::Variables::new();
        expected.insert("result".to_string(), json!(42));
        assert!(calls.contains(&RecordedCall::Complete(CompleteJob {
            job_key: key,
            variables: Some(expected),
        })));
        assert!(calls.iter().any(|call| matches!(
            call,
            RecordedCall::Fail(FailJob { job_key: 99, retries: 2, .. })
        )));

        runtime.shutdown().await;
        assert_eq!(factory.live_subscriptions(), 0);
        assert!(factory.last_client().unwrap().is_closed());
    }

    #[tokio::test]
    async fn test_connection_loss_and_recovery_reopens_workers() {
        let factory = MockClientFactory::new();
        let runtime = WorkerRuntime::builder(config())
            .client_factory(Arc::new(factory.clone()))
            .worker(doubler())
            .build()
            .unwrap();
        runtime.start();
        eventually("worker to open", || factory.live_subscriptions() == 1).await;
        let opened = factory.opened_subscriptions();
        let mut events = runtime.supervisor().subscribe();

        factory.script_topology(vec![Err("broker restarting".to_string())]);
        let wait = Duration::from_secs(5);
        let lost = tokio::time::timeout(wait, events.recv()).await.unwrap();
        assert_eq!(lost.unwrap(), ConnectionEvent::Lost);
        let established = tokio::time::timeout(wait, events.recv()).await.unwrap();
        assert_eq!(established.unwrap(), ConnectionEvent::Established);

        eventually("worker to reopen", || factory.opened_subscriptions() > opened).await;
        eventually("one live handle", || factory.live_subscriptions() == 1).await;

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_stopped_worker_stays_closed_after_reconnect() {
        let factory = MockClientFactory::new();
        let runtime = WorkerRuntime::builder(config())
            .client_factory(Arc::new(factory.clone()))
            .worker(doubler())
            .build()
            .unwrap();
        runtime.start();
        eventually("worker to open", || factory.live_subscriptions() == 1).await;

        runtime.registry().stop_worker("charge").await.unwrap();
        runtime.switch_connection(false).await;
        runtime.switch_connection(true).await;
        eventually("connection back", || runtime.health().is_up()).await;

        assert_eq!(runtime.registry().open_handles().await, 0);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_handler_error_variant_is_reported() {
        let factory = MockClientFactory::new();
        let spec = WorkerSpec::new(
            "billing",
            "charge",
            WorkerHandler::blocking(|_| Err::<(), _>(HandlerError::raised("Declined", "card declined"))),
        )
        .error_code("42", "Declined");
        let runtime = WorkerRuntime::builder(config())
            .client_factory(Arc::new(factory.clone()))
            .worker(spec)
            .build()
            .unwrap();
        runtime.start();
        eventually("worker to open", || factory.live_subscriptions() == 1).await;

        let mut job = sample_job(json!({}));
        job.job_type = "billing".to_string();
        factory.push_job(job);

        eventually("error reported", || !factory.calls().is_empty()).await;
        assert!(matches!(
            factory.calls().as_slice(),
            [RecordedCall::ThrowError(t)] if t.error_code == "42"
        ));
        runtime.shutdown().await;
    }
}
