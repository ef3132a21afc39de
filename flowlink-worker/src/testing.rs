//! In-memory broker for tests

use async_trait::async_trait;
use flowlink_client::{
    BrokerClient, ClientError, JobHandler, JobSubscription, JobWorker, JobWorkerOptions,
};
use flowlink_core::domain::deployment::{DeploymentEvent, ProcessMetadata};
use flowlink_core::domain::instance::{ProcessInstanceEvent, ProcessInstanceResult};
use flowlink_core::domain::job::ActivatedJob;
use flowlink_core::domain::topology::{
    BrokerInfo, PartitionBrokerHealth, PartitionBrokerRole, PartitionInfo, Topology,
};
use flowlink_core::dto::deployment::DeployResources;
use flowlink_core::dto::instance::{
    CancelInstance, CreateInstance, CreateInstanceWithResult, ResolveIncident, SetVariables,
};
use flowlink_core::dto::job::{
    ActivateJobsRequest, CompleteJob, FailJob, ThrowError, UpdateRetries,
};
use flowlink_core::dto::message::PublishMessage;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::config::BrokerConfig;
use crate::connection::ClientFactory;
use crate::error::{Result, WorkerError};

/// Job of type `charge` with 3 retries and a `channel=web` header
pub fn sample_job(variables: Value) -> ActivatedJob {
    let Value::Object(variables) = variables else {
        panic!("job variables must be an object");
    };
    ActivatedJob {
        key: 2251799813685249,
        job_type: "charge".to_string(),
        process_instance_key: 2251799813685200,
        bpmn_process_id: "order-process".to_string(),
        process_definition_version: 1,
        process_definition_key: 2251799813685100,
        element_id: "charge-card".to_string(),
        element_instance_key: 2251799813685240,
        worker: "test-worker".to_string(),
        retries: 3,
        deadline: 1_760_000_000_000,
        custom_headers: HashMap::from([("channel".to_string(), "web".to_string())]),
        variables,
    }
}

fn partition(id: i32, role: PartitionBrokerRole) -> PartitionInfo {
    PartitionInfo {
        partition_id: id,
        role,
        health: PartitionBrokerHealth::Healthy,
    }
}

fn broker(node_id: i32, partitions: Vec<PartitionInfo>) -> BrokerInfo {
    BrokerInfo {
        node_id,
        host: format!("broker-{}", node_id),
        port: 26501,
        version: "8.5.0".to_string(),
        partitions,
    }
}

/// Two brokers, each leading one of partitions 1 and 2
pub fn healthy_topology() -> Topology {
    use PartitionBrokerRole::{Follower, Leader};
    Topology {
        brokers: vec![
            broker(0, vec![partition(1, Leader), partition(2, Follower)]),
            broker(1, vec![partition(1, Follower), partition(2, Leader)]),
        ],
        cluster_size: 2,
        partitions_count: 2,
        replication_factor: 2,
        gateway_version: "8.5.0".to_string(),
    }
}

/// Like [`healthy_topology`] but partition 2 has no leader
pub fn leaderless_topology() -> Topology {
    use PartitionBrokerRole::{Follower, Inactive, Leader};
    let mut topology = healthy_topology();
    topology.brokers = vec![
        broker(0, vec![partition(1, Leader), partition(2, Follower)]),
        broker(1, vec![partition(1, Follower), partition(2, Inactive)]),
    ];
    topology
}

/// A reporting or command call the mock received
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Complete(CompleteJob),
    Fail(FailJob),
    ThrowError(ThrowError),
    UpdateRetries(UpdateRetries),
    Deploy(DeployResources),
    CreateInstance(CreateInstance),
    CreateInstanceWithResult(CreateInstanceWithResult),
    CancelInstance(CancelInstance),
    PublishMessage(PublishMessage),
    SetVariables(SetVariables),
    ResolveIncident(ResolveIncident),
}

#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<RecordedCall>>,
    topology: Mutex<VecDeque<std::result::Result<Topology, String>>>,
    jobs: Mutex<VecDeque<ActivatedJob>>,
    fail_reporting: AtomicBool,
    live: AtomicUsize,
    opened: AtomicUsize,
}

/// Scripted broker client
///
/// Clones share the call log and scripts. Each client built by
/// [`MockClientFactory`] has its own closed flag.
#[derive(Clone, Default)]
pub struct MockBrokerClient {
    state: Arc<MockState>,
    closed: Arc<AtomicBool>,
}

impl MockBrokerClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn sharing(state: &Arc<MockState>) -> Self {
        Self {
            state: Arc::clone(state),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().clone()
    }

    /// Make complete, fail and throw-error calls fail
    pub fn fail_reporting(&self, fail: bool) {
        self.state.fail_reporting.store(fail, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> std::result::Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Unavailable("client is closed".to_string()));
        }
        Ok(())
    }

    fn record(&self, call: RecordedCall) -> std::result::Result<(), ClientError> {
        self.check_open()?;
        self.state.calls.lock().push(call);
        Ok(())
    }

    fn report(&self, call: RecordedCall) -> std::result::Result<(), ClientError> {
        if self.state.fail_reporting.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("reporting disabled".to_string()));
        }
        self.record(call)
    }
}

#[async_trait]
impl BrokerClient for MockBrokerClient {
    async fn topology(&self) -> flowlink_client::Result<Topology> {
        self.check_open()?;
        match self.state.topology.lock().pop_front() {
            Some(Ok(topology)) => Ok(topology),
            Some(Err(message)) => Err(ClientError::Unavailable(message)),
            None => Ok(healthy_topology()),
        }
    }

    async fn activate_jobs(
        &self,
        request: ActivateJobsRequest,
    ) -> flowlink_client::Result<Vec<ActivatedJob>> {
        self.check_open()?;
        let mut queue = self.state.jobs.lock();
        let mut activated = Vec::new();
        let mut remaining = VecDeque::new();
        while let Some(job) = queue.pop_front() {
            if job.job_type == request.job_type
                && activated.len() < request.max_jobs_to_activate as usize
            {
                activated.push(job);
            } else {
                remaining.push_back(job);
            }
        }
        *queue = remaining;
        Ok(activated)
    }

    async fn complete_job(&self, request: CompleteJob) -> flowlink_client::Result<()> {
        self.report(RecordedCall::Complete(request))
    }

    async fn fail_job(&self, request: FailJob) -> flowlink_client::Result<()> {
        self.report(RecordedCall::Fail(request))
    }

    async fn throw_error(&self, request: ThrowError) -> flowlink_client::Result<()> {
        self.report(RecordedCall::ThrowError(request))
    }

    async fn update_retries(&self, request: UpdateRetries) -> flowlink_client::Result<()> {
        self.record(RecordedCall::UpdateRetries(request))
    }

    async fn deploy_resources(
        &self,
        request: DeployResources,
    ) -> flowlink_client::Result<DeploymentEvent> {
        let processes = request
            .resources
            .iter()
            .enumerate()
            .map(|(i, resource)| ProcessMetadata {
                bpmn_process_id: resource.name.trim_end_matches(".bpmn").to_string(),
                version: 1,
                process_definition_key: 100 + i as i64,
                resource_name: resource.name.clone(),
            })
            .collect();
        self.record(RecordedCall::Deploy(request))?;
        Ok(DeploymentEvent { key: 1, processes })
    }

    async fn create_instance(
        &self,
        request: CreateInstance,
    ) -> flowlink_client::Result<ProcessInstanceEvent> {
        let event = ProcessInstanceEvent {
            process_definition_key: 100,
            bpmn_process_id: request.bpmn_process_id.clone(),
            version: request.version.unwrap_or(1),
            process_instance_key: 200,
        };
        self.record(RecordedCall::CreateInstance(request))?;
        Ok(event)
    }

    async fn create_instance_with_result(
        &self,
        request: CreateInstanceWithResult,
    ) -> flowlink_client::Result<ProcessInstanceResult> {
        let result = ProcessInstanceResult {
            process_definition_key: 100,
            bpmn_process_id: request.instance.bpmn_process_id.clone(),
            version: request.instance.version.unwrap_or(1),
            process_instance_key: 200,
            variables: request.instance.variables.clone().unwrap_or_default(),
        };
        self.record(RecordedCall::CreateInstanceWithResult(request))?;
        Ok(result)
    }

    async fn cancel_instance(&self, request: CancelInstance) -> flowlink_client::Result<()> {
        self.record(RecordedCall::CancelInstance(request))
    }

    async fn publish_message(&self, request: PublishMessage) -> flowlink_client::Result<i64> {
        self.record(RecordedCall::PublishMessage(request))?;
        Ok(300)
    }

    async fn set_variables(&self, request: SetVariables) -> flowlink_client::Result<()> {
        self.record(RecordedCall::SetVariables(request))
    }

    async fn resolve_incident(&self, request: ResolveIncident) -> flowlink_client::Result<()> {
        self.record(RecordedCall::ResolveIncident(request))
    }

    fn open_worker(
        &self,
        options: JobWorkerOptions,
        handler: Arc<dyn JobHandler>,
    ) -> flowlink_client::Result<Box<dyn JobSubscription>> {
        self.check_open()?;
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        self.state.live.fetch_add(1, Ordering::SeqCst);
        let worker = JobWorker::open(Arc::new(self.clone()), options, handler);
        Ok(Box::new(MockSubscription {
            worker,
            open: AtomicBool::new(true),
            state: Arc::clone(&self.state),
        }))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Real poll loop that also tracks how many subscriptions are live
struct MockSubscription {
    worker: JobWorker,
    open: AtomicBool,
    state: Arc<MockState>,
}

impl JobSubscription for MockSubscription {
    fn job_type(&self) -> &str {
        self.worker.job_type()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && self.worker.is_open()
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.state.live.fetch_sub(1, Ordering::SeqCst);
        }
        self.worker.close();
    }
}

impl Drop for MockSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Builds [`MockBrokerClient`]s that share one call log and script
#[derive(Clone, Default)]
pub struct MockClientFactory {
    state: Arc<MockState>,
    failures: Arc<AtomicUsize>,
    builds: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<MockBrokerClient>>>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue topology results; once drained, probes see a healthy cluster
    pub fn script_topology(&self, results: Vec<std::result::Result<Topology, String>>) {
        self.state.topology.lock().extend(results);
    }

    /// Make the next `count` builds fail
    pub fn fail_builds(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Queue a job for activation
    pub fn push_job(&self, job: ActivatedJob) {
        self.state.jobs.lock().push_back(job);
    }

    /// Number of successful builds
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn last_client(&self) -> Option<MockBrokerClient> {
        self.last.lock().clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().clone()
    }

    pub fn live_subscriptions(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    pub fn opened_subscriptions(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }
}

impl ClientFactory for MockClientFactory {
    fn create(&self, _config: &BrokerConfig) -> Result<Arc<dyn BrokerClient>> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(WorkerError::Configuration("scripted build failure".to_string()));
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        let client = MockBrokerClient::sharing(&self.state);
        *self.last.lock() = Some(client.clone());
        Ok(Arc::new(client))
    }
}
