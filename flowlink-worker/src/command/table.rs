//! Command table
//!
//! Checks exclusions and validates each command before sending it on the
//! supervisor's current client. Typed helpers unwrap the matching output.

use flowlink_client::BrokerClient;
use flowlink_core::domain::deployment::DeploymentEvent;
use flowlink_core::domain::instance::{ProcessInstanceEvent, ProcessInstanceResult};
use flowlink_core::dto::deployment::{DeployResource, DeployResources};
use flowlink_core::dto::instance::{CreateInstance, CreateInstanceWithResult};
use flowlink_core::dto::message::PublishMessage;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{Command, CommandKind, CommandOutput};
use crate::connection::ConnectionSupervisor;
use crate::error::{Result, WorkerError};

/// Routes commands to the current broker client
pub struct CommandTable {
    supervisor: Arc<ConnectionSupervisor>,
    disabled: BTreeSet<CommandKind>,
    message_ttl: Duration,
}

impl CommandTable {
    /// Build a table honouring the supervisor's command exclusions
    pub fn new(supervisor: Arc<ConnectionSupervisor>) -> Self {
        let config = supervisor.config();
        let disabled = config.command_exclude.iter().copied().collect();
        let message_ttl = config.default_message_ttl;
        Self {
            supervisor,
            disabled,
            message_ttl,
        }
    }

    pub fn is_enabled(&self, kind: CommandKind) -> bool {
        !self.disabled.contains(&kind)
    }

    /// Validate and send one command
    ///
    /// Fails with `CommandDisabled` for excluded kinds, `InvalidArgument` for
    /// a bad request and `BrokerUnavailable` while no client exists. None of
    /// these reach the broker.
    pub async fn execute(&self, command: Command) -> Result<CommandOutput> {
        let kind = command.kind();
        if !self.is_enabled(kind) {
            return Err(WorkerError::CommandDisabled(kind));
        }
        command.validate()?;
        let client = self.client()?;
        debug!("Executing {} command", kind);

        let output = match command {
            Command::CreateInstance(request) => {
                CommandOutput::Instance(client.create_instance(normalize_instance(request)).await?)
            }
            Command::CreateInstanceWithResult(mut request) => {
                request.instance = normalize_instance(request.instance);
                CommandOutput::InstanceResult(client.create_instance_with_result(request).await?)
            }
            Command::CancelInstance(request) => {
                client.cancel_instance(request).await?;
                CommandOutput::Done
            }
            Command::PublishMessage(request) => {
                CommandOutput::MessageKey(client.publish_message(self.normalize_message(request)).await?)
            }
            Command::SetVariables(request) => {
                client.set_variables(request).await?;
                CommandOutput::Done
            }
            Command::UpdateRetries(request) => {
                client.update_retries(request).await?;
                CommandOutput::Done
            }
            Command::ResolveIncident(request) => {
                client.resolve_incident(request).await?;
                CommandOutput::Done
            }
            Command::Complete(mut request) => {
                request.variables = request.variables.filter(|v| !v.is_empty());
                client.complete_job(request).await?;
                CommandOutput::Done
            }
            Command::Fail(request) => {
                client.fail_job(request).await?;
                CommandOutput::Done
            }
            Command::ThrowError(request) => {
                client.throw_error(request).await?;
                CommandOutput::Done
            }
            Command::Deploy(request) => CommandOutput::Deployment(client.deploy_resources(request).await?),
        };
        Ok(output)
    }

    /// Start an instance without waiting for it to finish
    pub async fn create_instance(&self, request: CreateInstance) -> Result<ProcessInstanceEvent> {
        match self.execute(Command::CreateInstance(request)).await? {
            CommandOutput::Instance(event) => Ok(event),
            other => Err(unexpected(CommandKind::AsyncCreateInstance, &other)),
        }
    }

    /// Start an instance and wait for its result
    pub async fn create_instance_with_result(
        &self,
        request: CreateInstanceWithResult,
    ) -> Result<ProcessInstanceResult> {
        match self.execute(Command::CreateInstanceWithResult(request)).await? {
            CommandOutput::InstanceResult(result) => Ok(result),
            other => Err(unexpected(CommandKind::SyncCreateInstance, &other)),
        }
    }

    /// Start an instance and map its result variables into `T`
    pub async fn create_instance_with_result_as<T: DeserializeOwned>(
        &self,
        request: CreateInstanceWithResult,
    ) -> Result<T> {
        let result = self.create_instance_with_result(request).await?;
        Ok(serde_json::from_value(Value::Object(result.variables))?)
    }

    /// Publish a message, returning its record key
    pub async fn publish_message(&self, request: PublishMessage) -> Result<i64> {
        match self.execute(Command::PublishMessage(request)).await? {
            CommandOutput::MessageKey(key) => Ok(key),
            other => Err(unexpected(CommandKind::PublishMessage, &other)),
        }
    }

    pub async fn deploy(&self, resources: DeployResources) -> Result<DeploymentEvent> {
        match self.execute(Command::Deploy(resources)).await? {
            CommandOutput::Deployment(event) => Ok(event),
            other => Err(unexpected(CommandKind::Deploy, &other)),
        }
    }

    /// Deploy a file, named after its file name
    pub async fn deploy_file(&self, path: impl AsRef<Path>) -> Result<DeploymentEvent> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                WorkerError::InvalidArgument(format!("'{}' has no file name", path.display()))
            })?
            .to_string();
        let content = tokio::fs::read(path).await?;
        self.deploy(DeployResources::single(DeployResource::from_bytes(name, content)))
            .await
    }

    fn client(&self) -> Result<Arc<dyn BrokerClient>> {
        self.supervisor
            .client()
            .ok_or(WorkerError::BrokerUnavailable)
    }

    fn normalize_message(&self, mut request: PublishMessage) -> PublishMessage {
        request.time_to_live = request.time_to_live.or(Some(self.message_ttl));
        request.message_id = request.message_id.filter(|id| !id.is_empty());
        request.variables = request.variables.filter(|v| !v.is_empty());
        request
    }
}

/// Version 0 means latest; empty variable maps are not sent
fn normalize_instance(mut request: CreateInstance) -> CreateInstance {
    request.version = request.version.filter(|v| *v != 0);
    request.variables = request.variables.filter(|v| !v.is_empty());
    request
}

fn unexpected(kind: CommandKind, output: &CommandOutput) -> WorkerError {
    WorkerError::InvalidArgument(format!(
        "{} command returned unexpected output {:?}",
        kind, output
    ))
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTable")
            .field("disabled", &self.disabled)
            .field("message_ttl", &self.message_ttl)
            .finish()
    }
}
