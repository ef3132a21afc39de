//! Broker commands
//!
//! A fixed set of command kinds, each carrying its typed request. The
//! [`CommandTable`] validates a command and routes it to the current broker
//! client.

mod table;

pub use table::CommandTable;

use flowlink_core::domain::deployment::DeploymentEvent;
use flowlink_core::domain::instance::{ProcessInstanceEvent, ProcessInstanceResult};
use flowlink_core::dto::deployment::DeployResources;
use flowlink_core::dto::instance::{
    CancelInstance, CreateInstance, CreateInstanceWithResult, ResolveIncident, SetVariables,
};
use flowlink_core::dto::job::{CompleteJob, FailJob, ThrowError, UpdateRetries};
use flowlink_core::dto::message::PublishMessage;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WorkerError};

/// Kind of a broker command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    AsyncCreateInstance,
    SyncCreateInstance,
    CancelInstance,
    PublishMessage,
    SetVariables,
    UpdateRetries,
    ResolveIncident,
    Complete,
    Fail,
    Error,
    Deploy,
}

impl CommandKind {
    pub const ALL: [CommandKind; 11] = [
        Self::AsyncCreateInstance,
        Self::SyncCreateInstance,
        Self::CancelInstance,
        Self::PublishMessage,
        Self::SetVariables,
        Self::UpdateRetries,
        Self::ResolveIncident,
        Self::Complete,
        Self::Fail,
        Self::Error,
        Self::Deploy,
    ];

    /// Name used in configuration
    pub fn name(&self) -> &'static str {
        match self {
            Self::AsyncCreateInstance => "async-create-instance",
            Self::SyncCreateInstance => "sync-create-instance",
            Self::CancelInstance => "cancel-instance",
            Self::PublishMessage => "publish-message",
            Self::SetVariables => "set-variables",
            Self::UpdateRetries => "update-retries",
            Self::ResolveIncident => "resolve-incident",
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Error => "error",
            Self::Deploy => "deploy",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandKind {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| WorkerError::Configuration(format!("unknown command '{}'", s)))
    }
}

/// A broker command with its request
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateInstance(CreateInstance),
    CreateInstanceWithResult(CreateInstanceWithResult),
    CancelInstance(CancelInstance),
    PublishMessage(PublishMessage),
    SetVariables(SetVariables),
    UpdateRetries(UpdateRetries),
    ResolveIncident(ResolveIncident),
    Complete(CompleteJob),
    Fail(FailJob),
    ThrowError(ThrowError),
    Deploy(DeployResources),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::CreateInstance(_) => CommandKind::AsyncCreateInstance,
            Self::CreateInstanceWithResult(_) => CommandKind::SyncCreateInstance,
            Self::CancelInstance(_) => CommandKind::CancelInstance,
            Self::PublishMessage(_) => CommandKind::PublishMessage,
            Self::SetVariables(_) => CommandKind::SetVariables,
            Self::UpdateRetries(_) => CommandKind::UpdateRetries,
            Self::ResolveIncident(_) => CommandKind::ResolveIncident,
            Self::Complete(_) => CommandKind::Complete,
            Self::Fail(_) => CommandKind::Fail,
            Self::ThrowError(_) => CommandKind::Error,
            Self::Deploy(_) => CommandKind::Deploy,
        }
    }

    /// Check the request before it is sent
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::CreateInstance(request) => non_empty("process id", &request.bpmn_process_id),
            Self::CreateInstanceWithResult(request) => {
                non_empty("process id", &request.instance.bpmn_process_id)
            }
            Self::CancelInstance(request) => {
                non_zero("process instance key", request.process_instance_key)
            }
            Self::PublishMessage(request) => {
                non_empty("message name", &request.name)?;
                non_empty("correlation key", &request.correlation_key)
            }
            Self::SetVariables(request) => {
                non_zero("element instance key", request.element_instance_key)
            }
            Self::UpdateRetries(request) => non_zero("job key", request.job_key),
            Self::ResolveIncident(request) => non_zero("incident key", request.incident_key),
            Self::Complete(request) => non_zero("job key", request.job_key),
            Self::Fail(request) => non_zero("job key", request.job_key),
            Self::ThrowError(request) => {
                non_zero("job key", request.job_key)?;
                non_empty("error code", &request.error_code)
            }
            Self::Deploy(request) => {
                if request.resources.is_empty() {
                    return Err(WorkerError::InvalidArgument(
                        "at least one resource is required to deploy".to_string(),
                    ));
                }
                request
                    .resources
                    .iter()
                    .try_for_each(|resource| non_empty("resource name", &resource.name))
            }
        }
    }
}

fn non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WorkerError::InvalidArgument(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(())
}

fn non_zero(what: &str, value: i64) -> Result<()> {
    if value == 0 {
        return Err(WorkerError::InvalidArgument(format!(
            "{} must not be zero",
            what
        )));
    }
    Ok(())
}

/// What a command returned
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    Instance(ProcessInstanceEvent),
    InstanceResult(ProcessInstanceResult),
    /// Record key of a published message
    MessageKey(i64),
    Deployment(DeploymentEvent),
    /// The command has no response body
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlink_core::dto::deployment::DeployResource;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in CommandKind::ALL {
            assert_eq!(kind.name().parse::<CommandKind>().unwrap(), kind);
        }
        assert_eq!("DEPLOY".parse::<CommandKind>().unwrap(), CommandKind::Deploy);
    }

    #[test]
    fn test_unknown_kind_is_configuration_error() {
        let err = "push-message".parse::<CommandKind>().unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_validation() {
        assert!(Command::Complete(CompleteJob::default()).validate().is_err());
        assert!(
            Command::Complete(CompleteJob {
                job_key: 7,
                variables: None
            })
            .validate()
            .is_ok()
        );
        assert!(
            Command::ThrowError(ThrowError {
                job_key: 7,
                error_code: String::new(),
                error_message: None
            })
            .validate()
            .is_err()
        );
        assert!(
            Command::PublishMessage(PublishMessage {
                name: "paid".to_string(),
                ..Default::default()
            })
            .validate()
            .is_err()
        );
        assert!(Command::CreateInstance(CreateInstance::latest(" ")).validate().is_err());
        assert!(Command::Deploy(DeployResources::default()).validate().is_err());
        assert!(
            Command::Deploy(DeployResources::single(DeployResource::from_string(
                "order.bpmn",
                "<definitions/>"
            )))
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn test_command_kinds() {
        let command = Command::ThrowError(ThrowError::default());
        assert_eq!(command.kind(), CommandKind::Error);
        assert_eq!(command.kind().to_string(), "error");
    }
}
