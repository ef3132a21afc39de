//! Error types for the worker runtime

use thiserror::Error;

use crate::command::CommandKind;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Errors surfaced to callers of the runtime
///
/// Failures of user handlers are not represented here; they travel as
/// [`HandlerError`](crate::handler::HandlerError) and end up reported to
/// the broker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A worker for this job type is already registered
    #[error("Worker for job type '{0}' is already registered")]
    DuplicateWorker(String),

    /// A duration string could not be parsed
    #[error("Invalid duration '{0}'")]
    InvalidDuration(String),

    /// No worker is registered for this job type
    #[error("Unknown worker '{0}'")]
    UnknownWorker(String),

    /// No broker client is currently available
    #[error("Broker is unavailable")]
    BrokerUnavailable,

    /// The command was excluded by configuration
    #[error("Command '{}' is disabled", .0.name())]
    CommandDisabled(CommandKind),

    /// A command argument failed validation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The broker rejected or failed a request
    #[error(transparent)]
    Client(#[from] flowlink_client::ClientError),

    /// Result variables did not match the requested type
    #[error("Failed to map result: {0}")]
    Mapping(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Check if this error came from registration or configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::DuplicateWorker(_) | Self::InvalidDuration(_)
        )
    }
}
