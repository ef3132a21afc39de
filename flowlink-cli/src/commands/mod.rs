//! Commands module
//!
//! Defines all CLI commands and their handlers. Every command connects
//! through a [`ConnectionSupervisor`] and is sent via the [`CommandTable`],
//! so validation and exclusions match what workers see.

mod cluster;
mod deploy;
mod incident;
mod instance;
mod job;
mod message;
mod variables;

pub use incident::IncidentCommands;
pub use instance::InstanceCommands;
pub use job::JobCommands;
pub use message::MessageCommands;
pub use variables::VariablesCommands;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use flowlink_core::Variables;
use flowlink_core::domain::health::HealthDetails;
use flowlink_worker::connection::{ConnectionSupervisor, GatewayClientFactory};
use flowlink_worker::CommandTable;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show cluster topology and health
    Topology,
    /// Deploy process resources
    Deploy {
        /// Resource files (e.g. order.bpmn)
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Process instance management
    Instance {
        #[command(subcommand)]
        command: InstanceCommands,
    },
    /// Message publication
    Message {
        #[command(subcommand)]
        command: MessageCommands,
    },
    /// Process variables
    Variables {
        #[command(subcommand)]
        command: VariablesCommands,
    },
    /// Job reporting
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Incident management
    Incident {
        #[command(subcommand)]
        command: IncidentCommands,
    },
}

/// Handle top-level commands
///
/// Probes the broker once; commands other than `topology` need it healthy.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let broker = config.broker_config()?;
    debug!("Connecting to {}", broker.gateway_url());
    let supervisor = Arc::new(ConnectionSupervisor::new(
        broker,
        Arc::new(GatewayClientFactory),
    ));
    supervisor.probe_health().await;

    let result = run(command, &supervisor).await;
    supervisor.close().await;
    result
}

async fn run(command: Commands, supervisor: &Arc<ConnectionSupervisor>) -> Result<()> {
    if let Commands::Topology = command {
        return cluster::show_topology(supervisor).await;
    }

    let health = supervisor.health();
    if !health.is_up() {
        bail!(
            "Broker at {} is unavailable: {}",
            supervisor.config().gateway_url(),
            describe_down(&health.details)
        );
    }

    let table = CommandTable::new(Arc::clone(supervisor));
    match command {
        Commands::Topology => Ok(()),
        Commands::Deploy { files } => deploy::deploy_files(&table, &files).await,
        Commands::Instance { command } => instance::handle_instance_command(command, &table).await,
        Commands::Message { command } => message::handle_message_command(command, &table).await,
        Commands::Variables { command } => {
            variables::handle_variables_command(command, &table).await
        }
        Commands::Job { command } => job::handle_job_command(command, &table).await,
        Commands::Incident { command } => incident::handle_incident_command(command, &table).await,
    }
}

/// Reason text for a DOWN health report
fn describe_down(details: &Option<HealthDetails>) -> String {
    match details {
        Some(HealthDetails::Reason(reason)) => reason.clone(),
        Some(HealthDetails::Topology {
            info: Some(info), ..
        }) => info.clone(),
        Some(HealthDetails::Topology { info: None, .. }) | None => "no healthy topology".to_string(),
    }
}

/// Parse a JSON object argument into variables
pub fn parse_variables(input: &str) -> Result<Variables> {
    let value: Value =
        serde_json::from_str(input).with_context(|| format!("Invalid JSON: {}", input))?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("Variables must be a JSON object, got {}", other),
    }
}

/// Parse an optional JSON object argument
pub fn parse_optional_variables(input: Option<&str>) -> Result<Option<Variables>> {
    input.map(parse_variables).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variables() {
        let variables = parse_variables(r#"{"amount": 10, "currency": "EUR"}"#).unwrap();
        assert_eq!(variables.len(), 2);
        assert_eq!(variables["amount"], 10);

        assert!(parse_variables("[1, 2]").is_err());
        assert!(parse_variables("{oops").is_err());
        assert_eq!(parse_optional_variables(None).unwrap(), None);
    }

    #[test]
    fn test_describe_down() {
        assert_eq!(
            describe_down(&Some(HealthDetails::Reason("timed out".to_string()))),
            "timed out"
        );
        assert_eq!(describe_down(&None), "no healthy topology");
    }
}
