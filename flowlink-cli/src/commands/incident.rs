//! Incident commands

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use flowlink_core::dto::instance::ResolveIncident;
use flowlink_worker::{Command, CommandTable};

/// Incident subcommands
#[derive(Subcommand)]
pub enum IncidentCommands {
    /// Mark an incident as resolved
    Resolve {
        /// Incident key
        key: i64,
    },
}

pub async fn handle_incident_command(command: IncidentCommands, table: &CommandTable) -> Result<()> {
    match command {
        IncidentCommands::Resolve { key } => {
            table
                .execute(Command::ResolveIncident(ResolveIncident { incident_key: key }))
                .await?;
            println!("{} incident {}", "✓ Resolved".green(), key);
            Ok(())
        }
    }
}
