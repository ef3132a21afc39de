//! Variable commands

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use flowlink_core::dto::instance::SetVariables;
use flowlink_worker::{Command, CommandTable};

use super::parse_variables;

/// Variable subcommands
#[derive(Subcommand)]
pub enum VariablesCommands {
    /// Set variables on an element instance scope
    Set {
        /// Element or process instance key
        key: i64,

        /// Variables as a JSON object
        variables: String,

        /// Only set on the given scope, not propagated to parents
        #[arg(long)]
        local: bool,
    },
}

pub async fn handle_variables_command(command: VariablesCommands, table: &CommandTable) -> Result<()> {
    match command {
        VariablesCommands::Set {
            key,
            variables,
            local,
        } => {
            let variables = parse_variables(&variables)?;
            let count = variables.len();
            table
                .execute(Command::SetVariables(SetVariables {
                    element_instance_key: key,
                    variables,
                    local,
                }))
                .await?;
            println!("{} {} variable(s) on {}", "✓ Set".green(), count, key);
            Ok(())
        }
    }
}
