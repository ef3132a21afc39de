//! Process instance commands

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use flowlink_core::dto::instance::{CancelInstance, CreateInstance, CreateInstanceWithResult};
use flowlink_worker::config::parse_duration;
use flowlink_worker::{Command, CommandTable};

use super::parse_optional_variables;

/// Instance subcommands
#[derive(Subcommand)]
pub enum InstanceCommands {
    /// Start a process instance
    Create {
        /// BPMN process id
        process_id: String,

        /// Process version (latest when omitted)
        #[arg(long)]
        version: Option<i32>,

        /// Initial variables as a JSON object
        #[arg(long)]
        variables: Option<String>,

        /// Wait for the instance to complete and print its variables
        #[arg(long)]
        wait: bool,

        /// Result variables to fetch when waiting
        #[arg(long = "fetch", value_delimiter = ',')]
        fetch_variables: Vec<String>,

        /// How long to wait for the result, e.g. `30s`
        #[arg(long)]
        wait_timeout: Option<String>,
    },
    /// Cancel a running process instance
    Cancel {
        /// Process instance key
        key: i64,
    },
}

pub async fn handle_instance_command(command: InstanceCommands, table: &CommandTable) -> Result<()> {
    match command {
        InstanceCommands::Create {
            process_id,
            version,
            variables,
            wait,
            fetch_variables,
            wait_timeout,
        } => {
            let instance = CreateInstance {
                bpmn_process_id: process_id,
                version,
                variables: parse_optional_variables(variables.as_deref())?,
            };
            if wait {
                let request_timeout = wait_timeout.as_deref().map(parse_duration).transpose()?;
                create_and_wait(
                    table,
                    CreateInstanceWithResult {
                        instance,
                        fetch_variables,
                        request_timeout,
                    },
                )
                .await
            } else {
                create(table, instance).await
            }
        }
        InstanceCommands::Cancel { key } => {
            table
                .execute(Command::CancelInstance(CancelInstance {
                    process_instance_key: key,
                }))
                .await?;
            println!("{} instance {}", "✓ Cancelled".green(), key);
            Ok(())
        }
    }
}

async fn create(table: &CommandTable, request: CreateInstance) -> Result<()> {
    let event = table.create_instance(request).await?;
    println!(
        "{} {} version {}",
        "✓ Started".green(),
        event.bpmn_process_id.bold(),
        event.version
    );
    println!("  Instance key:   {}", event.process_instance_key);
    println!("  Definition key: {}", event.process_definition_key.to_string().dimmed());
    Ok(())
}

async fn create_and_wait(table: &CommandTable, request: CreateInstanceWithResult) -> Result<()> {
    let result = table.create_instance_with_result(request).await?;
    println!(
        "{} {} instance {}",
        "✓ Completed".green(),
        result.bpmn_process_id.bold(),
        result.process_instance_key
    );
    println!("{}", serde_json::to_string_pretty(&result.variables)?);
    Ok(())
}
