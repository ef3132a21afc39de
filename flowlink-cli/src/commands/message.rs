//! Message commands

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use flowlink_core::dto::message::PublishMessage;
use flowlink_worker::CommandTable;
use flowlink_worker::config::parse_duration;

use super::parse_optional_variables;

/// Message subcommands
#[derive(Subcommand)]
pub enum MessageCommands {
    /// Publish a message for correlation
    Publish {
        /// Message name
        name: String,

        /// Correlation key
        #[arg(long)]
        correlation_key: String,

        /// Unique message id
        #[arg(long)]
        message_id: Option<String>,

        /// Time to live, e.g. `PT1H` (configured default when omitted)
        #[arg(long)]
        ttl: Option<String>,

        /// Message variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
    },
}

pub async fn handle_message_command(command: MessageCommands, table: &CommandTable) -> Result<()> {
    match command {
        MessageCommands::Publish {
            name,
            correlation_key,
            message_id,
            ttl,
            variables,
        } => {
            let request = PublishMessage {
                name,
                correlation_key,
                message_id,
                time_to_live: ttl.as_deref().map(parse_duration).transpose()?,
                variables: parse_optional_variables(variables.as_deref())?,
            };
            let name = request.name.clone();
            let key = table.publish_message(request).await?;
            println!("{} {} (key {})", "✓ Published".green(), name.bold(), key);
            Ok(())
        }
    }
}
