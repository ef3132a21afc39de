//! Job command handlers
//!
//! Completes, fails or raises business errors for jobs activated
//! elsewhere, for example by a worker with auto-complete disabled.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use flowlink_core::dto::job::{CompleteJob, FailJob, ThrowError, UpdateRetries};
use flowlink_worker::{Command, CommandTable};

use super::parse_optional_variables;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Complete a job
    Complete {
        /// Job key
        key: i64,

        /// Output variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
    },
    /// Fail a job
    Fail {
        /// Job key
        key: i64,

        /// Remaining retries; an incident is raised at zero
        #[arg(long)]
        retries: i32,

        /// Failure message
        #[arg(long)]
        message: Option<String>,
    },
    /// Report a business error for a job
    Error {
        /// Job key
        key: i64,

        /// Error code caught by a BPMN error event
        #[arg(long)]
        code: String,

        /// Error message
        #[arg(long)]
        message: Option<String>,
    },
    /// Update the retries of a job
    Retries {
        /// Job key
        key: i64,

        /// New retry count
        retries: i32,
    },
}

/// Handle job commands
pub async fn handle_job_command(command: JobCommands, table: &CommandTable) -> Result<()> {
    let (command, done) = match command {
        JobCommands::Complete { key, variables } => (
            Command::Complete(CompleteJob {
                job_key: key,
                variables: parse_optional_variables(variables.as_deref())?,
            }),
            format!("{} job {}", "✓ Completed".green(), key),
        ),
        JobCommands::Fail {
            key,
            retries,
            message,
        } => (
            Command::Fail(FailJob {
                job_key: key,
                retries,
                error_message: message,
            }),
            format!("{} job {} ({} retries left)", "✓ Failed".yellow(), key, retries),
        ),
        JobCommands::Error { key, code, message } => (
            Command::ThrowError(ThrowError {
                job_key: key,
                error_code: code.clone(),
                error_message: message,
            }),
            format!("{} '{}' for job {}", "✓ Raised error".yellow(), code, key),
        ),
        JobCommands::Retries { key, retries } => (
            Command::UpdateRetries(UpdateRetries {
                job_key: key,
                retries,
            }),
            format!("{} job {} to {} retries", "✓ Updated".green(), key, retries),
        ),
    };

    table.execute(command).await?;
    println!("{}", done);
    Ok(())
}
