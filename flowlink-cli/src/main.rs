//! Flowlink CLI
//!
//! Command-line interface for issuing commands to a workflow broker gateway.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "flowlink_worker=info,flowlink_cli=info";

#[derive(Parser)]
#[command(name = "flowlink")]
#[command(about = "Workflow broker command-line client", long_about = None)]
struct Cli {
    /// Gateway address
    #[arg(
        long,
        env = "FLOWLINK_GATEWAY_ADDRESS",
        default_value = "http://localhost:8080"
    )]
    gateway: String,

    /// Request timeout, e.g. `20s` or `PT1M`
    #[arg(long, default_value = "20s")]
    timeout: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.gateway, &cli.timeout)?;

    handle_command(cli.command, &config).await
}
