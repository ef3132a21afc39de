//! Resource deployment

use anyhow::{Context, Result};
use colored::*;
use flowlink_worker::CommandTable;

/// Deploy each file in turn, stopping at the first failure
pub async fn deploy_files(table: &CommandTable, files: &[String]) -> Result<()> {
    for file in files {
        let event = table
            .deploy_file(file)
            .await
            .with_context(|| format!("Failed to deploy {}", file))?;

        println!(
            "{} {} (deployment {})",
            "✓ Deployed".green(),
            file,
            event.key.to_string().dimmed()
        );
        for process in &event.processes {
            println!(
                "    {} version {} (key {})",
                process.bpmn_process_id.bold(),
                process.version,
                process.process_definition_key
            );
        }
    }
    Ok(())
}
