//! Topology and health display

use anyhow::Result;
use colored::*;
use flowlink_core::domain::health::{HealthDetails, HealthStatus};
use flowlink_core::domain::topology::{BrokerInfo, PartitionBrokerHealth, PartitionInfo};
use flowlink_worker::ConnectionSupervisor;

/// Print broker health and, when reachable, the broker list
pub async fn show_topology(supervisor: &ConnectionSupervisor) -> Result<()> {
    let report = supervisor.health();
    let status = match report.status {
        HealthStatus::Up => "UP".green().bold(),
        HealthStatus::Down => "DOWN".red().bold(),
    };
    println!(
        "{} {} ({})",
        "Broker health:".bold(),
        status,
        supervisor.config().gateway_url().dimmed()
    );

    match &report.details {
        Some(HealthDetails::Reason(reason)) => {
            println!("  {}", reason.yellow());
        }
        Some(HealthDetails::Topology { brokers, info }) => {
            if let Some(info) = info {
                println!("  {}", info.yellow());
            }
            println!();
            println!("{}", format!("Found {} broker(s):", brokers.len()).bold());
            for broker in brokers {
                print_broker(broker);
            }
        }
        None => println!("  {}", "No probe result".dimmed()),
    }

    Ok(())
}

fn print_broker(broker: &BrokerInfo) {
    println!(
        "  {} node-{} {} {}",
        "▸".cyan(),
        broker.node_id,
        broker.address(),
        broker.version.dimmed()
    );
    for partition in &broker.partitions {
        println!("    {}", describe_partition(partition));
    }
}

fn describe_partition(partition: &PartitionInfo) -> String {
    let role = if partition.is_leader() {
        "leader".green()
    } else {
        format!("{:?}", partition.role).to_lowercase().normal()
    };
    let health = match partition.health {
        PartitionBrokerHealth::Healthy => "healthy".green(),
        PartitionBrokerHealth::Unhealthy => "unhealthy".yellow(),
        PartitionBrokerHealth::Dead => "dead".red(),
    };
    format!("partition {:>3}  {:<10} {}", partition.partition_id, role, health)
}
