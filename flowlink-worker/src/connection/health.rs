//! Topology health evaluation

use flowlink_core::domain::health::{HealthDetails, HealthReport};
use flowlink_core::domain::topology::{PartitionBrokerHealth, Topology};
use std::collections::BTreeMap;
use tracing::{error, warn};

/// Judge cluster health from a topology snapshot
///
/// The cluster is down when it reports no brokers or when some partition has
/// no leader on any broker. Unhealthy partitions are only logged.
pub fn evaluate(topology: &Topology) -> HealthReport {
    if topology.brokers.is_empty() {
        return HealthReport::down_because("Broker topology has no nodes");
    }

    let degraded: Vec<String> = topology
        .brokers
        .iter()
        .filter(|b| {
            b.partitions
                .iter()
                .any(|p| p.health == PartitionBrokerHealth::Unhealthy)
        })
        .map(|b| format!("node-{} on {}", b.node_id, b.address()))
        .collect();
    if !degraded.is_empty() {
        warn!(
            "Brokers {} have unhealthy partitions",
            degraded.join("; ")
        );
    }

    let mut has_leader: BTreeMap<i32, bool> = BTreeMap::new();
    for partition in topology.brokers.iter().flat_map(|b| &b.partitions) {
        *has_leader.entry(partition.partition_id).or_default() |= partition.is_leader();
    }
    let leaderless: Vec<String> = has_leader
        .into_iter()
        .filter(|(_, leader)| !leader)
        .map(|(id, _)| id.to_string())
        .collect();

    if !leaderless.is_empty() {
        let partitions = leaderless.join(", ");
        error!(
            "Cluster is not consistent, partitions {} have no leader",
            partitions
        );
        return HealthReport::down(Some(HealthDetails::Topology {
            brokers: topology.brokers.clone(),
            info: Some(format!("Partitions {} have no leader", partitions)),
        }));
    }

    HealthReport::up(HealthDetails::Topology {
        brokers: topology.brokers.clone(),
        info: None,
    })
}
