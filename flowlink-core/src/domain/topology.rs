//! Cluster topology domain types

use serde::{Deserialize, Serialize};

/// Topology of the broker cluster as reported by the gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    pub brokers: Vec<BrokerInfo>,
    #[serde(default)]
    pub cluster_size: i32,
    #[serde(default)]
    pub partitions_count: i32,
    #[serde(default)]
    pub replication_factor: i32,
    #[serde(default)]
    pub gateway_version: String,
}

/// One broker node and the partitions it takes part in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerInfo {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub partitions: Vec<PartitionInfo>,
}

impl BrokerInfo {
    /// Address in `host:port` form
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-partition view of one broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    pub partition_id: i32,
    pub role: PartitionBrokerRole,
    pub health: PartitionBrokerHealth,
}

impl PartitionInfo {
    pub fn is_leader(&self) -> bool {
        self.role == PartitionBrokerRole::Leader
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionBrokerRole {
    Leader,
    Follower,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionBrokerHealth {
    Healthy,
    Unhealthy,
    Dead,
}
