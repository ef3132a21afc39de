//! Connection health domain types

use serde::{Deserialize, Serialize};

use super::topology::BrokerInfo;

/// Name under which broker health is reported
pub const HEALTH_NAME: &str = "broker";

/// Perceived reachability of the broker cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Diagnostic detail attached to a health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HealthDetails {
    /// Failure reason when no topology could be obtained
    Reason(String),
    /// Topology snapshot, with an explanation when the cluster is degraded
    Topology {
        brokers: Vec<BrokerInfo>,
        #[serde(skip_serializing_if = "Option::is_none")]
        info: Option<String>,
    },
}

/// Health snapshot suitable for embedding in a health-check response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

impl HealthReport {
    pub fn up(details: HealthDetails) -> Self {
        Self {
            name: HEALTH_NAME.to_string(),
            status: HealthStatus::Up,
            details: Some(details),
        }
    }

    pub fn down(details: Option<HealthDetails>) -> Self {
        Self {
            name: HEALTH_NAME.to_string(),
            status: HealthStatus::Down,
            details,
        }
    }

    /// Down report carrying a failure reason
    pub fn down_because(reason: impl Into<String>) -> Self {
        Self::down(Some(HealthDetails::Reason(reason.into())))
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

impl Default for HealthReport {
    fn default() -> Self {
        Self::down(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_down() {
        let report = HealthReport::default();
        assert!(!report.is_up());
        assert_eq!(report.name, HEALTH_NAME);
    }

    #[test]
    fn test_serialized_shape() {
        let report = HealthReport::down_because("Broker connection lost");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "DOWN");
        assert_eq!(value["details"], "Broker connection lost");

        let report = HealthReport::up(HealthDetails::Topology {
            brokers: vec![],
            info: None,
        });
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "UP");
        assert!(value["details"]["brokers"].is_array());
        assert!(value["details"].get("info").is_none());
    }
}
