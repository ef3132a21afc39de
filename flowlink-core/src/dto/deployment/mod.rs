//! Deployment DTOs

use serde::{Deserialize, Serialize};

/// One resource (e.g. `order.bpmn`) to deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResource {
    pub name: String,
    pub content: Vec<u8>,
}

impl DeployResource {
    pub fn from_bytes(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn from_string(name: impl Into<String>, content: &str) -> Self {
        Self::from_bytes(name, content.as_bytes())
    }
}

/// Request to deploy a set of resources in one deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResources {
    pub resources: Vec<DeployResource>,
}

impl DeployResources {
    pub fn single(resource: DeployResource) -> Self {
        Self {
            resources: vec![resource],
        }
    }
}
