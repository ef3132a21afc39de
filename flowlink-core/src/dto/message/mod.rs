//! Message DTOs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Variables;

/// Request to publish a message for correlation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishMessage {
    pub name: String,
    pub correlation_key: String,
    /// Unique id used by the broker to deduplicate messages
    pub message_id: Option<String>,
    /// Buffering time; `None` uses the client default
    pub time_to_live: Option<Duration>,
    pub variables: Option<Variables>,
}
