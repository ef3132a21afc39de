//! Cluster topology endpoint

use flowlink_core::domain::topology::Topology;

use crate::{GatewayClient, Result};

impl GatewayClient {
    /// Fetch the cluster topology
    ///
    /// # Returns
    /// Brokers known to the gateway with the partitions each one hosts
    pub async fn topology(&self) -> Result<Topology> {
        let response = self
            .send(self.client.get(self.url("/v2/topology")))
            .await?;

        self.handle_response(response).await
    }
}
