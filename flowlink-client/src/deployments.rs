//! Deployment endpoint

use flowlink_core::domain::deployment::DeploymentEvent;
use flowlink_core::dto::deployment::DeployResources;
use reqwest::multipart::{Form, Part};

use crate::wire::DeploymentResponse;
use crate::{ClientError, GatewayClient, Result};

impl GatewayClient {
    /// Deploy one or more resources in a single deployment
    ///
    /// # Returns
    /// The deployment key and the processes it contained
    pub async fn deploy_resources(&self, request: DeployResources) -> Result<DeploymentEvent> {
        if request.resources.is_empty() {
            return Err(ClientError::InvalidRequest(
                "at least one resource is required".to_string(),
            ));
        }

        let mut form = Form::new();
        for resource in request.resources {
            let part = Part::bytes(resource.content)
                .file_name(resource.name)
                .mime_str("application/octet-stream")?;
            form = form.part("resources", part);
        }

        let response = self
            .send(self.client.post(self.url("/v2/deployments")).multipart(form))
            .await?;

        let deployed: DeploymentResponse = self.handle_response(response).await?;
        Ok(deployed.into())
    }
}
