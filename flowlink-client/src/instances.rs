//! Process instance, message, variable and incident endpoints

use flowlink_core::domain::instance::{ProcessInstanceEvent, ProcessInstanceResult};
use flowlink_core::dto::instance::{
    CancelInstance, CreateInstance, CreateInstanceWithResult, ResolveIncident, SetVariables,
};
use flowlink_core::dto::message::PublishMessage;

use crate::wire::{
    CreateInstanceBody, CreateInstanceResponse, PublishMessageBody, PublishMessageResponse,
    SetVariablesBody, millis,
};
use crate::{GatewayClient, Result};

impl GatewayClient {
    // =============================================================================
    // Process Instances
    // =============================================================================

    /// Create a process instance
    ///
    /// A `version` of `None` starts the latest deployed version.
    pub async fn create_instance(&self, request: CreateInstance) -> Result<ProcessInstanceEvent> {
        let body = CreateInstanceBody {
            process_definition_id: &request.bpmn_process_id,
            process_definition_version: request.version,
            variables: request.variables.as_ref(),
            await_completion: false,
            fetch_variables: &[],
            request_timeout: None,
        };
        let response = self
            .send(self.client.post(self.url("/v2/process-instances")).json(&body))
            .await?;

        let created: CreateInstanceResponse = self.handle_response(response).await?;
        Ok(created.into())
    }

    /// Create a process instance and wait for it to complete
    ///
    /// # Returns
    /// The instance with the requested variables of its final state
    pub async fn create_instance_with_result(
        &self,
        request: CreateInstanceWithResult,
    ) -> Result<ProcessInstanceResult> {
        let body = CreateInstanceBody {
            process_definition_id: &request.instance.bpmn_process_id,
            process_definition_version: request.instance.version,
            variables: request.instance.variables.as_ref(),
            await_completion: true,
            fetch_variables: &request.fetch_variables,
            request_timeout: request.request_timeout.map(millis),
        };

        let mut http = self.client.post(self.url("/v2/process-instances")).json(&body);
        if let Some(timeout) = request.request_timeout {
            http = http.timeout(timeout);
        }
        let response = self.send(http).await?;

        let created: CreateInstanceResponse = self.handle_response(response).await?;
        Ok(created.into())
    }

    pub async fn cancel_instance(&self, request: CancelInstance) -> Result<()> {
        let response = self
            .send(
                self.client
                    .post(self.url(&format!(
                        "/v2/process-instances/{}/cancellation",
                        request.process_instance_key
                    )))
                    .json(&serde_json::json!({})),
            )
            .await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Messages
    // =============================================================================

    /// Publish a message correlated by name and correlation key
    ///
    /// # Returns
    /// The key assigned to the message
    pub async fn publish_message(&self, request: PublishMessage) -> Result<i64> {
        let body = PublishMessageBody {
            name: &request.name,
            correlation_key: &request.correlation_key,
            time_to_live: request.time_to_live.map(millis),
            message_id: request.message_id.as_deref(),
            variables: request.variables.as_ref(),
        };
        let response = self
            .send(
                self.client
                    .post(self.url("/v2/messages/publication"))
                    .json(&body),
            )
            .await?;

        let published: PublishMessageResponse = self.handle_response(response).await?;
        Ok(published.message_key)
    }

    // =============================================================================
    // Variables and Incidents
    // =============================================================================

    /// Set variables on an element instance scope
    pub async fn set_variables(&self, request: SetVariables) -> Result<()> {
        let body = SetVariablesBody {
            variables: &request.variables,
            local: request.local,
        };
        let response = self
            .send(
                self.client
                    .put(self.url(&format!(
                        "/v2/element-instances/{}/variables",
                        request.element_instance_key
                    )))
                    .json(&body),
            )
            .await?;

        self.handle_empty_response(response).await
    }

    pub async fn resolve_incident(&self, request: ResolveIncident) -> Result<()> {
        let response = self
            .send(self.client.post(self.url(&format!(
                "/v2/incidents/{}/resolution",
                request.incident_key
            ))))
            .await?;

        self.handle_empty_response(response).await
    }
}
