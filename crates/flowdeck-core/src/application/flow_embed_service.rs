use std::sync::Arc;
use tracing::info;

use crate::{
    domain::flow_definition::{FlowDefinition, FlowId, NewFlowEmbed},
    domain::repository::FlowDefinitionRepository,
    CoreError,
};

/// Referrer recorded when the request carried none
pub const DIRECT_REFERRER: &str = "direct";

/// Service for serving embedded flow definitions
pub struct FlowEmbedService {
    definitions: Arc<dyn FlowDefinitionRepository>,
}

impl FlowEmbedService {
    /// Create a new flow embed service
    pub fn new(definitions: Arc<dyn FlowDefinitionRepository>) -> Self {
        Self { definitions }
    }

    /// Load a definition for embedding and record who opened it
    pub async fn open_embed(
        &self,
        flow_id: &FlowId,
        user_id: Option<&str>,
        referrer: Option<&str>,
    ) -> Result<FlowDefinition, CoreError> {
        let user_id = user_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoreError::ValidationError("userId required".to_string()))?;

        let definition = self
            .definitions
            .find_by_id(flow_id)
            .await?
            .ok_or_else(|| CoreError::FlowDefinitionNotFound(flow_id.0.clone()))?;

        let referrer = referrer
            .filter(|r| !r.is_empty())
            .unwrap_or(DIRECT_REFERRER)
            .to_string();

        let embed = self
            .definitions
            .record_embed(NewFlowEmbed {
                flow_id: flow_id.clone(),
                user_id: user_id.to_string(),
                referrer,
            })
            .await?;

        info!(%flow_id, user_id, referrer = %embed.referrer, "Flow embed opened");
        Ok(definition)
    }
}
