//! Repository traits for flowdeck
//!
//! These traits are the boundary to the relational store. External crates
//! implement them to provide different persistence mechanisms.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::flow_definition::{FlowDefinition, FlowEmbed, FlowId, NewFlowEmbed};
use super::flow_execution::{ExecutionCompletion, ExecutionId, FlowExecution, NewFlowExecution};
use super::session::Session;
use crate::CoreError;

/// Repository for flow definitions
#[async_trait]
pub trait FlowDefinitionRepository: Send + Sync {
    /// Find a flow definition by ID
    async fn find_by_id(&self, id: &FlowId) -> Result<Option<FlowDefinition>, CoreError>;

    /// Insert or replace a flow definition
    async fn save(&self, definition: &FlowDefinition) -> Result<(), CoreError>;

    /// Stamp `last_executed_at` and bump `execution_count`
    async fn record_execution(&self, id: &FlowId, at: DateTime<Utc>) -> Result<(), CoreError>;

    /// Record an embed view
    async fn record_embed(&self, embed: NewFlowEmbed) -> Result<FlowEmbed, CoreError>;
}

/// Repository for flow execution records
#[async_trait]
pub trait FlowExecutionRepository: Send + Sync {
    /// The execution with the greatest `started_at` for a flow, ties going
    /// to the larger id
    async fn find_latest_for_flow(&self, flow_id: &FlowId) -> Result<Option<FlowExecution>, CoreError>;

    /// Full execution history for a flow, newest first
    async fn list_for_flow(&self, flow_id: &FlowId) -> Result<Vec<FlowExecution>, CoreError>;

    /// Insert a new execution row and return it with its assigned id
    async fn insert(&self, execution: NewFlowExecution) -> Result<FlowExecution, CoreError>;

    /// Apply a terminal update to an existing row
    async fn complete(
        &self,
        id: ExecutionId,
        completion: ExecutionCompletion,
    ) -> Result<FlowExecution, CoreError>;

    /// Health check
    async fn health_check(&self) -> Result<bool, CoreError> {
        Ok(true)
    }
}

/// Repository for resolving authenticated identities
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Resolve a session token, ignoring sessions expired at `now`
    async fn find_by_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Session>, CoreError>;

    /// Resolve an API key and record its use
    async fn find_by_api_key(&self, key: &str) -> Result<Option<Session>, CoreError>;
}
