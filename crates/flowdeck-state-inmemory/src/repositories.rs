use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use flowdeck_core::{
    CoreError, ExecutionCompletion, ExecutionId, FlowDefinition, FlowDefinitionRepository,
    FlowEmbed, FlowExecution, FlowExecutionRepository, FlowId, NewFlowEmbed, NewFlowExecution,
    Session, SessionRepository,
};

/// Stored session with its expiry
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session: Session,
    pub expires_at: DateTime<Utc>,
}

/// Stored API key
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub session: Session,
    pub last_used: Option<DateTime<Utc>>,
}

/// In-memory implementation of the FlowDefinitionRepository
pub struct InMemoryFlowDefinitionRepository {
    definitions: Arc<RwLock<HashMap<String, FlowDefinition>>>,
    embeds: Arc<RwLock<Vec<FlowEmbed>>>,
    next_embed_id: AtomicI64,
}

impl InMemoryFlowDefinitionRepository {
    /// Create a new in-memory flow definition repository
    pub fn new(
        definitions: Arc<RwLock<HashMap<String, FlowDefinition>>>,
        embeds: Arc<RwLock<Vec<FlowEmbed>>>,
    ) -> Self {
        Self {
            definitions,
            embeds,
            next_embed_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl FlowDefinitionRepository for InMemoryFlowDefinitionRepository {
    async fn find_by_id(&self, id: &FlowId) -> Result<Option<FlowDefinition>, CoreError> {
        let definitions = self.definitions.read().await;
        Ok(definitions.get(&id.0).cloned())
    }

    async fn save(&self, definition: &FlowDefinition) -> Result<(), CoreError> {
        let mut definitions = self.definitions.write().await;
        definitions.insert(definition.id.0.clone(), definition.clone());
        Ok(())
    }

    async fn record_execution(&self, id: &FlowId, at: DateTime<Utc>) -> Result<(), CoreError> {
        let mut definitions = self.definitions.write().await;
        let definition = definitions
            .get_mut(&id.0)
            .ok_or_else(|| CoreError::FlowDefinitionNotFound(id.0.clone()))?;

        definition.last_executed_at = Some(at);
        definition.execution_count += 1;
        Ok(())
    }

    async fn record_embed(&self, embed: NewFlowEmbed) -> Result<FlowEmbed, CoreError> {
        let embed = FlowEmbed {
            id: self.next_embed_id.fetch_add(1, Ordering::SeqCst),
            flow_id: embed.flow_id,
            user_id: embed.user_id,
            referrer: embed.referrer,
            created_at: Utc::now(),
        };

        self.embeds.write().await.push(embed.clone());
        Ok(embed)
    }
}

/// In-memory implementation of the FlowExecutionRepository
pub struct InMemoryFlowExecutionRepository {
    executions: Arc<RwLock<Vec<FlowExecution>>>,
    next_id: AtomicI64,
}

impl InMemoryFlowExecutionRepository {
    /// Create a new in-memory flow execution repository
    pub fn new(executions: Arc<RwLock<Vec<FlowExecution>>>) -> Self {
        Self {
            executions,
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl FlowExecutionRepository for InMemoryFlowExecutionRepository {
    async fn find_latest_for_flow(&self, flow_id: &FlowId) -> Result<Option<FlowExecution>, CoreError> {
        let executions = self.executions.read().await;

        Ok(executions
            .iter()
            .filter(|execution| execution.flow_id == *flow_id)
            .max_by_key(|execution| (execution.started_at, execution.id))
            .cloned())
    }

    async fn list_for_flow(&self, flow_id: &FlowId) -> Result<Vec<FlowExecution>, CoreError> {
        let executions = self.executions.read().await;

        let mut matching: Vec<FlowExecution> = executions
            .iter()
            .filter(|execution| execution.flow_id == *flow_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.started_at, b.id).cmp(&(a.started_at, a.id)));

        Ok(matching)
    }

    async fn insert(&self, execution: NewFlowExecution) -> Result<FlowExecution, CoreError> {
        let execution = FlowExecution {
            id: ExecutionId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            flow_id: execution.flow_id,
            status: execution.status,
            started_at: execution.started_at,
            completed_at: None,
            error: None,
            logs: None,
            triggered_by: execution.triggered_by,
        };

        debug!(execution_id = %execution.id, flow_id = %execution.flow_id, "Inserted execution");
        self.executions.write().await.push(execution.clone());
        Ok(execution)
    }

    async fn complete(
        &self,
        id: ExecutionId,
        completion: ExecutionCompletion,
    ) -> Result<FlowExecution, CoreError> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .iter_mut()
            .find(|execution| execution.id == id)
            .ok_or_else(|| CoreError::ExecutionNotFound(id.to_string()))?;

        execution.status = completion.status;
        execution.completed_at = Some(completion.completed_at);
        execution.logs = completion.logs;
        execution.error = completion.error;

        Ok(execution.clone())
    }
}

/// In-memory implementation of the SessionRepository
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
    api_keys: Arc<RwLock<HashMap<String, ApiKeyRecord>>>,
}

impl InMemorySessionRepository {
    /// Create a new in-memory session repository
    pub fn new(
        sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
        api_keys: Arc<RwLock<HashMap<String, ApiKeyRecord>>>,
    ) -> Self {
        Self { sessions, api_keys }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Session>, CoreError> {
        let sessions = self.sessions.read().await;

        Ok(sessions
            .get(token)
            .filter(|record| record.expires_at > now)
            .map(|record| record.session.clone()))
    }

    async fn find_by_api_key(&self, key: &str) -> Result<Option<Session>, CoreError> {
        let mut api_keys = self.api_keys.write().await;

        Ok(api_keys.get_mut(key).map(|record| {
            record.last_used = Some(Utc::now());
            record.session.clone()
        }))
    }
}
