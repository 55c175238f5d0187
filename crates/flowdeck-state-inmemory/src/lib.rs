//! In-memory state store implementation for flowdeck
//!
//! This crate provides in-memory implementations of the repository
//! interfaces defined in the flowdeck-core crate. It is primarily useful for
//! development, testing, and single-process deployments where persistence is
//! not required.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub mod repositories;
pub use repositories::{
    ApiKeyRecord, InMemoryFlowDefinitionRepository, InMemoryFlowExecutionRepository,
    InMemorySessionRepository, SessionRecord,
};

use flowdeck_core::{
    FlowDefinitionRepository, FlowEmbed, FlowExecutionRepository, Session, SessionRepository,
};

#[cfg(test)]
mod tests;

/// Provider for in-memory repositories.
///
/// All repositories created from one provider share the same storage.
pub struct InMemoryStateStoreProvider {
    flow_definitions: Arc<InMemoryFlowDefinitionRepository>,
    flow_executions: Arc<InMemoryFlowExecutionRepository>,
    sessions: Arc<InMemorySessionRepository>,

    // Kept for seeding and inspection
    embeds: Arc<RwLock<Vec<FlowEmbed>>>,
    session_records: Arc<RwLock<HashMap<String, SessionRecord>>>,
    api_key_records: Arc<RwLock<HashMap<String, ApiKeyRecord>>>,
}

impl InMemoryStateStoreProvider {
    /// Create a new in-memory state store provider
    pub fn new() -> Self {
        let embeds = Arc::new(RwLock::new(Vec::new()));
        let session_records = Arc::new(RwLock::new(HashMap::new()));
        let api_key_records = Arc::new(RwLock::new(HashMap::new()));

        Self {
            flow_definitions: Arc::new(InMemoryFlowDefinitionRepository::new(
                Arc::new(RwLock::new(HashMap::new())),
                embeds.clone(),
            )),
            flow_executions: Arc::new(InMemoryFlowExecutionRepository::new(Arc::new(RwLock::new(
                Vec::new(),
            )))),
            sessions: Arc::new(InMemorySessionRepository::new(
                session_records.clone(),
                api_key_records.clone(),
            )),
            embeds,
            session_records,
            api_key_records,
        }
    }

    /// Repositories as trait objects, ready to hand to the services
    pub fn create_repositories(
        &self,
    ) -> (
        Arc<dyn FlowDefinitionRepository>,
        Arc<dyn FlowExecutionRepository>,
        Arc<dyn SessionRepository>,
    ) {
        (
            self.flow_definitions.clone(),
            self.flow_executions.clone(),
            self.sessions.clone(),
        )
    }

    /// Register a session token
    pub async fn insert_session(&self, token: &str, session: Session, expires_at: DateTime<Utc>) {
        debug!(user_id = %session.user_id, "Registering in-memory session");
        self.session_records
            .write()
            .await
            .insert(token.to_string(), SessionRecord { session, expires_at });
    }

    /// Register an API key
    pub async fn insert_api_key(&self, key: &str, session: Session) {
        self.api_key_records.write().await.insert(
            key.to_string(),
            ApiKeyRecord {
                session,
                last_used: None,
            },
        );
    }

    /// When an API key was last used
    pub async fn api_key_last_used(&self, key: &str) -> Option<DateTime<Utc>> {
        self.api_key_records
            .read()
            .await
            .get(key)
            .and_then(|record| record.last_used)
    }

    /// All recorded embeds, oldest first
    pub async fn embeds(&self) -> Vec<FlowEmbed> {
        self.embeds.read().await.clone()
    }
}

impl Default for InMemoryStateStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}
