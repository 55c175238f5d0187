//! Main flowdeck server implementation
//!
//! This module contains the FlowdeckServer implementation.

use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use flowdeck_core::{
    ExecutionReport, ExecutionStatusReader, ExecutionStatusView, FlowDefinition,
    FlowDefinitionRepository, FlowEmbedService, FlowExecutionRepository, FlowExecutionService,
    FlowId, FlowRunner, PresenceTracker, Session, SessionRepository, API_KEY_PREFIX,
};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Main server implementation
#[derive(Clone)]
pub struct FlowdeckServer {
    /// Configuration
    pub config: ServerConfig,

    /// Execution history, also probed by the health check
    executions: Arc<dyn FlowExecutionRepository>,

    /// Identity lookups
    sessions: Arc<dyn SessionRepository>,

    /// Latest-execution projector
    status_reader: ExecutionStatusReader,

    /// Execution dispatch
    execution_service: Arc<FlowExecutionService>,

    /// Embed lookups
    embed_service: Arc<FlowEmbedService>,

    /// Who is online
    presence: Arc<PresenceTracker>,
}

/// Manual Debug implementation that doesn't try to debug the trait objects
impl std::fmt::Debug for FlowdeckServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowdeckServer")
            .field("config", &self.config)
            .field("presence_timeout", &self.presence.timeout())
            .finish()
    }
}

impl FlowdeckServer {
    /// Create a new FlowdeckServer
    pub fn new(
        config: ServerConfig,
        definitions: Arc<dyn FlowDefinitionRepository>,
        executions: Arc<dyn FlowExecutionRepository>,
        sessions: Arc<dyn SessionRepository>,
        runner: Arc<dyn FlowRunner>,
        presence: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            config,
            status_reader: ExecutionStatusReader::new(executions.clone()),
            execution_service: Arc::new(FlowExecutionService::new(
                definitions.clone(),
                executions.clone(),
                runner,
            )),
            embed_service: Arc::new(FlowEmbedService::new(definitions)),
            executions,
            sessions,
            presence,
        }
    }

    /// Run the server until Ctrl-C
    pub async fn run(self) -> ServerResult<()> {
        info!("Starting flowdeck server");

        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| ServerError::ConfigurationError(format!("Invalid bind address: {}", e)))?;

        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        let app = crate::api::build_router(Arc::new(self));

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }

    /// Resolve a bearer session token
    pub async fn session_for_token(&self, token: &str) -> ServerResult<Option<Session>> {
        Ok(self.sessions.find_by_token(token, Utc::now()).await?)
    }

    /// Resolve an API key. Keys without the issued prefix are rejected
    /// without a lookup.
    pub async fn session_for_api_key(&self, key: &str) -> ServerResult<Option<Session>> {
        if !key.starts_with(API_KEY_PREFIX) {
            debug!("Rejecting API key without the expected prefix");
            return Ok(None);
        }
        Ok(self.sessions.find_by_api_key(key).await?)
    }

    /// Latest execution status of a flow
    pub async fn latest_execution_status(&self, flow_id: &FlowId) -> ServerResult<ExecutionStatusView> {
        Ok(self.status_reader.get_latest_status(flow_id).await?)
    }

    /// Dispatch a flow for execution
    pub async fn execute_flow(&self, flow_id: &FlowId, triggered_by: &str) -> ServerResult<ExecutionReport> {
        Ok(self.execution_service.execute(flow_id, triggered_by).await?)
    }

    /// Load a flow for embedding and record the view
    pub async fn open_embed(
        &self,
        flow_id: &FlowId,
        user_id: Option<&str>,
        referrer: Option<&str>,
    ) -> ServerResult<FlowDefinition> {
        Ok(self.embed_service.open_embed(flow_id, user_id, referrer).await?)
    }

    /// Presence tracker shared by all requests
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Check the backing store
    pub async fn check_store_health(&self) -> ServerResult<bool> {
        match self.executions.health_check().await {
            Ok(healthy) => Ok(healthy),
            Err(err) => {
                warn!(%err, "Store health check failed");
                Err(err.into())
            }
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => warn!(%err, "Failed to listen for shutdown signal"),
    }
}
