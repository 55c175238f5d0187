//!
//! Flowdeck Server - HTTP surface for flow execution status and chat presence
//!
//! This module exports all the components of the flowdeck server.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use flowdeck_core::{
    FlowDefinitionRepository, FlowExecutionRepository, FlowRunner, PresenceTracker,
    SessionRepository,
};

/// API module
pub mod api;

/// Session extraction
pub mod auth;

/// Configuration module
pub mod config;

/// Error module
pub mod error;

/// Flow runners
pub mod executor;

/// Server module
pub mod server;

// Re-export key types
pub use config::{LogFormat, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use executor::{HttpFlowRunner, LocalFlowRunner};
pub use server::FlowdeckServer;

/// Repositories backing one server instance
pub type Repositories = (
    Arc<dyn FlowDefinitionRepository>,
    Arc<dyn FlowExecutionRepository>,
    Arc<dyn SessionRepository>,
);

/// Run function
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    // Initialize logging
    init_logging(&config);

    // Create dependencies
    let (definitions, executions, sessions) = create_repositories(&config).await?;
    let runner = create_flow_runner(&config)?;
    let presence = Arc::new(PresenceTracker::with_timeout(Duration::from_millis(
        config.presence_timeout_ms,
    )));

    // Create server
    let server = FlowdeckServer::new(config, definitions, executions, sessions, runner, presence);

    // Run server
    server.run().await
}

/// Initialize logging
fn init_logging(config: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    // Create filter based on config
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = fmt().with_env_filter(filter).with_target(true);

    // A subscriber may already be installed
    let result = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}

/// Create the repositories selected by `database_url`
pub async fn create_repositories(config: &ServerConfig) -> ServerResult<Repositories> {
    if config.uses_memory_store() {
        info!("Using in-memory state store");
        let provider = flowdeck_state_inmemory::InMemoryStateStoreProvider::new();
        return Ok(provider.create_repositories());
    }

    if config.uses_postgres_store() {
        return create_postgres_repositories(config).await;
    }

    Err(ServerError::ConfigurationError(format!(
        "Unsupported database URL: {}",
        config.database_url
    )))
}

#[cfg(feature = "postgres")]
async fn create_postgres_repositories(config: &ServerConfig) -> ServerResult<Repositories> {
    use flowdeck_state_postgres::{PostgresConfig, PostgresStateStoreProvider};

    info!(max_connections = config.database_max_connections, "Using PostgreSQL state store");
    let provider = PostgresStateStoreProvider::with_config(PostgresConfig {
        connection_string: config.database_url.clone(),
        max_connections: config.database_max_connections,
        run_migrations: config.database_run_migrations,
        ..PostgresConfig::default()
    })
    .await?;

    Ok(provider.create_repositories())
}

#[cfg(not(feature = "postgres"))]
async fn create_postgres_repositories(_config: &ServerConfig) -> ServerResult<Repositories> {
    Err(ServerError::ConfigurationError(
        "PostgreSQL support not compiled in (enable the `postgres` feature)".to_string(),
    ))
}

/// Create the flow runner: remote when `executor_url` is set, local otherwise
pub fn create_flow_runner(config: &ServerConfig) -> ServerResult<Arc<dyn FlowRunner>> {
    match &config.executor_url {
        Some(url) => {
            info!(executor_url = %url, "Using remote flow executor");
            let runner = HttpFlowRunner::new(url.clone(), Duration::from_secs(config.executor_timeout_secs))?;
            Ok(Arc::new(runner))
        }
        None => Ok(Arc::new(LocalFlowRunner)),
    }
}
