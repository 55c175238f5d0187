//! Configuration for the flowdeck server
//!
//! This module contains the configuration types and loading functionality.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Store location: `memory://...` or `postgres://...`
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Maximum pooled database connections
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// Run migrations at startup
    #[serde(default = "default_true")]
    pub database_run_migrations: bool,

    /// Remote flow executor endpoint. Flows run locally when unset.
    #[serde(default)]
    pub executor_url: Option<String>,

    /// Executor request timeout in seconds
    #[serde(default = "default_executor_timeout")]
    pub executor_timeout_secs: u64,

    /// Presence expiry in milliseconds
    #[serde(default = "default_presence_timeout")]
    pub presence_timeout_ms: u64,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_database_url() -> String {
    "memory://local".to_string()
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_executor_timeout() -> u64 {
    30
}

fn default_presence_timeout() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

/// Parse a numeric environment variable, warning about and ignoring bad values
fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Invalid {} value: {}", name, raw);
            None
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        // Start with defaults
        let mut config = Self::default();

        if let Some(port) = parse_env::<u16>("SERVER_PORT") {
            config.port = port;
        }

        if let Ok(host) = env::var("SERVER_HOST") {
            config.bind_address = host;
        }

        if let Ok(database_url) = env::var("DATABASE_URL") {
            config.database_url = database_url;
        }

        if let Some(max) = parse_env::<u32>("DATABASE_MAX_CONNECTIONS") {
            config.database_max_connections = max;
        }

        if let Ok(run) = env::var("DATABASE_RUN_MIGRATIONS") {
            config.database_run_migrations = run.to_lowercase() == "true" || run == "1";
        }

        if let Ok(executor_url) = env::var("EXECUTOR_URL") {
            if !executor_url.is_empty() {
                config.executor_url = Some(executor_url);
            }
        }

        if let Some(timeout) = parse_env::<u64>("EXECUTOR_TIMEOUT_SECS") {
            config.executor_timeout_secs = timeout;
        }

        if let Some(timeout) = parse_env::<u64>("PRESENCE_TIMEOUT_MS") {
            config.presence_timeout_ms = timeout;
        }

        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Ok(format) = env::var("LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                _ => {
                    warn!("Invalid LOG_FORMAT value: {}, using text", format);
                    LogFormat::Text
                }
            };
        }

        config.validate()?;

        if config.executor_url.is_none() {
            warn!("No EXECUTOR_URL provided - flows will be executed locally");
        }

        info!("Loaded server configuration");
        Ok(config)
    }

    /// Check the fields that cannot be defaulted
    pub fn validate(&self) -> ServerResult<()> {
        if !self.uses_memory_store() && !self.uses_postgres_store() {
            return Err(ServerError::ConfigurationError(format!(
                "Unsupported database URL: {}",
                self.database_url
            )));
        }

        if self.presence_timeout_ms == 0 {
            return Err(ServerError::ConfigurationError(
                "Presence timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether the in-memory store is selected
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory://")
    }

    /// Whether a PostgreSQL store is selected
    pub fn uses_postgres_store(&self) -> bool {
        self.database_url.starts_with("postgres://") || self.database_url.starts_with("postgresql://")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            database_url: default_database_url(),
            database_max_connections: default_database_max_connections(),
            database_run_migrations: true,
            executor_url: None,
            executor_timeout_secs: default_executor_timeout(),
            presence_timeout_ms: default_presence_timeout(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_memory_store() {
        let config = ServerConfig::default();
        assert!(config.uses_memory_store());
        assert_eq!(config.presence_timeout_ms, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_store_scheme() {
        let config = ServerConfig {
            database_url: "mysql://localhost/flowdeck".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ServerError::ConfigurationError(_))));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "log_format": "json"}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url, "memory://local");
        assert!(config.database_run_migrations);
    }
}
