//! Error types for the flowdeck server
//!
//! This module contains the error types used throughout the server.

use flowdeck_core::CoreError;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Storage failure
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Flow executor failure
    #[error("Executor error: {0}")]
    ExecutorError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::FlowDefinitionNotFound(id) => ServerError::NotFound(format!("Flow {}", id)),
            CoreError::ExecutionNotFound(id) => {
                ServerError::NotFound(format!("Execution for flow {}", id))
            }
            CoreError::ValidationError(msg) => ServerError::ValidationError(msg),
            CoreError::StateStoreError(msg) => ServerError::StateStoreError(msg),
            CoreError::FlowExecutionError(msg) => ServerError::ExecutorError(msg),
            other => ServerError::InternalError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::InternalError(format!("IO error: {}", err))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::InternalError(format!("Error: {}", err))
    }
}

impl ServerError {
    /// Check if the error is caused by missing or rejected credentials
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ServerError::Unauthorized(_) | ServerError::Forbidden(_))
    }
}
