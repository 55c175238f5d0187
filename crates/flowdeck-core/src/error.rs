use thiserror::Error;

/// Core error type for flowdeck
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Flow definition not found
    #[error("Flow definition not found: {0}")]
    FlowDefinitionNotFound(String),

    /// No execution recorded for a flow
    #[error("No execution found: {0}")]
    ExecutionNotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// State store error
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The flow runner failed to produce a result
    #[error("Flow execution error: {0}")]
    FlowExecutionError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl CoreError {
    /// Whether the error means the requested record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::FlowDefinitionNotFound(_) | CoreError::ExecutionNotFound(_)
        )
    }
}
