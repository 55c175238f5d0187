/// Execution status projection
pub mod execution_status;

/// Presence tracking
pub mod presence;

/// Execution dispatch
pub mod flow_execution_service;

/// Flow embeds
pub mod flow_embed_service;
