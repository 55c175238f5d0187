//!
//! Flowdeck Core - domain model and services for flowdeck
//!
//! This crate defines the flow definition and execution records, the
//! repository interfaces the storage crates implement, and the application
//! services the server exposes.

#![forbid(unsafe_code)]

/// Domain layer - records, value objects and repository traits
pub mod domain;

/// Application services
pub mod application;

/// Error types
pub mod error;

pub use error::CoreError;

pub use domain::flow_definition::{FlowDefinition, FlowEmbed, FlowId, NewFlowEmbed};
pub use domain::flow_execution::{
    decode_output, ExecutionCompletion, ExecutionId, ExecutionStatus, ExecutionStatusView,
    FlowExecution, NewFlowExecution,
};
pub use domain::repository::{FlowDefinitionRepository, FlowExecutionRepository, SessionRepository};
pub use domain::session::{Role, Session, API_KEY_PREFIX};

pub use application::execution_status::ExecutionStatusReader;
pub use application::flow_embed_service::FlowEmbedService;
pub use application::flow_execution_service::{ExecutionReport, FlowExecutionService, FlowRunner};
pub use application::presence::{PresenceTracker, DEFAULT_PRESENCE_TIMEOUT};
