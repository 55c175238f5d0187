/// Flow definition domain models
pub mod flow_definition;

/// Flow execution records and their projection
pub mod flow_execution;

/// Authenticated identities
pub mod session;

/// Repository interfaces
pub mod repository;
