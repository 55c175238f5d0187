//! API module for the flowdeck server
//!
//! Routes, handlers and error responses.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod embeds;
pub mod errors;
pub mod flows;
pub mod health;
pub mod presence;

use crate::server::FlowdeckServer;

/// Build the router for API endpoints
pub fn build_router(server: Arc<FlowdeckServer>) -> Router {
    Router::new()
        // Flow executions
        .route("/api/flows/:flow_id/output", get(flows::get_flow_output))
        .route("/api/flows/:flow_id/execute", post(flows::execute_flow))

        // Public embeds
        .route("/api/flowcharts/:flow_id/embed", get(embeds::get_embed))

        // Chat presence
        .route("/api/chat/online", post(presence::ping_online))

        // Health check
        .route("/health", get(health::health_check))

        .layer(TraceLayer::new_for_http())

        // Shared state
        .with_state(server)
}
