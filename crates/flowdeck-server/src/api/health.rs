//! Health check endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::server::FlowdeckServer;

/// Health check handler
///
/// Reports the backing store and the presence tracker size. Answers 503
/// when the store cannot be reached.
pub async fn health_check(State(server): State<Arc<FlowdeckServer>>) -> impl IntoResponse {
    debug!("Health check requested");

    let store_status = match server.check_store_health().await {
        Ok(true) => "UP",
        Ok(false) => "DEGRADED",
        Err(_) => "DOWN",
    };

    let response = json!({
        "status": if store_status == "DOWN" { "DOWN" } else { "UP" },
        "version": env!("CARGO_PKG_VERSION"),
        "dependencies": {
            "store": { "status": store_status },
        },
        "onlineUsers": server.presence().count().await,
    });

    let status = if store_status == "DOWN" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, Json(response))
}
