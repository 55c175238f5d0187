//! Chat presence ping

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::server::FlowdeckServer;

/// Optional ping body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PingRequest {
    user_id: Option<String>,
}

/// Record a heartbeat and report how many users are online.
///
/// An empty body counts as an anonymous ping. Failures answer with a zero
/// count instead of an error body.
pub async fn ping_online(
    State(server): State<Arc<FlowdeckServer>>,
    body: Bytes,
) -> impl IntoResponse {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        PingRequest::default()
    } else {
        match serde_json::from_slice::<Option<PingRequest>>(&body) {
            Ok(request) => request.unwrap_or_default(),
            Err(err) => {
                warn!(%err, "Malformed presence ping");
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "count": 0 })));
            }
        }
    };

    let user_id = request
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let count = server.presence().ping(user_id).await;
    (StatusCode::OK, Json(json!({ "count": count })))
}
