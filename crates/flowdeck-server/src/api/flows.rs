//! Flow execution handlers
//!
//! Status of the latest run and admin-triggered execution.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};

use flowdeck_core::FlowId;

use crate::api::errors::ApiError;
use crate::auth::AuthSession;
use crate::error::ServerError;
use crate::server::FlowdeckServer;

const BANNED_MESSAGE: &str = "Your account has been banned";

/// Latest execution status of a flow
pub async fn get_flow_output(
    State(server): State<Arc<FlowdeckServer>>,
    AuthSession(session): AuthSession,
    Path(flow_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if session.banned {
        warn!(user_id = %session.user_id, "Banned user requested flow output");
        return Err(ServerError::Forbidden(BANNED_MESSAGE.to_string()).into());
    }

    let flow_id = FlowId::from(flow_id.as_str());
    match server.latest_execution_status(&flow_id).await {
        Ok(view) => Ok(Json(view)),
        Err(ServerError::NotFound(_)) => Err(ApiError::NotFound("No execution found".to_string())),
        Err(err) => Err(err.into()),
    }
}

/// Run a flow and record the execution. Admins only.
pub async fn execute_flow(
    State(server): State<Arc<FlowdeckServer>>,
    AuthSession(session): AuthSession,
    Path(flow_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if session.banned {
        return Err(ServerError::Forbidden(BANNED_MESSAGE.to_string()).into());
    }
    if !session.is_admin() {
        warn!(user_id = %session.user_id, role = ?session.role, "Non-admin attempted flow execution");
        return Err(ServerError::Unauthorized("admin role required".to_string()).into());
    }

    let flow_id = FlowId::from(flow_id.as_str());
    info!(%flow_id, user_id = %session.user_id, "Flow execution requested");

    match server.execute_flow(&flow_id, &session.user_id).await {
        Ok(report) => Ok(Json(report)),
        Err(ServerError::NotFound(_)) => Err(ApiError::NotFound("Flow not found".to_string())),
        Err(ServerError::ExecutorError(msg)) => Err(ApiError::InternalServerError(msg)),
        Err(err) => Err(err.into()),
    }
}
