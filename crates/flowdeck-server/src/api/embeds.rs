//! Public flowchart embeds

use axum::{
    extract::{Path, Query, State},
    http::{header::REFERER, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use flowdeck_core::FlowId;

use crate::api::errors::ApiError;
use crate::error::ServerError;
use crate::server::FlowdeckServer;

/// Query parameters for an embed request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedQuery {
    pub user_id: Option<String>,
}

/// Serve a flow definition for embedding and record the view
pub async fn get_embed(
    State(server): State<Arc<FlowdeckServer>>,
    Path(flow_id): Path<String>,
    Query(query): Query<EmbedQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let referrer = headers.get(REFERER).and_then(|value| value.to_str().ok());
    let flow_id = FlowId::from(flow_id.as_str());

    match server
        .open_embed(&flow_id, query.user_id.as_deref(), referrer)
        .await
    {
        Ok(definition) => Ok(Json(definition)),
        Err(ServerError::ValidationError(msg)) => Err(ApiError::BadRequest(msg)),
        Err(ServerError::NotFound(_)) => Err(ApiError::NotFound("Not found".to_string())),
        Err(err) => Err(err.into()),
    }
}
