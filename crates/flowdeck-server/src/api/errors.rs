//! Error handling for the flowdeck API
//!
//! Every error body has the shape `{"error": "<message>"}`.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::{debug, error};

use crate::error::ServerError;

/// API Error type for returning standard error responses
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),
    /// Not found (404)
    NotFound(String),
    /// Internal server error (500)
    InternalServerError(String),
    /// Wrapped server error
    ServerError(ServerError),
}

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        ApiError::ServerError(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ServerError(err) => write!(f, "Server Error: {}", err),
        }
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "BadRequest({})", msg),
            ApiError::NotFound(msg) => write!(f, "NotFound({})", msg),
            ApiError::InternalServerError(msg) => write!(f, "InternalServerError({})", msg),
            ApiError::ServerError(err) => write!(f, "ServerError({:?})", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::ServerError(err) => return api_error_response(&err),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Convert a server error into a response with the matching status code
pub fn api_error_response(err: &ServerError) -> axum::response::Response {
    if err.is_auth_error() {
        debug!(%err, "Request rejected");
    }

    let (status_code, message) = match err {
        ServerError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        ServerError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        ServerError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        ServerError::ExecutorError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        ServerError::StateStoreError(_)
        | ServerError::ConfigurationError(_)
        | ServerError::InternalError(_) => {
            error!(%err, "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    };

    (status_code, Json(json!({ "error": message }))).into_response()
}
