//! Session resolution for protected routes

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::debug;

use flowdeck_core::Session;

use crate::api::errors::ApiError;
use crate::error::ServerError;
use crate::server::FlowdeckServer;

/// Header carrying an API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// The caller's session, resolved from a bearer token or an API key.
///
/// Missing, unknown and expired credentials all reject with the same 401.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

#[async_trait]
impl FromRequestParts<Arc<FlowdeckServer>> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &Arc<FlowdeckServer>,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        let session = if let Some(token) = bearer {
            server.session_for_token(token).await?
        } else if let Some(key) = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            server.session_for_api_key(key.trim()).await?
        } else {
            None
        };

        match session {
            Some(session) => Ok(AuthSession(session)),
            None => {
                debug!(path = %parts.uri.path(), "Rejecting unauthenticated request");
                Err(ServerError::Unauthorized("no valid session".to_string()).into())
            }
        }
    }
}
