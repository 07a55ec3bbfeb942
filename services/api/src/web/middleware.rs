//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::auth::session_id_from_headers;
use crate::web::rest::{error_response, ErrorResponse};
use crate::web::state::AppState;

/// Middleware that validates the auth session cookie and extracts the user id.
///
/// If valid, inserts the user id into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized before any handler work.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let session_id = session_id_from_headers(req.headers())
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Unauthorized"))?
        .to_string();

    let user_id = state
        .db
        .validate_auth_session(&session_id)
        .await
        .map_err(|e| {
            warn!("Rejected auth session: {:?}", e);
            error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
        })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
