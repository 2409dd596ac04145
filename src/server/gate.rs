//! Access gate for `/tasks`.
//!
//! Per request: no cookie -> 401; unknown token -> 401; expired session ->
//! revoke, clear cookie, 401; valid session -> the `Owner` goes into the request
//! extensions and the handler runs. One store read per request, plus one write
//! on the expired path. Task data is never touched here.

use axum::extract::{Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info};

use super::cookie::{clear_session_cookie, session_token};
use super::AppState;
use crate::error::AppError;

fn unauthorized() -> AppError { AppError::unauthorized("unauthorized", "Unauthorized") }

pub async fn require_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(token) = session_token(request.headers()) else {
        return unauthorized().into_response();
    };

    let session = match state.sessions.resolve(&token).await {
        Ok(session) => session,
        Err(AppError::NotFound { .. }) => return unauthorized().into_response(),
        Err(e) => return e.into_response(),
    };

    if state.sessions.is_expired(&session) {
        if let Err(e) = state.sessions.revoke(&token).await {
            return e.into_response();
        }
        info!(target: "todo::gate", owner = %session.owner, created_at = %session.created_at, "expired session revoked");
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, clear_session_cookie(state.settings.server.secure_cookie));
        return (headers, unauthorized()).into_response();
    }

    debug!(target: "todo::gate", owner = %session.owner, "session accepted");
    request.extensions_mut().insert(session.owner);
    next.run(request).await
}
