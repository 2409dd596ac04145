//!
//! todo-multi HTTP server
//! -----------------------
//! Axum router, handlers and process wiring.
//!
//! Responsibilities:
//! - Register/login/logout endpoints backed by `identity::AuthProvider`.
//! - `/tasks` CRUD behind the access gate (`gate::require_session`); handlers get
//!   the caller as an explicit `Extension<Owner>`.
//! - Per-request deadline, panic recovery and failure logging layers.
//! - Store construction at startup and release on shutdown.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use futures_util::FutureExt; // for catch_unwind on async blocks
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::identity::{AuthProvider, Clock, Owner, SessionManager, SystemClock};
use crate::logging::log_failures;
use crate::storage::{IdentityStore, MemoryStore, PgStore, SessionStore, TaskStore};
use crate::tasks::TaskService;

pub mod cookie;
pub mod extract;
pub mod gate;

use cookie::{clear_session_cookie, session_token, set_session_cookie};
use extract::JsonBody;

/// Shared handles injected into every handler. Built once at startup; the store
/// lives as long as the last clone of this state.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<SessionManager>,
    pub auth: Arc<AuthProvider>,
    pub tasks: Arc<TaskService>,
}

impl AppState {
    /// Wire every component to one store engine.
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>, settings: Settings) -> Self
    where
        S: IdentityStore + SessionStore + TaskStore + 'static,
    {
        let sessions = Arc::new(SessionManager::new(store.clone(), clock, settings.session_ttl()));
        let auth = Arc::new(AuthProvider::new(store.clone(), sessions.clone()));
        let tasks = Arc::new(TaskService::new(store, settings.tasks.max_insert_attempts));
        Self { settings: Arc::new(settings), sessions, auth, tasks }
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsPayload {
    #[serde(rename = "Username", default)]
    username: String,
    #[serde(rename = "Password", default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct TaskPayload {
    #[serde(rename = "Id", default)]
    id: i32,
    #[serde(rename = "Desc", default)]
    description: String,
}

/// Build the full router over the given state.
pub fn router(state: AppState) -> Router {
    let task_routes = get(list_tasks).post(add_task).put(update_task).delete(delete_task);
    let tasks = Router::new()
        .route("/tasks", task_routes.clone())
        .route("/tasks/", task_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), gate::require_session));

    Router::new()
        .route("/", get(|| async { "todo-multi ok" }))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(tasks)
        .layer(middleware::from_fn_with_state(state.clone(), enforce_deadline))
        .layer(middleware::from_fn(recover_panics))
        .layer(middleware::from_fn(log_failures))
        .with_state(state)
}

/// Drop the handler future once the configured deadline passes; in-flight store
/// calls are cancelled with it.
async fn enforce_deadline(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let limit = state.settings.request_timeout();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => AppError::timeout("timeout", format!("request exceeded {} ms", limit.as_millis())).into_response(),
    }
}

async fn recover_panics(request: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            AppError::internal("panic", detail).into_response()
        }
    }
}

async fn register(State(state): State<AppState>, JsonBody(payload): JsonBody<CredentialsPayload>) -> AppResult<Json<serde_json::Value>> {
    state.auth.register(&payload.username, &payload.password).await?;
    Ok(Json(json!({"message": "success"})))
}

async fn login(State(state): State<AppState>, JsonBody(payload): JsonBody<CredentialsPayload>) -> AppResult<impl IntoResponse> {
    let token = state.auth.login(&payload.username, &payload.password).await?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, set_session_cookie(&token, state.settings.server.secure_cookie)?);
    Ok((headers, Json(json!({"message": "login successfull"}))))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let Some(token) = session_token(&headers) else {
        return Err(AppError::unauthorized("already_logged_out", "already logout"));
    };
    state.auth.logout(&token).await?;
    let mut h = HeaderMap::new();
    h.insert(SET_COOKIE, clear_session_cookie(state.settings.server.secure_cookie));
    Ok((h, Json(json!({"message": "logout successfull"}))))
}

async fn list_tasks(State(state): State<AppState>, Extension(owner): Extension<Owner>) -> AppResult<Response> {
    let tasks = state.tasks.list(&owner).await?;
    if tasks.is_empty() {
        return Ok(Json(json!({"message": "No Task Found"})).into_response());
    }
    Ok(Json(tasks).into_response())
}

async fn add_task(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    JsonBody(payload): JsonBody<TaskPayload>,
) -> AppResult<Json<serde_json::Value>> {
    let task = state.tasks.add(&owner, &payload.description).await?;
    Ok(Json(json!({"message": "Task added successfully!", "task": task})))
}

async fn update_task(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    JsonBody(payload): JsonBody<TaskPayload>,
) -> AppResult<Json<serde_json::Value>> {
    let task = state.tasks.update(&owner, payload.id, &payload.description).await?;
    Ok(Json(json!({"message": "Task updated successfully!", "task": task})))
}

async fn delete_task(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    JsonBody(payload): JsonBody<TaskPayload>,
) -> AppResult<Json<serde_json::Value>> {
    state.tasks.delete(&owner, payload.id).await?;
    Ok(Json(json!({"message": "Task deleted successfully"})))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Start the HTTP server with the given settings and serve until Ctrl-C.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = if settings.database.memory {
        info!(target: "startup", "using in-memory store; data is lost on exit");
        AppState::new(Arc::new(MemoryStore::new()), clock, settings.clone())
    } else {
        let store = PgStore::connect(&settings.database)
            .await
            .context("While connecting to the task database")?;
        info!(target: "startup", pool_size = settings.database.pool_size, "connected to the database");
        AppState::new(Arc::new(store), clock, settings.clone())
    };

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", settings.server.host, settings.server.port))?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    async fn boom() -> &'static str {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn panicking_handler_becomes_internal_error() {
        let app = Router::new()
            .route("/boom", get(boom))
            .layer(middleware::from_fn(recover_panics))
            .layer(middleware::from_fn(log_failures));

        let request = axum::http::Request::builder().uri("/boom").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let carried = response.extensions().get::<AppError>().cloned();
        assert_eq!(carried, Some(AppError::internal("panic", "handler exploded")));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "panic");
        assert_eq!(body["message"], "internal server error");
    }
}
