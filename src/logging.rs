//! Structured logging. One subscriber for the process (JSON by default), and one
//! failure record per failed request: error, message, severity, status code and
//! the request context.

use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogFormat;
use crate::error::AppError;
use crate::identity::RequestContext;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn for_status(status: StatusCode) -> Self {
        if status.is_server_error() { Severity::Error } else { Severity::Warning }
    }
}

/// Install the global subscriber. The filter comes from `RUST_LOG`, default `info`.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(true);
    let _ = match format {
        LogFormat::Json => builder.json().flatten_event(true).with_current_span(false).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

/// Emit the audit record for a failed request.
pub fn log_failure(err: &AppError, status: StatusCode, ctx: &RequestContext) {
    match Severity::for_status(status) {
        Severity::Error => error!(
            target: "todo::http",
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            status_code = status.as_u16(),
            error = %err,
            "{}",
            err.client_message()
        ),
        Severity::Warning => warn!(
            target: "todo::http",
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            status_code = status.as_u16(),
            error = %err,
            "{}",
            err.client_message()
        ),
    }
}

/// Outermost middleware: tags the response with a request id and logs every
/// response that carries an `AppError`.
pub async fn log_failures(request: Request, next: Next) -> Response {
    let ctx = RequestContext::from_request(&request);
    let mut response = next.run(request).await;
    if let Ok(id) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, id);
    }
    if let Some(err) = response.extensions().get::<AppError>() {
        log_failure(err, response.status(), &ctx);
    }
    response
}
