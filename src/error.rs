//! Unified application error model and its HTTP translation table.
//! Every service and gate failure is an `AppError`; the boundary turns it into a
//! status code plus a client-safe JSON body, and keeps the full error in the
//! response extensions so the failure log can pick it up.

use std::fmt::{Display, Formatter};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::storage::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    InvalidInput { code: String, message: String },
    Unauthorized { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Timeout { code: String, message: String },
    Store { code: String, message: String },
    Allocation { code: String, message: String },
    Internal { code: String, message: String },
}

/// Generic text returned to clients in place of infrastructure error detail.
const INTERNAL_MESSAGE: &str = "internal server error";

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::InvalidInput { code, .. }
            | AppError::Unauthorized { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Timeout { code, .. }
            | AppError::Store { code, .. }
            | AppError::Allocation { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidInput { message, .. }
            | AppError::Unauthorized { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Timeout { message, .. }
            | AppError::Store { message, .. }
            | AppError::Allocation { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    /// Message safe to show to the client. Infrastructure failures carry backend
    /// detail in `message`, which only goes to the log.
    pub fn client_message(&self) -> &str {
        match self {
            AppError::Store { .. } | AppError::Allocation { .. } | AppError::Internal { .. } => INTERNAL_MESSAGE,
            _ => self.message(),
        }
    }

    pub fn invalid<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::InvalidInput { code: code.into(), message: msg.into() } }
    pub fn unauthorized<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Unauthorized { code: code.into(), message: msg.into() } }
    pub fn not_found<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn timeout<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Timeout { code: code.into(), message: msg.into() } }
    pub fn store<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Store { code: code.into(), message: msg.into() } }
    pub fn allocation<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Allocation { code: code.into(), message: msg.into() } }
    pub fn internal<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::InvalidInput { .. } => 400,
            AppError::Unauthorized { .. } => 401,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Timeout { .. } => 503,
            AppError::Store { .. } => 500,
            AppError::Allocation { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(m) => AppError::conflict("conflict", m),
            StoreError::Unavailable(m) => AppError::store("store_unavailable", m),
            StoreError::Backend(m) => AppError::store("store_error", m),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: format!("{err:#}") }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.code_str(),
            "message": self.client_message(),
        }));
        let mut response = (self.status_code(), body).into_response();
        response.extensions_mut().insert(self);
        response
    }
}
