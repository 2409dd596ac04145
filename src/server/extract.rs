use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON request body decoded regardless of `Content-Type`. Unreadable bodies,
/// bad syntax and wrong shapes are all `InvalidInput`.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::invalid("invalid_body", rejection.body_text()))?;
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| AppError::invalid("invalid_body", format!("Failed to parse the request body as JSON: {e}")))
    }
}
