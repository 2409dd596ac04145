use axum::extract::Request;

/// Per-request fields attached to every failure log record.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: String,
    pub path: String,
}

impl RequestContext {
    pub fn from_request(request: &Request) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            method: request.method().to_string(),
            path: request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| request.uri().path().to_string()),
        }
    }
}
