use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn upstream<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // No retry policy: provider failures surface as plain 500s.
            ApiError::Upstream(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", message);
        }

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
