//! Error types for chordvault-server
//!
//! Response bodies:
//! - 400 `{"error": "<message>"}`
//! - 404 `{"error": "Not Found"}`
//! - 502 `{"error": "Bad Gateway", "details": "<cause>"}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::ResolveError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Every upstream tier failed (502)
    #[error("Bad gateway: {0}")]
    BadGateway(String),
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Validation(msg) => ApiError::BadRequest(msg),
            ResolveError::UpstreamUnavailable(details) => ApiError::BadGateway(details),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Not Found" })),
            ApiError::BadGateway(details) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Bad Gateway", "details": details }),
            ),
        };

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), body = %body, "Request failed");
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
