//! Error types for ytrank-web
//!
//! Every handler error becomes a JSON body `{"error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use ytrank_common::Error as CommonError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. a sync already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Nothing to analyze (422)
    #[error("{0}")]
    Unprocessable(String),

    /// Upstream service failed (502)
    #[error("Upstream error: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<CommonError> for ApiError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::NotFound(msg) => ApiError::NotFound(msg),
            CommonError::InvalidInput(msg) => ApiError::BadRequest(msg),
            CommonError::Conflict(msg) => ApiError::Conflict(msg),
            CommonError::EmptyInput(msg) => ApiError::Unprocessable(msg),
            CommonError::Network(msg) => ApiError::BadGateway(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_PLAYLIST", msg)
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
