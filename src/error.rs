//! Error types for the caseload API
//!
//! Every handler returns `ApiResult<T>`; failures are serialized as
//! `{"error": {"code", "message"}}` with the matching HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or out-of-range input (400)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict (409) - e.g., overlapping session times
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database operation error (500)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // fetch_one on a missing row surfaces here
            sqlx::Error::RowNotFound => ApiError::NotFound("resource not found".to_string()),
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Database(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                err.to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
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
