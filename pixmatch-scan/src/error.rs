//! Error types for pixmatch-scan HTTP handlers

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::WorkspaceError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Workspace precondition failed
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Malformed multipart upload
    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),

    /// pixmatch-common error
    #[error("Common error: {0}")]
    Common(#[from] pixmatch_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Workspace(ref err) => {
                let (status, code) = match err {
                    WorkspaceError::ScanInProgress => (StatusCode::CONFLICT, "SCAN_IN_PROGRESS"),
                    WorkspaceError::MissingReference => (StatusCode::BAD_REQUEST, "MISSING_REFERENCE"),
                    WorkspaceError::EmptyLibrary => (StatusCode::BAD_REQUEST, "EMPTY_LIBRARY"),
                };
                (status, code, err.to_string())
            }
            ApiError::Multipart(ref err) => (err.status(), "UPLOAD_ERROR", err.body_text()),
            ApiError::Common(ref err) => {
                let (status, code) = match err {
                    pixmatch_common::Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    pixmatch_common::Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
                };
                (status, code, err.to_string())
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
