//! Error types for the ORC API server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use orc_core::CoreError;

/// Startup and lifecycle errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server lifecycle operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Request-level error, rendered as a JSON body with a matching status
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file provided")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Draft not found: {0}")]
    DraftNotFound(String),

    #[error("Decision already recorded: {0}")]
    AlreadyDecided(String),

    #[error("No pipeline result available for a decision")]
    NoResult,

    #[error("{0}")]
    ClassificationFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::EmptyReason => ApiError::InvalidRequest(e.to_string()),
            CoreError::Schema(msg) => ApiError::InvalidRequest(msg),
            CoreError::AlreadyDecided(label) => ApiError::AlreadyDecided(label),
            CoreError::NoResult => ApiError::NoResult,
            CoreError::DraftNotFound(id) => ApiError::DraftNotFound(id),
            CoreError::Io(e) => ApiError::Internal(e.to_string()),
            CoreError::Serialization(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingFile | ApiError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::SessionNotFound(_) | ApiError::DraftNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::AlreadyDecided(_) | ApiError::NoResult => {
                (StatusCode::CONFLICT, self.to_string())
            }
            ApiError::ClassificationFailed(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
