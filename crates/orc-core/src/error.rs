//! Error types for the core domain

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Schema validation failed: {0}")]
    Schema(String),

    #[error("No pipeline result available for a decision")]
    NoResult,

    #[error("Decision already recorded: {0}")]
    AlreadyDecided(String),

    #[error("Rejection requires a non-empty reason")]
    EmptyReason,

    #[error("Draft not found: {0}")]
    DraftNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
