//! Error types for pilot-persistence.

use thiserror::Error;

/// Storage collaborator errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Result type alias for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
