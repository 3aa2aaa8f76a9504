//! Error types for pilot-advisor.

use thiserror::Error;

/// Advisor collaborator errors.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Advisor API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Advisor reply was not a parseable signal: {0}")]
    Malformed(String),

    #[error("Advisor configuration error: {0}")]
    Config(String),
}

/// Result type alias for advisor operations.
pub type AdvisorResult<T> = std::result::Result<T, AdvisorError>;
