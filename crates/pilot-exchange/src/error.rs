//! Error types for pilot-exchange.

use thiserror::Error;

/// Exchange collaborator errors.
///
/// Every variant is a collaborator failure in the engine's taxonomy: the
/// pass that hits one logs it and does nothing this cycle.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Exchange API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse exchange response: {0}")]
    Parse(String),

    #[error("Exchange response missing expected data: {0}")]
    MissingData(String),
}

/// Result type alias for exchange operations.
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
