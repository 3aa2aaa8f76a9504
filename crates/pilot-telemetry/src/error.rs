//! Error types for pilot-telemetry.

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Metrics registration error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Logging initialization error: {0}")]
    Logging(String),
}

/// Result type alias for telemetry operations.
pub type TelemetryResult<T> = std::result::Result<T, TelemetryError>;
