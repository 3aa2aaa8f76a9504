//! Error types for pilot-bot.

use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Telemetry(#[from] pilot_telemetry::TelemetryError),

    #[error(transparent)]
    Engine(#[from] pilot_engine::EngineError),

    #[error(transparent)]
    Exchange(#[from] pilot_exchange::ExchangeError),

    #[error(transparent)]
    Store(#[from] pilot_persistence::StoreError),

    #[error(transparent)]
    Advisor(#[from] pilot_advisor::AdvisorError),
}

/// Result type alias for application operations.
pub type AppResult<T> = std::result::Result<T, AppError>;
