//! Error types for pilot-engine.
//!
//! Only collaborator failures surface as errors. Expected business-rule
//! rejections are `Decision::Rejected` values, never `Err`.

use thiserror::Error;

/// Engine errors: a collaborator failed mid-pass.
///
/// The pass that hits one is abandoned; nothing beyond what the exchange
/// itself confirmed has been committed, and the next trigger retries.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Exchange(#[from] pilot_exchange::ExchangeError),

    #[error(transparent)]
    Store(#[from] pilot_persistence::StoreError),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
