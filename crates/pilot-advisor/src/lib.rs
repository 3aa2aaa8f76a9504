//! Market-reasoning advisor collaborator.
//!
//! The engine consumes the [`Advisor`] trait; the bundled implementation
//! prompts an LLM messages API with a market snapshot and parses a
//! structured JSON signal out of the reply. Any failure along the way is an
//! [`AdvisorError`] the caller maps to "no trade"; the advisor can never
//! force a malformed trade into execution.

pub mod client;
pub mod error;
pub mod prompt;

use async_trait::async_trait;
use pilot_core::{Recommendation, TradingMode};
use pilot_exchange::MarketSnapshot;

pub use client::LlmAdvisor;
pub use error::{AdvisorError, AdvisorResult};

/// Produces one directional recommendation per analysis pass.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Analyze a market snapshot and recommend a trade (or no trade).
    async fn analyze(
        &self,
        snapshot: &MarketSnapshot,
        mode: TradingMode,
    ) -> AdvisorResult<Recommendation>;
}
