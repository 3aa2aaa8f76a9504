//! Storage collaborator for settings, trades, analyses, and performance.
//!
//! Engine code depends only on the repository traits in [`store`]; nothing
//! outside this crate may assume a particular storage engine. Two
//! implementations ship: [`JsonStore`] (JSON files, append-only analysis
//! audit) and [`MemoryStore`] (tests and dry runs).

pub mod error;
pub mod json;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use json::JsonStore;
pub use memory::MemoryStore;
pub use store::{AnalysisStore, PerformanceStore, SettingsStore, TradeStore};
#[cfg(feature = "mocks")]
pub use store::{MockAnalysisStore, MockPerformanceStore, MockSettingsStore, MockTradeStore};
