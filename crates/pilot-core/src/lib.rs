//! Core domain types for the perp-pilot trading agent.
//!
//! This crate provides the types shared by every other crate:
//! - `Price`, `Qty`: precision-safe numeric types
//! - `Direction`, `ExecutionStrategy`, `Timeframe`, `TradingMode`: trading enums
//! - `Recommendation`, `AnalysisRecord`: advisor output and its audit record
//! - `Settings`: user-tunable singleton
//! - `Trade`, `TradeStatus`, `DailyPerformance`: position tracking and stats

pub mod decimal;
pub mod error;
pub mod performance;
pub mod settings;
pub mod trade;
pub mod types;

pub use decimal::{Price, Qty};
pub use error::{CoreError, Result};
pub use performance::DailyPerformance;
pub use settings::Settings;
pub use trade::{Trade, TradeStatus};
pub use types::{
    AnalysisRecord, Direction, ExecutionStrategy, OrderRef, Recommendation, Timeframe, TradingMode,
};
