//! Repository traits.

use crate::error::StoreResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use pilot_core::{AnalysisRecord, DailyPerformance, Settings, Trade};

/// Singleton settings storage.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the stored settings, if any have ever been saved.
    async fn load(&self) -> StoreResult<Option<Settings>>;

    async fn save(&self, settings: &Settings) -> StoreResult<()>;
}

/// Trade record storage.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn insert(&self, trade: &Trade) -> StoreResult<()>;

    /// Overwrite an existing trade by id.
    async fn update(&self, trade: &Trade) -> StoreResult<()>;

    async fn get(&self, id: &str) -> StoreResult<Option<Trade>>;

    /// All trades still in `Open` status.
    async fn open_trades(&self) -> StoreResult<Vec<Trade>>;
}

/// Append-only analysis audit trail.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn append(&self, record: &AnalysisRecord) -> StoreResult<()>;
}

/// Daily performance aggregates, one row per UTC day.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait PerformanceStore: Send + Sync {
    async fn get(&self, date: NaiveDate) -> StoreResult<Option<DailyPerformance>>;

    async fn upsert(&self, performance: &DailyPerformance) -> StoreResult<()>;
}
