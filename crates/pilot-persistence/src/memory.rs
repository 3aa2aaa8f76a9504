//! In-memory store for tests and dry runs.

use crate::error::{StoreError, StoreResult};
use crate::store::{AnalysisStore, PerformanceStore, SettingsStore, TradeStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use pilot_core::{AnalysisRecord, DailyPerformance, Settings, Trade};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct State {
    settings: Option<Settings>,
    trades: HashMap<String, Trade>,
    analyses: Vec<AnalysisRecord>,
    performance: HashMap<NaiveDate, DailyPerformance>,
}

/// All four repositories backed by process memory.
///
/// Clones share state, so one instance can be handed to every component.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all trades regardless of status (test helper).
    pub fn all_trades(&self) -> Vec<Trade> {
        self.state.lock().trades.values().cloned().collect()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load(&self) -> StoreResult<Option<Settings>> {
        Ok(self.state.lock().settings.clone())
    }

    async fn save(&self, settings: &Settings) -> StoreResult<()> {
        self.state.lock().settings = Some(settings.clone());
        Ok(())
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn insert(&self, trade: &Trade) -> StoreResult<()> {
        self.state.lock().trades.insert(trade.id.clone(), trade.clone());
        Ok(())
    }

    async fn update(&self, trade: &Trade) -> StoreResult<()> {
        let mut state = self.state.lock();
        if !state.trades.contains_key(&trade.id) {
            return Err(StoreError::NotFound(trade.id.clone()));
        }
        state.trades.insert(trade.id.clone(), trade.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Trade>> {
        Ok(self.state.lock().trades.get(id).cloned())
    }

    async fn open_trades(&self) -> StoreResult<Vec<Trade>> {
        Ok(self
            .state
            .lock()
            .trades
            .values()
            .filter(|t| t.is_open())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn append(&self, record: &AnalysisRecord) -> StoreResult<()> {
        self.state.lock().analyses.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl PerformanceStore for MemoryStore {
    async fn get(&self, date: NaiveDate) -> StoreResult<Option<DailyPerformance>> {
        Ok(self.state.lock().performance.get(&date).cloned())
    }

    async fn upsert(&self, performance: &DailyPerformance) -> StoreResult<()> {
        self.state
            .lock()
            .performance
            .insert(performance.date, performance.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pilot_core::{Direction, OrderRef, Price, Qty, TradeStatus};
    use rust_decimal_macros::dec;

    fn trade() -> Trade {
        Trade::open(
            "ETHUSD",
            Direction::Long,
            Price::new(dec!(2700)),
            Qty::new(dec!(10)),
            10,
            Price::new(dec!(2685)),
            Price::new(dec!(2730)),
            80,
            OrderRef::new("ord-1"),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());

        let settings = Settings::default();
        store.save(&settings).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap(), settings);
    }

    #[tokio::test]
    async fn test_open_trades_filters_terminal() {
        let store = MemoryStore::new();
        let open = trade();
        let mut closed = trade();
        closed.status = TradeStatus::Closed;

        store.insert(&open).await.unwrap();
        store.insert(&closed).await.unwrap();

        let open_trades = store.open_trades().await.unwrap();
        assert_eq!(open_trades.len(), 1);
        assert_eq!(open_trades[0].id, open.id);
    }

    #[tokio::test]
    async fn test_update_missing_trade_fails() {
        let store = MemoryStore::new();
        let err = store.update(&trade()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
