//! Trade persistence and daily performance accounting.

use crate::error::EngineResult;
use chrono::{DateTime, Utc};
use pilot_core::{DailyPerformance, Price, Trade, TradeStatus};
use pilot_persistence::{PerformanceStore, TradeStore};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Creates, reads, and settles persisted trade records.
///
/// The only component that writes trades. Entry records are created by the
/// decider via [`record_entry`](Self::record_entry) once the exchange has
/// confirmed placement; terminal transitions arrive from the monitor pass
/// via [`settle`](Self::settle), which also folds realized PnL into the
/// day's performance row.
pub struct TradeLedger {
    trades: Arc<dyn TradeStore>,
    performance: Arc<dyn PerformanceStore>,
}

impl TradeLedger {
    pub fn new(trades: Arc<dyn TradeStore>, performance: Arc<dyn PerformanceStore>) -> Self {
        Self {
            trades,
            performance,
        }
    }

    /// Persist a freshly opened trade.
    pub async fn record_entry(&self, trade: &Trade) -> EngineResult<()> {
        debug_assert!(trade.order_ref.is_some(), "trade without exchange confirmation");
        self.trades.insert(trade).await?;
        info!(
            id = %trade.id,
            symbol = %trade.symbol,
            direction = %trade.direction,
            entry = %trade.entry_price,
            qty = %trade.quantity,
            "Trade recorded"
        );
        Ok(())
    }

    /// All trades the monitor still needs to reconcile.
    pub async fn open_trades(&self) -> EngineResult<Vec<Trade>> {
        Ok(self.trades.open_trades().await?)
    }

    /// Transition a trade to a terminal state and roll up performance.
    ///
    /// `exit_price` is None only for `Cancelled` (no fill, no PnL).
    /// Realized figures:
    /// `pnl = sign * (exit - entry) * qty * contract_value * leverage`,
    /// `pnl_pct = sign * (exit - entry) / entry * 100`.
    ///
    /// Returns the updated record.
    pub async fn settle(
        &self,
        trade: &Trade,
        status: TradeStatus,
        exit_price: Option<Price>,
        contract_value: Decimal,
        now: DateTime<Utc>,
    ) -> EngineResult<Trade> {
        debug_assert!(status.is_terminal());

        let mut settled = trade.clone();
        settled.status = status;
        settled.exited_at = Some(now);
        settled.exit_price = exit_price;

        if let Some(exit) = exit_price {
            let sign = Decimal::from(trade.direction.sign());
            let move_per_contract = exit.inner() - trade.entry_price.inner();
            settled.pnl = Some(
                sign * move_per_contract
                    * trade.quantity.inner()
                    * contract_value
                    * Decimal::from(trade.leverage),
            );
            settled.pnl_pct = (!trade.entry_price.is_zero()).then(|| {
                sign * move_per_contract / trade.entry_price.inner() * Decimal::from(100)
            });
        }

        self.trades.update(&settled).await?;

        if settled.pnl.is_some() {
            let date = now.date_naive();
            let mut day = self
                .performance
                .get(date)
                .await?
                .unwrap_or_else(|| DailyPerformance::new(date));
            day.apply(&settled);
            self.performance.upsert(&day).await?;
        }

        info!(
            id = %settled.id,
            symbol = %settled.symbol,
            status = %settled.status,
            exit = ?settled.exit_price.map(|p| p.to_string()),
            pnl = ?settled.pnl.map(|p| p.to_string()),
            "Trade settled"
        );

        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_core::{Direction, OrderRef, Qty};
    use pilot_persistence::MemoryStore;
    use rust_decimal_macros::dec;

    fn ledger_with_store() -> (TradeLedger, MemoryStore) {
        let store = MemoryStore::new();
        let ledger = TradeLedger::new(Arc::new(store.clone()), Arc::new(store.clone()));
        (ledger, store)
    }

    fn open_trade(direction: Direction, entry: Decimal) -> Trade {
        Trade::open(
            "ETHUSD",
            direction,
            Price::new(entry),
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
    async fn test_settle_long_loss() {
        let (ledger, _store) = ledger_with_store();
        let trade = open_trade(Direction::Long, dec!(2700));
        ledger.record_entry(&trade).await.unwrap();

        let settled = ledger
            .settle(
                &trade,
                TradeStatus::SlHit,
                Some(Price::new(dec!(2684))),
                dec!(0.01),
                Utc::now(),
            )
            .await
            .unwrap();

        // (2684 - 2700) * 10 * 0.01 * 10 = -16
        assert_eq!(settled.pnl.unwrap(), dec!(-16.00));
        assert!(settled.pnl.unwrap() < Decimal::ZERO);
        assert_eq!(settled.status, TradeStatus::SlHit);
        assert!(settled.exited_at.is_some());
    }

    #[tokio::test]
    async fn test_pnl_sign_property() {
        let (ledger, _store) = ledger_with_store();
        let cv = dec!(0.01);

        // Long: pnl > 0 iff exit > entry.
        let long = open_trade(Direction::Long, dec!(2700));
        ledger.record_entry(&long).await.unwrap();
        let up = ledger
            .settle(&long, TradeStatus::TpHit, Some(Price::new(dec!(2730))), cv, Utc::now())
            .await
            .unwrap();
        assert!(up.pnl.unwrap() > Decimal::ZERO);

        // Short: pnl > 0 iff exit < entry.
        let short = open_trade(Direction::Short, dec!(2700));
        ledger.record_entry(&short).await.unwrap();
        let down = ledger
            .settle(&short, TradeStatus::TpHit, Some(Price::new(dec!(2670))), cv, Utc::now())
            .await
            .unwrap();
        assert!(down.pnl.unwrap() > Decimal::ZERO);

        let short_loss = open_trade(Direction::Short, dec!(2700));
        ledger.record_entry(&short_loss).await.unwrap();
        let loss = ledger
            .settle(&short_loss, TradeStatus::SlHit, Some(Price::new(dec!(2730))), cv, Utc::now())
            .await
            .unwrap();
        assert!(loss.pnl.unwrap() < Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_settle_rolls_into_daily_performance() {
        let (ledger, store) = ledger_with_store();
        let now = Utc::now();

        let winner = open_trade(Direction::Long, dec!(2700));
        ledger.record_entry(&winner).await.unwrap();
        ledger
            .settle(&winner, TradeStatus::TpHit, Some(Price::new(dec!(2730))), dec!(0.01), now)
            .await
            .unwrap();

        let loser = open_trade(Direction::Long, dec!(2700));
        ledger.record_entry(&loser).await.unwrap();
        ledger
            .settle(&loser, TradeStatus::SlHit, Some(Price::new(dec!(2684))), dec!(0.01), now)
            .await
            .unwrap();

        let day = PerformanceStore::get(&store, now.date_naive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(day.total_trades, 2);
        assert_eq!(day.winning_trades, 1);
        assert_eq!(day.losing_trades, 1);
        assert_eq!(day.win_rate, dec!(50));
        assert_eq!(day.total_pnl, dec!(30.00) + dec!(-16.00));
    }

    #[tokio::test]
    async fn test_cancelled_settles_without_pnl() {
        let (ledger, store) = ledger_with_store();
        let now = Utc::now();
        let trade = open_trade(Direction::Long, dec!(2700));
        ledger.record_entry(&trade).await.unwrap();

        let settled = ledger
            .settle(&trade, TradeStatus::Cancelled, None, dec!(0.01), now)
            .await
            .unwrap();

        assert_eq!(settled.status, TradeStatus::Cancelled);
        assert!(settled.pnl.is_none());
        // No fill means no performance row.
        assert!(PerformanceStore::get(&store, now.date_naive())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_pnl_pct_matches_price_move() {
        let (ledger, _store) = ledger_with_store();
        let trade = open_trade(Direction::Long, dec!(2700));
        ledger.record_entry(&trade).await.unwrap();

        let settled = ledger
            .settle(&trade, TradeStatus::TpHit, Some(Price::new(dec!(2727))), dec!(0.01), Utc::now())
            .await
            .unwrap();

        // (2727 - 2700) / 2700 * 100 = 1%
        assert_eq!(settled.pnl_pct.unwrap(), dec!(1));
    }
}
