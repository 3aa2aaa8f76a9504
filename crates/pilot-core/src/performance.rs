//! Daily performance aggregates.

use crate::trade::Trade;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row per UTC calendar day, folded from closed trades.
///
/// Invariants: `total_trades = winning_trades + losing_trades` and
/// `win_rate = winning_trades / total_trades * 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPerformance {
    pub date: NaiveDate,
    pub total_pnl: Decimal,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: Decimal,
    /// Symbol of the single best trade of the day, by PnL.
    pub best_symbol: Option<String>,
    /// Symbol of the single worst trade of the day, by PnL.
    pub worst_symbol: Option<String>,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
}

impl DailyPerformance {
    /// Empty aggregate for a day.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_pnl: Decimal::ZERO,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: Decimal::ZERO,
            best_symbol: None,
            worst_symbol: None,
            largest_win: Decimal::ZERO,
            largest_loss: Decimal::ZERO,
        }
    }

    /// Fold a settled trade into the aggregate.
    ///
    /// Trades without realized PnL (cancelled before fill) count toward
    /// nothing. A zero-PnL close counts as a loss: it paid fees.
    pub fn apply(&mut self, trade: &Trade) {
        let Some(pnl) = trade.pnl else {
            return;
        };

        self.total_pnl += pnl;
        self.total_trades += 1;
        if pnl > Decimal::ZERO {
            self.winning_trades += 1;
        } else {
            self.losing_trades += 1;
        }
        self.win_rate =
            Decimal::from(self.winning_trades) / Decimal::from(self.total_trades) * Decimal::from(100);

        if pnl > self.largest_win {
            self.largest_win = pnl;
            self.best_symbol = Some(trade.symbol.clone());
        }
        if pnl < self.largest_loss {
            self.largest_loss = pnl;
            self.worst_symbol = Some(trade.symbol.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, OrderRef};
    use crate::{Price, Qty, TradeStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn settled_trade(symbol: &str, pnl: Decimal) -> Trade {
        let mut trade = Trade::open(
            symbol,
            Direction::Long,
            Price::new(dec!(2700)),
            Qty::new(dec!(10)),
            10,
            Price::new(dec!(2685)),
            Price::new(dec!(2730)),
            80,
            OrderRef::new("ord"),
            Utc::now(),
        );
        trade.status = TradeStatus::Closed;
        trade.pnl = Some(pnl);
        trade
    }

    #[test]
    fn test_apply_counts_and_win_rate() {
        let mut day = DailyPerformance::new(Utc::now().date_naive());
        day.apply(&settled_trade("ETHUSD", dec!(120)));
        day.apply(&settled_trade("BTCUSD", dec!(-40)));
        day.apply(&settled_trade("ETHUSD", dec!(60)));

        assert_eq!(day.total_trades, 3);
        assert_eq!(day.winning_trades, 2);
        assert_eq!(day.losing_trades, 1);
        assert_eq!(day.total_trades, day.winning_trades + day.losing_trades);
        assert_eq!(day.total_pnl, dec!(140));
        // 2/3 * 100
        assert!(day.win_rate > dec!(66) && day.win_rate < dec!(67));
    }

    #[test]
    fn test_best_and_worst_tracking() {
        let mut day = DailyPerformance::new(Utc::now().date_naive());
        day.apply(&settled_trade("ETHUSD", dec!(50)));
        day.apply(&settled_trade("BTCUSD", dec!(200)));
        day.apply(&settled_trade("SOLUSD", dec!(-75)));

        assert_eq!(day.best_symbol.as_deref(), Some("BTCUSD"));
        assert_eq!(day.worst_symbol.as_deref(), Some("SOLUSD"));
        assert_eq!(day.largest_win, dec!(200));
        assert_eq!(day.largest_loss, dec!(-75));
    }

    #[test]
    fn test_unsettled_trade_is_ignored() {
        let mut day = DailyPerformance::new(Utc::now().date_naive());
        let mut cancelled = settled_trade("ETHUSD", dec!(0));
        cancelled.pnl = None;
        cancelled.status = TradeStatus::Cancelled;
        day.apply(&cancelled);
        assert_eq!(day.total_trades, 0);
    }

    #[test]
    fn test_zero_pnl_counts_as_loss() {
        let mut day = DailyPerformance::new(Utc::now().date_naive());
        day.apply(&settled_trade("ETHUSD", dec!(0)));
        assert_eq!(day.losing_trades, 1);
        assert_eq!(day.winning_trades, 0);
    }
}
