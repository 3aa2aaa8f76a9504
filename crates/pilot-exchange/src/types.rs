//! Market data and trading API types.

use chrono::{DateTime, Utc};
use pilot_core::{Direction, Price, Qty, Timeframe};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Order side on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Map a directional view to an order side; `Direction::None` has none.
    pub fn from_direction(direction: Direction) -> Option<Self> {
        match direction {
            Direction::Long => Some(Self::Buy),
            Direction::Short => Some(Self::Sell),
            Direction::None => None,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// One OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Decimal,
}

/// One price level of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub size: Decimal,
}

/// Level-2 orderbook snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Orderbook {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl Orderbook {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// Bid volume as a fraction of total top-of-book volume, in [0, 1].
    ///
    /// Above 0.5 means buy-side pressure. None on an empty book.
    pub fn bid_imbalance(&self) -> Option<Decimal> {
        let bid: Decimal = self.bids.iter().map(|l| l.size).sum();
        let ask: Decimal = self.asks.iter().map(|l| l.size).sum();
        let total = bid + ask;
        if total.is_zero() {
            return None;
        }
        Some(bid / total)
    }
}

/// Everything the advisor sees for one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    /// Live price at snapshot time.
    pub price: Price,
    /// Candles per timeframe, oldest first.
    pub candles: HashMap<Timeframe, Vec<Candle>>,
    pub orderbook: Orderbook,
    pub taken_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Close of the most recent candle on the given timeframe.
    pub fn last_close(&self, timeframe: Timeframe) -> Option<Price> {
        self.candles
            .get(&timeframe)
            .and_then(|candles| candles.last())
            .map(|c| c.close)
    }
}

/// One wallet balance entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub asset: String,
    pub available: Decimal,
}

/// Tradeable product metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub symbol: String,
    /// Value of one contract in the underlying (e.g. 0.01 ETH).
    pub contract_value: Decimal,
    pub tick_size: Price,
    /// Asset balances are settled in (e.g. "USD").
    pub settling_asset: String,
    pub max_leverage: u32,
}

/// Exchange-reported state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    /// Resting or working.
    Open,
    /// Fully filled and done.
    Closed,
    /// Cancelled by user or exchange.
    Cancelled,
    /// Anything this engine cannot interpret; left for the next pass.
    #[serde(other)]
    Unknown,
}

/// Order status as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    pub state: OrderState,
    pub filled_qty: Qty,
    pub avg_fill_price: Option<Price>,
}

/// One open position as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub symbol: String,
    /// Signed contract count; positive long, negative short, zero flat.
    pub size: Decimal,
    pub entry_price: Option<Price>,
}

impl PositionInfo {
    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }
}

/// Request for a bracket order (entry plus stop-loss and take-profit legs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketOrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Qty,
    /// None for market entry, Some for a resting limit entry.
    pub limit_price: Option<Price>,
    pub stop_loss: Price,
    pub take_profit: Price,
}

impl BracketOrderRequest {
    pub fn market(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: Qty,
        stop_loss: Price,
        take_profit: Price,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            qty,
            limit_price: None,
            stop_loss,
            take_profit,
        }
    }

    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: Qty,
        limit_price: Price,
        stop_loss: Price,
        take_profit: Price,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            qty,
            limit_price: Some(limit_price),
            stop_loss,
            take_profit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_from_direction() {
        assert_eq!(OrderSide::from_direction(Direction::Long), Some(OrderSide::Buy));
        assert_eq!(OrderSide::from_direction(Direction::Short), Some(OrderSide::Sell));
        assert_eq!(OrderSide::from_direction(Direction::None), None);
    }

    #[test]
    fn test_orderbook_imbalance() {
        let book = Orderbook {
            bids: vec![BookLevel { price: Price::new(dec!(99)), size: dec!(30) }],
            asks: vec![BookLevel { price: Price::new(dec!(101)), size: dec!(10) }],
        };
        assert_eq!(book.bid_imbalance().unwrap(), dec!(0.75));
        assert_eq!(book.best_bid().unwrap().inner(), dec!(99));
        assert!(Orderbook::default().bid_imbalance().is_none());
    }

    #[test]
    fn test_unknown_order_state_deserializes() {
        let state: OrderState = serde_json::from_str("\"pending_review\"").unwrap();
        assert_eq!(state, OrderState::Unknown);
    }

    #[test]
    fn test_position_flatness() {
        let pos = PositionInfo { symbol: "ETHUSD".into(), size: dec!(0), entry_price: None };
        assert!(pos.is_flat());
    }
}
