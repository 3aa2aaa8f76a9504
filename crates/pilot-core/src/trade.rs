//! Persisted trade records.

use crate::types::{Direction, OrderRef};
use crate::{Price, Qty};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Position open on the exchange.
    Open,
    /// Closed by the take-profit leg.
    TpHit,
    /// Closed by the stop-loss leg.
    SlHit,
    /// Closed by other means (manual or exchange-side).
    Closed,
    /// Entry order cancelled before any fill.
    Cancelled,
}

impl TradeStatus {
    /// Returns true once no further monitoring transition can occur.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::TpHit => write!(f, "tp_hit"),
            Self::SlHit => write!(f, "sl_hit"),
            Self::Closed => write!(f, "closed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The durable unit of position tracking.
///
/// Created only after the exchange confirms placement (the local record
/// reflects confirmed external state, it is not a reservation). Exit fields
/// are written once by the monitor pass when the exchange reports the order
/// is no longer open; the record is immutable after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade id.
    pub id: String,
    /// Asset symbol.
    pub symbol: String,
    /// Long or short.
    pub direction: Direction,
    /// Confirmed entry price.
    pub entry_price: Price,
    /// Whole contracts held.
    pub quantity: Qty,
    /// Leverage the position was opened with.
    pub leverage: u32,
    /// Stop-loss leg of the bracket.
    pub stop_loss: Price,
    /// Take-profit leg of the bracket.
    pub take_profit: Price,
    /// Lifecycle status.
    pub status: TradeStatus,
    /// Advisor confidence at entry.
    pub confidence: u8,
    /// Exchange order reference for the entry bracket.
    pub order_ref: Option<OrderRef>,
    /// Entry timestamp.
    pub entered_at: DateTime<Utc>,
    /// Exit timestamp, set on terminal transition.
    pub exited_at: Option<DateTime<Utc>>,
    /// Realized exit price, set on terminal transition.
    pub exit_price: Option<Price>,
    /// Realized PnL in settlement currency.
    pub pnl: Option<Decimal>,
    /// Realized PnL as a percentage of entry.
    pub pnl_pct: Option<Decimal>,
}

impl Trade {
    /// Create an open trade from a confirmed order placement.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn open(
        symbol: impl Into<String>,
        direction: Direction,
        entry_price: Price,
        quantity: Qty,
        leverage: u32,
        stop_loss: Price,
        take_profit: Price,
        confidence: u8,
        order_ref: OrderRef,
        entered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            direction,
            entry_price,
            quantity,
            leverage,
            stop_loss,
            take_profit,
            status: TradeStatus::Open,
            confidence,
            order_ref: Some(order_ref),
            entered_at,
            exited_at: None,
            exit_price: None,
            pnl: None,
            pnl_pct: None,
        }
    }

    /// True while the monitor pass still needs to reconcile this trade.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Milliseconds since entry.
    #[must_use]
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entered_at).num_milliseconds()
    }
}
