//! Collaborator trait seams consumed by the engine.

use crate::error::ExchangeResult;
use crate::types::{
    BracketOrderRequest, Candle, OrderStatusReport, Orderbook, PositionInfo, Product,
    WalletBalance,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pilot_core::{OrderRef, Price, Timeframe};

/// Read-only market data provider.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Current (mark) price for a symbol.
    async fn current_price(&self, symbol: &str) -> ExchangeResult<Price>;

    /// Candles for a symbol and timeframe, oldest first.
    async fn ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ExchangeResult<Vec<Candle>>;

    /// Level-2 orderbook snapshot.
    async fn orderbook(&self, symbol: &str) -> ExchangeResult<Orderbook>;
}

/// Transactional trading API.
///
/// Placement calls return only after the exchange has confirmed the order;
/// an `Err` from a placement call means nothing was committed locally.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    async fn wallet_balances(&self) -> ExchangeResult<Vec<WalletBalance>>;

    async fn products(&self) -> ExchangeResult<Vec<Product>>;

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()>;

    /// Place a market entry with attached stop-loss and take-profit legs.
    async fn place_market_order_with_bracket(
        &self,
        request: &BracketOrderRequest,
    ) -> ExchangeResult<OrderRef>;

    /// Place a resting limit entry with attached bracket legs.
    async fn place_limit_order_with_bracket(
        &self,
        request: &BracketOrderRequest,
    ) -> ExchangeResult<OrderRef>;

    async fn order_status(&self, order: &OrderRef) -> ExchangeResult<OrderStatusReport>;

    async fn positions(&self) -> ExchangeResult<Vec<PositionInfo>>;
}
