//! Exchange collaborators: market data and the trading API.
//!
//! The engine consumes the [`MarketData`] and [`ExchangeApi`] traits only;
//! wire formats, authentication signing, and JSON field names live in the
//! [`rest`] implementation and never leak into engine code.

pub mod error;
pub mod rest;
pub mod traits;
pub mod types;

pub use error::{ExchangeError, ExchangeResult};
pub use rest::RestExchange;
pub use traits::{ExchangeApi, MarketData};
#[cfg(feature = "mocks")]
pub use traits::{MockExchangeApi, MockMarketData};
pub use types::{
    BookLevel, BracketOrderRequest, Candle, MarketSnapshot, OrderSide, OrderState,
    OrderStatusReport, Orderbook, PositionInfo, Product, WalletBalance,
};
