//! Signed REST client for the derivatives exchange.
//!
//! Authentication: every private request carries `api-key`, `timestamp`,
//! and `signature` headers, where the signature is
//! HMAC-SHA256(secret, method + timestamp + path + query + body) hex-encoded.
//! Responses arrive in a `{"success": bool, "result": ...}` envelope.

use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::{ExchangeApi, MarketData};
use crate::types::{
    BookLevel, BracketOrderRequest, Candle, OrderState, OrderStatusReport, Orderbook,
    PositionInfo, Product, WalletBalance,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use pilot_core::{OrderRef, Price, Qty, Timeframe};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for market data and trading.
pub struct RestExchange {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

/// Response envelope used by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TickerDto {
    #[serde(with = "rust_decimal::serde::str")]
    mark_price: Decimal,
}

#[derive(Debug, Deserialize)]
struct CandleDto {
    time: i64,
    #[serde(with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    close: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookLevelDto {
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    size: Decimal,
}

#[derive(Debug, Deserialize)]
struct OrderbookDto {
    #[serde(default)]
    buy: Vec<BookLevelDto>,
    #[serde(default)]
    sell: Vec<BookLevelDto>,
}

#[derive(Debug, Deserialize)]
struct BalanceDto {
    asset_symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    available_balance: Decimal,
}

#[derive(Debug, Deserialize)]
struct SettlingAssetDto {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct ProductDto {
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    contract_value: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    tick_size: Decimal,
    settling_asset: SettlingAssetDto,
    #[serde(default = "default_max_leverage")]
    max_leverage: u32,
}

fn default_max_leverage() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
struct OrderStatusDto {
    state: String,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    unfilled_size: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    size: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    average_fill_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct PositionDto {
    product_symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    size: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    entry_price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct LeverageRequest<'a> {
    product_symbol: &'a str,
    leverage: u32,
}

#[derive(Debug, Serialize)]
struct OrderRequestDto<'a> {
    product_symbol: &'a str,
    size: String,
    side: &'a str,
    order_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<String>,
    bracket_stop_loss_price: String,
    bracket_take_profit_price: String,
}

#[derive(Debug, Deserialize)]
struct OrderPlacedDto {
    id: u64,
}

impl RestExchange {
    /// Create a new exchange client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        })
    }

    /// Sign `method + timestamp + path + query + body` with the API secret.
    fn sign(&self, payload: &str) -> ExchangeResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Http(format!("Invalid API secret: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Issue a signed request and unwrap the response envelope.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &str,
        body: Option<String>,
    ) -> ExchangeResult<T> {
        let timestamp = Utc::now().timestamp().to_string();
        let body_str = body.as_deref().unwrap_or("");
        let payload = format!("{}{timestamp}{path}{query}{body_str}", method.as_str());
        let signature = self.sign(&payload)?;

        let url = format!("{}{path}{query}", self.base_url);
        let mut request = self
            .client
            .request(method, &url)
            .header("api-key", &self.api_key)
            .header("timestamp", timestamp)
            .header("signature", signature);
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExchangeError::Http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(format!("Failed to parse response: {e}")))?;

        if !envelope.success {
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                message: envelope
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unspecified exchange error".to_string()),
            });
        }

        envelope
            .result
            .ok_or_else(|| ExchangeError::MissingData("empty result in envelope".to_string()))
    }

    async fn place_order(&self, request: &BracketOrderRequest) -> ExchangeResult<OrderRef> {
        let order_type = if request.limit_price.is_some() {
            "limit_order"
        } else {
            "market_order"
        };
        let dto = OrderRequestDto {
            product_symbol: &request.symbol,
            size: request.qty.to_string(),
            side: match request.side {
                crate::types::OrderSide::Buy => "buy",
                crate::types::OrderSide::Sell => "sell",
            },
            order_type,
            limit_price: request.limit_price.map(|p| p.to_string()),
            bracket_stop_loss_price: request.stop_loss.to_string(),
            bracket_take_profit_price: request.take_profit.to_string(),
        };
        let body = serde_json::to_string(&dto)
            .map_err(|e| ExchangeError::Parse(format!("Failed to encode order: {e}")))?;

        let placed: OrderPlacedDto = self
            .request(Method::POST, "/v2/orders", "", Some(body))
            .await?;

        info!(
            symbol = %request.symbol,
            side = %request.side,
            qty = %request.qty,
            order_type,
            order_id = placed.id,
            "Order placed"
        );

        Ok(OrderRef::new(placed.id.to_string()))
    }
}

fn parse_order_state(state: &str) -> OrderState {
    match state {
        "open" | "pending" => OrderState::Open,
        "closed" => OrderState::Closed,
        "cancelled" => OrderState::Cancelled,
        other => {
            warn!(state = other, "Unrecognized order state from exchange");
            OrderState::Unknown
        }
    }
}

#[async_trait]
impl MarketData for RestExchange {
    async fn current_price(&self, symbol: &str) -> ExchangeResult<Price> {
        let ticker: TickerDto = self
            .request(Method::GET, &format!("/v2/tickers/{symbol}"), "", None)
            .await?;
        Ok(Price::new(ticker.mark_price))
    }

    async fn ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ExchangeResult<Vec<Candle>> {
        let query = format!(
            "?symbol={symbol}&resolution={}&start={}&end={}",
            timeframe.as_str(),
            from.timestamp(),
            to.timestamp()
        );
        let dtos: Vec<CandleDto> = self
            .request(Method::GET, "/v2/history/candles", &query, None)
            .await?;

        debug!(symbol, timeframe = %timeframe, count = dtos.len(), "Fetched candles");

        let mut candles: Vec<Candle> = dtos
            .into_iter()
            .filter_map(|dto| {
                let time = Utc.timestamp_opt(dto.time, 0).single()?;
                Some(Candle {
                    time,
                    open: Price::new(dto.open),
                    high: Price::new(dto.high),
                    low: Price::new(dto.low),
                    close: Price::new(dto.close),
                    volume: dto.volume,
                })
            })
            .collect();
        candles.sort_by_key(|c| c.time);
        Ok(candles)
    }

    async fn orderbook(&self, symbol: &str) -> ExchangeResult<Orderbook> {
        let dto: OrderbookDto = self
            .request(Method::GET, &format!("/v2/l2orderbook/{symbol}"), "", None)
            .await?;
        let convert = |levels: Vec<BookLevelDto>| {
            levels
                .into_iter()
                .map(|l| BookLevel {
                    price: Price::new(l.price),
                    size: l.size,
                })
                .collect()
        };
        Ok(Orderbook {
            bids: convert(dto.buy),
            asks: convert(dto.sell),
        })
    }
}

#[async_trait]
impl ExchangeApi for RestExchange {
    async fn wallet_balances(&self) -> ExchangeResult<Vec<WalletBalance>> {
        let dtos: Vec<BalanceDto> = self
            .request(Method::GET, "/v2/wallet/balances", "", None)
            .await?;
        Ok(dtos
            .into_iter()
            .map(|dto| WalletBalance {
                asset: dto.asset_symbol,
                available: dto.available_balance,
            })
            .collect())
    }

    async fn products(&self) -> ExchangeResult<Vec<Product>> {
        let dtos: Vec<ProductDto> = self.request(Method::GET, "/v2/products", "", None).await?;
        Ok(dtos
            .into_iter()
            .map(|dto| Product {
                symbol: dto.symbol,
                contract_value: dto.contract_value,
                tick_size: Price::new(dto.tick_size),
                settling_asset: dto.settling_asset.symbol,
                max_leverage: dto.max_leverage,
            })
            .collect())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()> {
        let body = serde_json::to_string(&LeverageRequest {
            product_symbol: symbol,
            leverage,
        })
        .map_err(|e| ExchangeError::Parse(format!("Failed to encode leverage request: {e}")))?;

        let _: serde_json::Value = self
            .request(Method::POST, "/v2/orders/leverage", "", Some(body))
            .await?;
        debug!(symbol, leverage, "Leverage set");
        Ok(())
    }

    async fn place_market_order_with_bracket(
        &self,
        request: &BracketOrderRequest,
    ) -> ExchangeResult<OrderRef> {
        debug_assert!(request.limit_price.is_none());
        self.place_order(request).await
    }

    async fn place_limit_order_with_bracket(
        &self,
        request: &BracketOrderRequest,
    ) -> ExchangeResult<OrderRef> {
        debug_assert!(request.limit_price.is_some());
        self.place_order(request).await
    }

    async fn order_status(&self, order: &OrderRef) -> ExchangeResult<OrderStatusReport> {
        let dto: OrderStatusDto = self
            .request(
                Method::GET,
                &format!("/v2/orders/{}", order.as_str()),
                "",
                None,
            )
            .await?;

        let filled = match (dto.size, dto.unfilled_size) {
            (Some(size), Some(unfilled)) => size - unfilled,
            (Some(size), None) => size,
            _ => Decimal::ZERO,
        };

        Ok(OrderStatusReport {
            state: parse_order_state(&dto.state),
            filled_qty: Qty::new(filled),
            avg_fill_price: dto.average_fill_price.map(Price::new),
        })
    }

    async fn positions(&self) -> ExchangeResult<Vec<PositionInfo>> {
        let dtos: Vec<PositionDto> = self.request(Method::GET, "/v2/positions", "", None).await?;
        Ok(dtos
            .into_iter()
            .map(|dto| PositionInfo {
                symbol: dto.product_symbol,
                size: dto.size,
                entry_price: dto.entry_price.map(Price::new),
            })
            .collect())
    }
}
