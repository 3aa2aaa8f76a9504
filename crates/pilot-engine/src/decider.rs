//! Execution decision logic.
//!
//! # Check Order (Strict)
//!
//! 1. Direction actionable      -> Rejected(NotActionable)
//! 2. Open-trade count           -> Rejected(MaxConcurrentTrades)
//! 3. Collateral / allocation    -> Rejected(InsufficientBalance)
//! 4. Position size >= 1         -> Rejected(PositionTooSmall)
//! 5. Price ordering invariant   -> Rejected(InvalidPriceRelationship)
//! 6. Strategy dispatch:
//!    market                     -> place bracket, persist, notify
//!    limit, too close           -> downgrade to market
//!    limit, unreachable/too far -> Rejected
//!    limit, duplicate           -> Rejected(DuplicatePending)
//!    limit                      -> register pending intent
//!
//! Rejections are values; `Err` means a collaborator failed and nothing
//! was committed beyond what the exchange itself confirmed.

use crate::error::EngineResult;
use crate::ledger::TradeLedger;
use crate::pending::{PendingLimitOrder, PendingOrderId, PendingOrderStore};
use chrono::{DateTime, Utc};
use pilot_core::{Direction, ExecutionStrategy, Price, Qty, Recommendation, Settings, Trade};
use pilot_exchange::{BracketOrderRequest, ExchangeApi, ExchangeError, OrderSide, Product};
use pilot_notify::{Notifier, NotifyEvent};
use pilot_risk::RiskPolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a recommendation was not executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Direction was `None`.
    NotActionable,
    /// Open-trade count at the configured maximum.
    MaxConcurrentTrades,
    /// No collateral, or allocation-adjusted amount non-positive.
    InsufficientBalance,
    /// Sized position came out below one contract.
    PositionTooSmall,
    /// Entry/stop/target ordering violated for the direction.
    InvalidPriceRelationship,
    /// Limit entry on the wrong side of the current price.
    LimitNotReachable,
    /// Limit entry too far from the current price to be safe.
    LimitTooFar,
    /// An active pending intent with this symbol+direction already exists.
    DuplicatePending,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotActionable => "not_actionable",
            Self::MaxConcurrentTrades => "max_concurrent_trades",
            Self::InsufficientBalance => "insufficient_balance",
            Self::PositionTooSmall => "position_too_small",
            Self::InvalidPriceRelationship => "invalid_price_relationship",
            Self::LimitNotReachable => "limit_not_reachable",
            Self::LimitTooFar => "limit_too_far",
            Self::DuplicatePending => "duplicate_pending",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one execution decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Order placed and confirmed; the trade record it produced.
    Placed(Trade),
    /// Deferred as a pending limit intent.
    Deferred(PendingOrderId),
    /// Expected rejection; nothing happened.
    Rejected(RejectReason),
}

impl Decision {
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed(_))
    }
}

/// Tuning for the limit-vs-market decision window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeciderConfig {
    /// Below this deviation a limit entry is not worth waiting for and is
    /// downgraded to market. Plain fraction.
    #[serde(default = "default_min_limit_deviation")]
    pub min_limit_deviation: Decimal,
    /// Above this deviation a limit entry is considered unsafe. Plain
    /// fraction.
    #[serde(default = "default_max_limit_deviation")]
    pub max_limit_deviation: Decimal,
}

fn default_min_limit_deviation() -> Decimal {
    dec!(0.001)
}

fn default_max_limit_deviation() -> Decimal {
    dec!(0.02)
}

impl Default for DeciderConfig {
    fn default() -> Self {
        Self {
            min_limit_deviation: default_min_limit_deviation(),
            max_limit_deviation: default_max_limit_deviation(),
        }
    }
}

/// Turns sanitized recommendations into orders or pending intents.
pub struct ExecutionDecider {
    exchange: Arc<dyn ExchangeApi>,
    pending: Arc<PendingOrderStore>,
    ledger: Arc<TradeLedger>,
    notifier: Arc<dyn Notifier>,
    policy: RiskPolicy,
    config: DeciderConfig,
}

impl ExecutionDecider {
    pub fn new(
        exchange: Arc<dyn ExchangeApi>,
        pending: Arc<PendingOrderStore>,
        ledger: Arc<TradeLedger>,
        notifier: Arc<dyn Notifier>,
        policy: RiskPolicy,
        config: DeciderConfig,
    ) -> Self {
        Self {
            exchange,
            pending,
            ledger,
            notifier,
            policy,
            config,
        }
    }

    /// Decide and execute one sanitized recommendation.
    pub async fn decide(
        &self,
        rec: &Recommendation,
        settings: &Settings,
        current: Price,
        open_trades: usize,
        now: DateTime<Utc>,
    ) -> EngineResult<Decision> {
        if !rec.is_actionable() {
            return Ok(Decision::Rejected(RejectReason::NotActionable));
        }
        if open_trades >= settings.max_concurrent_trades as usize {
            debug!(open_trades, max = settings.max_concurrent_trades, "Trade limit reached");
            return Ok(Decision::Rejected(RejectReason::MaxConcurrentTrades));
        }

        let product = self.find_product(&rec.symbol).await?;
        let leverage = settings.leverage.min(product.max_leverage);

        let Some(allocated) = self.allocated_collateral(&product, settings).await? else {
            return Ok(Decision::Rejected(RejectReason::InsufficientBalance));
        };

        let qty = Qty::from_allocation(allocated, leverage, product.contract_value, rec.entry);
        let qty = match qty {
            Some(q) if q.inner() >= Decimal::ONE => q,
            _ => {
                debug!(allocated = %allocated, entry = %rec.entry, "Sized below one contract");
                return Ok(Decision::Rejected(RejectReason::PositionTooSmall));
            }
        };

        if !rec.prices_ordered() {
            warn!(
                symbol = %rec.symbol,
                direction = %rec.direction,
                entry = %rec.entry,
                stop = %rec.stop,
                target = %rec.target,
                "Price relationship invalid after sanitization"
            );
            return Ok(Decision::Rejected(RejectReason::InvalidPriceRelationship));
        }

        match rec.strategy {
            ExecutionStrategy::Market => {
                self.place_market(rec, leverage, current, qty, &product, now).await
            }
            ExecutionStrategy::Limit => {
                self.defer_or_downgrade(rec, leverage, current, qty, &product, now).await
            }
        }
    }

    /// Execute a triggered pending intent as a market order.
    ///
    /// The trigger price becomes the entry; the bracket is recomputed
    /// around it with the same policy rule used at sanitization.
    pub async fn execute_triggered(
        &self,
        order: PendingLimitOrder,
        settings: &Settings,
        current: Price,
        open_trades: usize,
        now: DateTime<Utc>,
    ) -> EngineResult<Decision> {
        let (stop, target) = bracket_around(current, order.recommendation.direction, &self.policy);
        let rec = Recommendation {
            entry: current,
            stop,
            target,
            strategy: ExecutionStrategy::Market,
            ..order.recommendation
        };
        info!(
            id = %order.id,
            symbol = %rec.symbol,
            trigger_price = %current,
            "Executing triggered limit intent at market"
        );
        self.decide(&rec, settings, current, open_trades, now).await
    }

    async fn defer_or_downgrade(
        &self,
        rec: &Recommendation,
        leverage: u32,
        current: Price,
        qty: Qty,
        product: &Product,
        now: DateTime<Utc>,
    ) -> EngineResult<Decision> {
        let reachable = match rec.direction {
            Direction::Long => rec.entry < current,
            Direction::Short => rec.entry > current,
            Direction::None => false,
        };
        if !reachable {
            debug!(entry = %rec.entry, current = %current, "Limit entry not reachable");
            return Ok(Decision::Rejected(RejectReason::LimitNotReachable));
        }

        let Some(deviation) = rec.entry.deviation_from(current) else {
            return Ok(Decision::Rejected(RejectReason::LimitNotReachable));
        };
        if deviation < self.config.min_limit_deviation {
            debug!(
                deviation = %deviation,
                "Limit entry too close to market, downgrading to market order"
            );
            return self.place_market(rec, leverage, current, qty, product, now).await;
        }
        if deviation > self.config.max_limit_deviation {
            debug!(deviation = %deviation, "Limit entry too far from market");
            return Ok(Decision::Rejected(RejectReason::LimitTooFar));
        }

        if self.pending.has_active(&rec.symbol, rec.direction, now) {
            return Ok(Decision::Rejected(RejectReason::DuplicatePending));
        }
        match self.pending.try_add(rec.clone(), current, now) {
            Some(id) => Ok(Decision::Deferred(id)),
            None => Ok(Decision::Rejected(RejectReason::DuplicatePending)),
        }
    }

    async fn place_market(
        &self,
        rec: &Recommendation,
        leverage: u32,
        current: Price,
        qty: Qty,
        product: &Product,
        now: DateTime<Utc>,
    ) -> EngineResult<Decision> {
        let Some(side) = OrderSide::from_direction(rec.direction) else {
            return Ok(Decision::Rejected(RejectReason::NotActionable));
        };

        self.exchange.set_leverage(&rec.symbol, leverage).await?;

        // Bracket legs are computed from the execution reference price, the
        // best estimate of the fill available before placement.
        let (stop, target) = bracket_around(current, rec.direction, &self.policy);
        let request = BracketOrderRequest::market(
            &rec.symbol,
            side,
            qty,
            stop.round_to_tick(product.tick_size),
            target.round_to_tick(product.tick_size),
        );
        let order_ref = self.exchange.place_market_order_with_bracket(&request).await?;

        // Prefer the confirmed fill for the local record. A status failure
        // here is harmless: the monitor pass reconciles from the exchange.
        let fill = match self.exchange.order_status(&order_ref).await {
            Ok(report) => report.avg_fill_price.unwrap_or(current),
            Err(e) => {
                warn!(error = %e, "Fill lookup failed after placement, using reference price");
                current
            }
        };
        let (stop, target) = if fill == current {
            (stop, target)
        } else {
            bracket_around(fill, rec.direction, &self.policy)
        };

        let trade = Trade::open(
            rec.symbol.clone(),
            rec.direction,
            fill,
            qty,
            leverage,
            stop,
            target,
            rec.confidence,
            order_ref,
            now,
        );
        self.ledger.record_entry(&trade).await?;

        // Fire-and-forget: the notifier logs its own failures.
        self.notifier
            .notify(&NotifyEvent::TradeOpened {
                symbol: trade.symbol.clone(),
                direction: trade.direction,
                entry_price: trade.entry_price,
                quantity: trade.quantity,
                leverage: trade.leverage,
                stop_loss: trade.stop_loss,
                take_profit: trade.take_profit,
            })
            .await;

        Ok(Decision::Placed(trade))
    }

    async fn find_product(&self, symbol: &str) -> EngineResult<Product> {
        let products = self.exchange.products().await?;
        products
            .into_iter()
            .find(|p| p.symbol == symbol)
            .ok_or_else(|| ExchangeError::MissingData(format!("unknown product {symbol}")).into())
    }

    /// Allocation-adjusted collateral, or None when there is nothing to trade with.
    async fn allocated_collateral(
        &self,
        product: &Product,
        settings: &Settings,
    ) -> EngineResult<Option<Decimal>> {
        let balances = self.exchange.wallet_balances().await?;
        let available = balances
            .iter()
            .find(|b| b.asset == product.settling_asset)
            .map(|b| b.available)
            .unwrap_or(Decimal::ZERO);
        if available <= Decimal::ZERO {
            return Ok(None);
        }
        let allocated = available * settings.allocation_fraction();
        Ok((allocated > Decimal::ZERO).then_some(allocated))
    }
}

/// Stop and target around a reference price, by the sanitization rule.
pub(crate) fn bracket_around(
    reference: Price,
    direction: Direction,
    policy: &RiskPolicy,
) -> (Price, Price) {
    let sign = Decimal::from(direction.sign());
    let stop = reference.offset_frac(-sign * policy.stop_distance);
    let risk = reference.distance(stop);
    let target = Price::new(reference.inner() + sign * policy.reward_multiple * risk);
    (stop, target)
}
