//! The periodic reconciliation pass.

use crate::decider::{Decision, ExecutionDecider};
use crate::error::EngineResult;
use crate::ledger::TradeLedger;
use crate::pending::PendingOrderStore;
use chrono::{DateTime, Utc};
use pilot_core::{Settings, Trade, TradeStatus};
use pilot_exchange::{ExchangeApi, MarketData, OrderState};
use pilot_notify::{Notifier, NotifyEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tuning for the monitor pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Trades younger than this are skipped, to avoid racing the
    /// exchange's own fill propagation. Seconds.
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: i64,
}

fn default_warmup_secs() -> i64 {
    60
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            warmup_secs: default_warmup_secs(),
        }
    }
}

/// What one monitor pass did.
#[derive(Debug)]
pub enum MonitorOutcome {
    /// A pending intent triggered and was handed to the decider.
    TriggeredEntry(Decision),
    /// Open trades were reconciled; how many reached a terminal state.
    Reconciled { closed: usize },
    /// Nothing to do.
    Idle,
}

/// Reconciles pending intents and open trades against exchange state.
///
/// One invocation per monitor trigger, behind the monitor [`PassGuard`]
/// (crate::PassGuard). Sequence per pass: one price fetch, at most one
/// pending trigger (early return), otherwise open-trade reconciliation,
/// and an unconditional expiry purge at the end.
pub struct MonitorLoop {
    symbol: String,
    market: Arc<dyn MarketData>,
    exchange: Arc<dyn ExchangeApi>,
    pending: Arc<PendingOrderStore>,
    decider: Arc<ExecutionDecider>,
    ledger: Arc<TradeLedger>,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
}

impl MonitorLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        market: Arc<dyn MarketData>,
        exchange: Arc<dyn ExchangeApi>,
        pending: Arc<PendingOrderStore>,
        decider: Arc<ExecutionDecider>,
        ledger: Arc<TradeLedger>,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            market,
            exchange,
            pending,
            decider,
            ledger,
            notifier,
            config,
        }
    }

    /// Run one reconciliation pass.
    pub async fn run_once(
        &self,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> EngineResult<MonitorOutcome> {
        let current = self.market.current_price(&self.symbol).await?;

        // One triggered fill per pass is enough at this cadence; further
        // triggers are picked up by the next invocation.
        if let Some(order) = self.pending.check_pending(current, now) {
            let open_trades = self.ledger.open_trades().await?.len();
            let decision = self
                .decider
                .execute_triggered(order, settings, current, open_trades, now)
                .await?;
            return Ok(MonitorOutcome::TriggeredEntry(decision));
        }

        let mut closed = 0;
        for trade in self.ledger.open_trades().await? {
            if self.reconcile_trade(&trade, now).await? {
                closed += 1;
            }
        }

        for expired in self.pending.purge_expired(now) {
            self.notifier
                .notify(&NotifyEvent::LimitOrderExpired {
                    symbol: expired.recommendation.symbol.clone(),
                    direction: expired.recommendation.direction,
                    target_entry: expired.recommendation.entry,
                    expired_at: now,
                })
                .await;
        }

        Ok(if closed > 0 {
            MonitorOutcome::Reconciled { closed }
        } else {
            MonitorOutcome::Idle
        })
    }

    /// Reconcile one open trade. Returns true if it reached a terminal state.
    async fn reconcile_trade(&self, trade: &Trade, now: DateTime<Utc>) -> EngineResult<bool> {
        let Some(order_ref) = &trade.order_ref else {
            // Nothing to reconcile against; data-entry leftovers stay put.
            return Ok(false);
        };
        if trade.age_ms(now) < self.config.warmup_secs * 1000 {
            debug!(id = %trade.id, "Trade inside warm-up window, skipping");
            return Ok(false);
        }

        let report = self.exchange.order_status(order_ref).await?;
        match report.state {
            OrderState::Closed => {
                let positions = self.exchange.positions().await?;
                let still_open = positions
                    .iter()
                    .any(|p| p.symbol == trade.symbol && !p.is_flat());
                if still_open {
                    // The bracket has not resolved yet.
                    return Ok(false);
                }
                let Some(fill) = report.avg_fill_price else {
                    // No realized price reported: leave the trade for the
                    // next pass rather than guess.
                    warn!(id = %trade.id, "Closed order without fill price, deferring");
                    return Ok(false);
                };

                // Whichever bracket leg sits closer to the realized price
                // is the one that fired.
                let status = if fill.distance(trade.stop_loss) <= fill.distance(trade.take_profit)
                {
                    TradeStatus::SlHit
                } else {
                    TradeStatus::TpHit
                };
                let contract_value = self.contract_value(&trade.symbol).await?;
                let settled = self
                    .ledger
                    .settle(trade, status, Some(fill), contract_value, now)
                    .await?;
                self.notify_close(&settled).await;
                Ok(true)
            }
            OrderState::Cancelled if report.filled_qty.is_zero() => {
                info!(id = %trade.id, "Entry order cancelled with no fill");
                self.ledger
                    .settle(trade, TradeStatus::Cancelled, None, Decimal::ONE, now)
                    .await?;
                Ok(true)
            }
            OrderState::Cancelled => {
                // Cancelled with a partial fill is ambiguous; re-evaluate
                // next pass once the exchange state settles.
                warn!(id = %trade.id, filled = %report.filled_qty, "Cancelled with partial fill, deferring");
                Ok(false)
            }
            OrderState::Open | OrderState::Unknown => Ok(false),
        }
    }

    async fn notify_close(&self, trade: &Trade) {
        let (Some(exit_price), Some(pnl), Some(pnl_pct)) =
            (trade.exit_price, trade.pnl, trade.pnl_pct)
        else {
            return;
        };
        self.notifier
            .notify(&NotifyEvent::TradeClosed {
                symbol: trade.symbol.clone(),
                direction: trade.direction,
                status: trade.status,
                exit_price,
                pnl,
                pnl_pct,
            })
            .await;
    }

    async fn contract_value(&self, symbol: &str) -> EngineResult<Decimal> {
        let products = self.exchange.products().await?;
        Ok(products
            .into_iter()
            .find(|p| p.symbol == symbol)
            .map(|p| p.contract_value)
            .unwrap_or(Decimal::ONE))
    }
}
