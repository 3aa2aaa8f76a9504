//! Main application orchestration.
//!
//! Wires the collaborators together and drives the two cadences:
//! - monitor pass every few seconds (pending triggers, trade reconciliation)
//! - analysis pass on the trading mode's cadence (advisor -> sanitizer ->
//!   execution decision)
//!
//! Each cadence is guarded by its own `PassGuard`; an overlapping trigger
//! of the same kind is dropped. Every pass failure degrades to "nothing
//! this cycle"; nothing here is fatal to the process.

use crate::config::BotConfig;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use pilot_advisor::{Advisor, LlmAdvisor};
use pilot_core::{AnalysisRecord, Recommendation, Settings};
use pilot_engine::{
    Decision, ExecutionDecider, MonitorLoop, MonitorOutcome, PassGuard, PendingOrderStore,
    TradeLedger,
};
use pilot_exchange::{ExchangeApi, MarketData, MarketSnapshot, RestExchange};
use pilot_notify::{NoopNotifier, Notifier, WebhookNotifier};
use pilot_persistence::{AnalysisStore, JsonStore, PerformanceStore, SettingsStore};
use pilot_risk::sanitize;
use pilot_telemetry::Metrics;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Candles fetched per timeframe for the advisor snapshot.
const CANDLE_HISTORY: i64 = 100;

/// Daily performance log interval.
const DAILY_STATS_INTERVAL: Duration = Duration::from_secs(3600);

/// Main application.
pub struct Application {
    config: BotConfig,
    market: Arc<dyn MarketData>,
    advisor: Option<Arc<dyn Advisor>>,
    settings_store: Arc<dyn SettingsStore>,
    analysis_store: Arc<dyn AnalysisStore>,
    performance_store: Arc<dyn PerformanceStore>,
    pending: Arc<PendingOrderStore>,
    decider: Arc<ExecutionDecider>,
    ledger: Arc<TradeLedger>,
    monitor: MonitorLoop,
    analysis_guard: PassGuard,
    monitor_guard: PassGuard,
    metrics: Metrics,
}

impl Application {
    /// Build all components from configuration and environment.
    pub fn new(config: BotConfig) -> AppResult<Self> {
        let api_key = std::env::var(&config.exchange.api_key_env).map_err(|_| {
            AppError::Config(format!("{} is not set", config.exchange.api_key_env))
        })?;
        let api_secret = std::env::var(&config.exchange.api_secret_env).map_err(|_| {
            AppError::Config(format!("{} is not set", config.exchange.api_secret_env))
        })?;

        let rest = Arc::new(RestExchange::new(
            &config.exchange.base_url,
            api_key,
            api_secret,
        )?);
        let market: Arc<dyn MarketData> = rest.clone();
        let exchange: Arc<dyn ExchangeApi> = rest;

        let advisor: Option<Arc<dyn Advisor>> =
            match std::env::var(&config.advisor.api_key_env) {
                Ok(key) => {
                    let mut client = LlmAdvisor::new(key)?;
                    if let Some(model) = &config.advisor.model {
                        client = client.with_model(model);
                    }
                    if let Some(url) = &config.advisor.api_url {
                        client = client.with_api_url(url);
                    }
                    Some(Arc::new(client))
                }
                Err(_) => {
                    warn!(
                        env = %config.advisor.api_key_env,
                        "Advisor key not set, running monitor-only"
                    );
                    None
                }
            };

        let notifier: Arc<dyn Notifier> = match &config.notify.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url)),
            None => Arc::new(NoopNotifier),
        };

        let store = Arc::new(JsonStore::open(&config.persistence.data_dir)?);
        let settings_store: Arc<dyn SettingsStore> = store.clone();
        let analysis_store: Arc<dyn AnalysisStore> = store.clone();
        let performance_store: Arc<dyn PerformanceStore> = store.clone();

        let pending = Arc::new(PendingOrderStore::new(config.pending.clone()));
        let ledger = Arc::new(TradeLedger::new(store.clone(), store.clone()));
        let decider = Arc::new(ExecutionDecider::new(
            Arc::clone(&exchange),
            Arc::clone(&pending),
            Arc::clone(&ledger),
            Arc::clone(&notifier),
            config.risk.clone(),
            config.decider.clone(),
        ));
        let monitor = MonitorLoop::new(
            config.symbol.clone(),
            Arc::clone(&market),
            exchange,
            Arc::clone(&pending),
            Arc::clone(&decider),
            Arc::clone(&ledger),
            notifier,
            config.monitor.clone(),
        );

        let metrics = Metrics::new()?;

        Ok(Self {
            config,
            market,
            advisor,
            settings_store,
            analysis_store,
            performance_store,
            pending,
            decider,
            ledger,
            monitor,
            analysis_guard: PassGuard::new("analysis"),
            monitor_guard: PassGuard::new("monitor"),
            metrics,
        })
    }

    /// Run until ctrl-c.
    pub async fn run(self) -> AppResult<()> {
        let settings = self.load_or_init_settings().await?;
        let mut analysis_every = settings.mode.analysis_cadence();
        info!(
            symbol = %self.config.symbol,
            mode = %settings.mode,
            auto_trading = settings.auto_trading,
            monitor_secs = self.config.monitor_interval_secs,
            analysis_secs = analysis_every.as_secs(),
            "Starting perp-pilot"
        );

        let mut monitor_tick =
            tokio::time::interval(Duration::from_secs(self.config.monitor_interval_secs));
        monitor_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut analysis_tick = tokio::time::interval(analysis_every);
        analysis_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats_tick = tokio::time::interval(DAILY_STATS_INTERVAL);
        stats_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = monitor_tick.tick() => {
                    self.monitor_pass().await;
                }
                _ = analysis_tick.tick() => {
                    self.analysis_pass().await;
                    // Pick up a mode change without a restart.
                    if let Ok(Some(updated)) = self.settings_store.load().await {
                        let cadence = updated.validated().mode.analysis_cadence();
                        if cadence != analysis_every {
                            info!(analysis_secs = cadence.as_secs(), "Analysis cadence changed");
                            analysis_every = cadence;
                            analysis_tick = tokio::time::interval_at(
                                tokio::time::Instant::now() + cadence,
                                cadence,
                            );
                            analysis_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        }
                    }
                }
                _ = stats_tick.tick() => {
                    self.log_daily_stats().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(
            pending = self.pending.len(),
            "Stopped; pending limit intents are dropped (in-memory only)"
        );
        Ok(())
    }

    /// One monitor pass behind its guard.
    async fn monitor_pass(&self) {
        let Some(_permit) = self.monitor_guard.try_acquire() else {
            self.metrics.passes_dropped.with_label_values(&["monitor"]).inc();
            return;
        };
        self.metrics.monitor_passes.inc();

        let settings = match self.load_or_init_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Settings unavailable, skipping monitor pass");
                return;
            }
        };

        match self.monitor.run_once(&settings, Utc::now()).await {
            Ok(MonitorOutcome::TriggeredEntry(decision)) => {
                self.record_decision(&decision);
            }
            Ok(MonitorOutcome::Reconciled { closed }) => {
                self.metrics.trades_closed.inc_by(closed as u64);
            }
            Ok(MonitorOutcome::Idle) => {}
            Err(e) => {
                warn!(error = %e, "Monitor pass failed, no action this cycle");
            }
        }
    }

    /// One analysis pass behind its guard.
    async fn analysis_pass(&self) {
        let Some(_permit) = self.analysis_guard.try_acquire() else {
            self.metrics.passes_dropped.with_label_values(&["analysis"]).inc();
            return;
        };
        self.metrics.analysis_passes.inc();

        let settings = match self.load_or_init_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Settings unavailable, skipping analysis pass");
                return;
            }
        };
        if !settings.auto_trading {
            debug!("Auto-trading disabled, skipping analysis pass");
            return;
        }
        let Some(advisor) = &self.advisor else {
            debug!("No advisor configured, skipping analysis pass");
            return;
        };

        let now = Utc::now();
        let snapshot = match self.build_snapshot(&settings, now).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Market data unavailable, skipping analysis pass");
                return;
            }
        };

        let raw = match advisor.analyze(&snapshot, settings.mode).await {
            Ok(rec) => rec,
            Err(e) => {
                warn!(error = %e, "Advisor failed, treating as no trade");
                Recommendation::no_trade(&self.config.symbol, "advisor unavailable")
            }
        };

        let last_close = snapshot.last_close(settings.mode.primary_timeframe());
        let sanitized = sanitize(&raw, snapshot.price, last_close, &self.config.risk);

        let record = AnalysisRecord::new(settings.mode, snapshot.price, raw, sanitized.clone(), now);
        if let Err(e) = self.analysis_store.append(&record).await {
            warn!(error = %e, "Failed to persist analysis record");
        }

        if !sanitized.is_actionable() {
            debug!(rationale = %sanitized.rationale, "No trade this pass");
            return;
        }

        let open_trades = match self.ledger.open_trades().await {
            Ok(trades) => trades.len(),
            Err(e) => {
                warn!(error = %e, "Open-trade count unavailable, skipping execution");
                return;
            }
        };

        match self
            .decider
            .decide(&sanitized, &settings, snapshot.price, open_trades, now)
            .await
        {
            Ok(decision) => self.record_decision(&decision),
            Err(e) => {
                warn!(error = %e, "Execution failed, no order this cycle");
            }
        }
    }

    /// Assemble the advisor snapshot: price, candles per timeframe, book.
    async fn build_snapshot(
        &self,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> AppResult<MarketSnapshot> {
        let symbol = &self.config.symbol;
        let price = self.market.current_price(symbol).await?;

        let mut candles = HashMap::new();
        for timeframe in settings.mode.timeframes() {
            let from = now - chrono::Duration::minutes(timeframe.minutes() as i64 * CANDLE_HISTORY);
            let batch = self.market.ohlcv(symbol, *timeframe, from, now).await?;
            candles.insert(*timeframe, batch);
        }
        let orderbook = self.market.orderbook(symbol).await?;

        Ok(MarketSnapshot {
            symbol: symbol.clone(),
            price,
            candles,
            orderbook,
            taken_at: now,
        })
    }

    /// Load stored settings, creating defaults on first read.
    async fn load_or_init_settings(&self) -> AppResult<Settings> {
        if let Some(settings) = self.settings_store.load().await? {
            return Ok(settings.validated());
        }
        let defaults = Settings::default();
        self.settings_store.save(&defaults).await?;
        info!("Settings created with defaults");
        Ok(defaults)
    }

    fn record_decision(&self, decision: &Decision) {
        match decision {
            Decision::Placed(trade) => {
                self.metrics.orders_placed.inc();
                info!(
                    id = %trade.id,
                    symbol = %trade.symbol,
                    direction = %trade.direction,
                    entry = %trade.entry_price,
                    "Order placed"
                );
            }
            Decision::Deferred(id) => {
                self.metrics.orders_deferred.inc();
                info!(pending_id = %id, "Order deferred as limit intent");
            }
            Decision::Rejected(reason) => {
                let label = reason.to_string();
                self.metrics.rejections.with_label_values(&[label.as_str()]).inc();
                info!(reason = %reason, "Recommendation rejected");
            }
        }
    }

    async fn log_daily_stats(&self) {
        match self.performance_store.get(Utc::now().date_naive()).await {
            Ok(Some(day)) => {
                info!(
                    date = %day.date,
                    total_pnl = %day.total_pnl,
                    trades = day.total_trades,
                    win_rate = %day.win_rate,
                    largest_win = %day.largest_win,
                    largest_loss = %day.largest_loss,
                    "Daily performance"
                );
            }
            Ok(None) => debug!("No closed trades today"),
            Err(e) => warn!(error = %e, "Daily performance unavailable"),
        }
    }
}
