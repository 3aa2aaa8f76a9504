//! Prometheus metrics for the trading agent.

use crate::error::TelemetryResult;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Counters covering both passes and the order lifecycle.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    /// Analysis passes that actually ran (guard acquired).
    pub analysis_passes: IntCounter,
    /// Monitor passes that actually ran (guard acquired).
    pub monitor_passes: IntCounter,
    /// Triggers dropped because a pass of the same kind was running.
    pub passes_dropped: IntCounterVec,
    /// Orders placed at market (including downgraded and triggered limits).
    pub orders_placed: IntCounter,
    /// Limit intents registered for deferral.
    pub orders_deferred: IntCounter,
    /// Decisions rejected, by reason.
    pub rejections: IntCounterVec,
    /// Trades reaching a terminal state.
    pub trades_closed: IntCounter,
}

impl Metrics {
    /// Create and register all counters on a fresh registry.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let analysis_passes = IntCounter::with_opts(Opts::new(
            "pilot_analysis_passes_total",
            "Analysis passes executed",
        ))?;
        let monitor_passes = IntCounter::with_opts(Opts::new(
            "pilot_monitor_passes_total",
            "Monitor passes executed",
        ))?;
        let passes_dropped = IntCounterVec::new(
            Opts::new("pilot_passes_dropped_total", "Triggers dropped by the pass guard"),
            &["pass"],
        )?;
        let orders_placed = IntCounter::with_opts(Opts::new(
            "pilot_orders_placed_total",
            "Market orders placed and confirmed",
        ))?;
        let orders_deferred = IntCounter::with_opts(Opts::new(
            "pilot_orders_deferred_total",
            "Limit intents registered",
        ))?;
        let rejections = IntCounterVec::new(
            Opts::new("pilot_rejections_total", "Execution decisions rejected"),
            &["reason"],
        )?;
        let trades_closed = IntCounter::with_opts(Opts::new(
            "pilot_trades_closed_total",
            "Trades reaching a terminal state",
        ))?;

        registry.register(Box::new(analysis_passes.clone()))?;
        registry.register(Box::new(monitor_passes.clone()))?;
        registry.register(Box::new(passes_dropped.clone()))?;
        registry.register(Box::new(orders_placed.clone()))?;
        registry.register(Box::new(orders_deferred.clone()))?;
        registry.register(Box::new(rejections.clone()))?;
        registry.register(Box::new(trades_closed.clone()))?;

        Ok(Self {
            registry,
            analysis_passes,
            monitor_passes,
            passes_dropped,
            orders_placed,
            orders_deferred,
            rejections,
            trades_closed,
        })
    }

    /// The registry backing these counters (for exposition).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_register_and_count() {
        let metrics = Metrics::new().unwrap();
        metrics.analysis_passes.inc();
        metrics.rejections.with_label_values(&["max_concurrent_trades"]).inc();
        metrics.trades_closed.inc();

        assert_eq!(metrics.analysis_passes.get(), 1);
        let families = metrics.registry().gather();
        assert!(families.iter().any(|f| f.get_name() == "pilot_rejections_total"));
    }

    #[test]
    fn test_fresh_registries_are_independent() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.monitor_passes.inc();
        assert_eq!(a.monitor_passes.get(), 1);
        assert_eq!(b.monitor_passes.get(), 0);
    }
}
