//! User-tunable trading settings.

use crate::types::TradingMode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Singleton trading settings.
///
/// Created with defaults on first read, mutated by user action, never
/// deleted. Every pass re-reads the stored value so changes apply on the
/// next trigger without a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Position leverage, clamped to [1, 100].
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Fraction of available balance allocated per trade, percent in [10, 100].
    #[serde(default = "default_allocation_pct")]
    pub allocation_pct: Decimal,
    /// Maximum number of concurrently open trades, clamped to [1, 10].
    #[serde(default = "default_max_concurrent_trades")]
    pub max_concurrent_trades: u32,
    /// Trading mode; selects primary timeframe and analysis cadence.
    #[serde(default)]
    pub mode: TradingMode,
    /// Master switch for the analysis pass.
    #[serde(default)]
    pub auto_trading: bool,
}

fn default_leverage() -> u32 {
    10
}

fn default_allocation_pct() -> Decimal {
    dec!(25)
}

fn default_max_concurrent_trades() -> u32 {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            leverage: default_leverage(),
            allocation_pct: default_allocation_pct(),
            max_concurrent_trades: default_max_concurrent_trades(),
            mode: TradingMode::default(),
            auto_trading: false,
        }
    }
}

impl Settings {
    /// Clamp all fields into their allowed ranges.
    ///
    /// Out-of-range values come from hand-edited storage; clamping is
    /// preferred over rejection so a typo cannot stall the agent.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.leverage = self.leverage.clamp(1, 100);
        self.allocation_pct = self.allocation_pct.clamp(dec!(10), dec!(100));
        self.max_concurrent_trades = self.max_concurrent_trades.clamp(1, 10);
        self
    }

    /// Allocation as a plain fraction (25% -> 0.25).
    pub fn allocation_fraction(&self) -> Decimal {
        self.allocation_pct / dec!(100)
    }
}
