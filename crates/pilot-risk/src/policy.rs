//! Named risk policy constants.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Hard bounds applied to every recommendation before execution.
///
/// All values are plain fractions unless noted (0.003 = 0.3%). Tunable via
/// config; the defaults are one internally consistent set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// Minimum advisor confidence for a trade to be eligible (0-100).
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u8,
    /// Maximum tolerated deviation of the recommended entry from the live
    /// price before the entry is overridden.
    #[serde(default = "default_max_entry_deviation")]
    pub max_entry_deviation: Decimal,
    /// Offset applied to the live price when overriding the entry
    /// (long: above current, short: below).
    #[serde(default = "default_entry_nudge")]
    pub entry_nudge: Decimal,
    /// Stop-loss distance from the (possibly overridden) entry.
    #[serde(default = "default_stop_distance")]
    pub stop_distance: Decimal,
    /// Target distance as a multiple of the stop distance.
    #[serde(default = "default_reward_multiple")]
    pub reward_multiple: Decimal,
    /// Minimum acceptable reward:risk ratio.
    #[serde(default = "default_min_risk_reward")]
    pub min_risk_reward: Decimal,
    /// Maximum tolerated gap between the quoted price and the last candle
    /// close; a larger gap means one of the two feeds is lying.
    #[serde(default = "default_max_quote_candle_gap")]
    pub max_quote_candle_gap: Decimal,
}

fn default_min_confidence() -> u8 {
    70
}

fn default_max_entry_deviation() -> Decimal {
    dec!(0.003)
}

fn default_entry_nudge() -> Decimal {
    dec!(0.0015)
}

fn default_stop_distance() -> Decimal {
    dec!(0.005)
}

fn default_reward_multiple() -> Decimal {
    dec!(2.0)
}

fn default_min_risk_reward() -> Decimal {
    dec!(1.5)
}

fn default_max_quote_candle_gap() -> Decimal {
    dec!(0.05)
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            max_entry_deviation: default_max_entry_deviation(),
            entry_nudge: default_entry_nudge(),
            stop_distance: default_stop_distance(),
            reward_multiple: default_reward_multiple(),
            min_risk_reward: default_min_risk_reward(),
            max_quote_candle_gap: default_max_quote_candle_gap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let policy = RiskPolicy::default();
        // The default reward multiple must clear the default R:R floor,
        // otherwise every sanitized recommendation would be rejected.
        assert!(policy.reward_multiple >= policy.min_risk_reward);
        assert!(policy.entry_nudge < policy.max_entry_deviation);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let policy: RiskPolicy = serde_json::from_str(r#"{"min_confidence": 80}"#).unwrap();
        assert_eq!(policy.min_confidence, 80);
        assert_eq!(policy.stop_distance, dec!(0.005));
    }
}
