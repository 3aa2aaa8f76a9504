//! Trading enums, advisor output, and identifier types.

use crate::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Directional view of a recommendation.
///
/// `None` is the canonical "no trade" value: it survives serialization and
/// keeps rejection paths as plain data instead of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    #[default]
    None,
}

impl Direction {
    /// Returns 1 for long, -1 for short, 0 for none (for PnL math).
    pub fn sign(&self) -> i8 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
            Self::None => 0,
        }
    }

    /// True when this direction can be executed.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
            Self::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            "none" => Ok(Self::None),
            other => Err(crate::CoreError::InvalidDirection(other.to_string())),
        }
    }
}

/// Execution strategy hint from the advisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// Execute immediately at the current price.
    #[default]
    Market,
    /// Wait for the price to reach the recommended entry.
    Limit,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Limit => write!(f, "limit"),
        }
    }
}

/// Candle timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Wire representation used by exchange candle endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }

    /// Candle duration in minutes.
    pub fn minutes(&self) -> u32 {
        match self {
            Self::M1 => 1,
            Self::M5 => 5,
            Self::M15 => 15,
            Self::H1 => 60,
            Self::H4 => 240,
            Self::D1 => 1440,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trading mode, binding a primary timeframe to an analysis cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Scalping,
    #[default]
    Intraday,
    Swing,
    Longterm,
}

impl TradingMode {
    /// The timeframe the advisor reasons on primarily.
    pub fn primary_timeframe(&self) -> Timeframe {
        match self {
            Self::Scalping => Timeframe::M5,
            Self::Intraday => Timeframe::M15,
            Self::Swing => Timeframe::H4,
            Self::Longterm => Timeframe::D1,
        }
    }

    /// Context timeframes fetched alongside the primary one.
    pub fn timeframes(&self) -> &'static [Timeframe] {
        match self {
            Self::Scalping => &[Timeframe::M5, Timeframe::M15, Timeframe::H1],
            Self::Intraday => &[Timeframe::M15, Timeframe::H1, Timeframe::H4],
            Self::Swing => &[Timeframe::H1, Timeframe::H4, Timeframe::D1],
            Self::Longterm => &[Timeframe::H4, Timeframe::D1],
        }
    }

    /// How often the analysis pass runs in this mode.
    pub fn analysis_cadence(&self) -> Duration {
        match self {
            Self::Scalping => Duration::from_secs(15 * 60),
            Self::Intraday => Duration::from_secs(60 * 60),
            Self::Swing => Duration::from_secs(6 * 60 * 60),
            Self::Longterm => Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalping => write!(f, "scalping"),
            Self::Intraday => write!(f, "intraday"),
            Self::Swing => write!(f, "swing"),
            Self::Longterm => write!(f, "longterm"),
        }
    }
}

/// Exchange order reference.
///
/// Opaque handle returned by the exchange on placement; a local `Trade` is
/// only ever created once one of these exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderRef(String);

impl OrderRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for OrderRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A directional trading recommendation.
///
/// Produced by the advisor, clamped by the risk sanitizer before it may
/// reach execution. Invariant after sanitization with an actionable
/// direction: long implies stop < entry < target, short implies
/// target < entry < stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Asset symbol (e.g. "ETHUSD").
    pub symbol: String,
    /// Directional view; `None` means no trade.
    pub direction: Direction,
    /// Suggested entry price.
    pub entry: Price,
    /// Stop-loss price.
    pub stop: Price,
    /// Take-profit price.
    pub target: Price,
    /// Confidence in [0, 100]. Below the policy threshold nothing executes.
    pub confidence: u8,
    /// Free-text rationale from the advisor.
    pub rationale: String,
    /// Market or limit execution hint.
    pub strategy: ExecutionStrategy,
}

impl Recommendation {
    /// The canonical "no trade" value for a symbol.
    pub fn no_trade(symbol: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            direction: Direction::None,
            entry: Price::ZERO,
            stop: Price::ZERO,
            target: Price::ZERO,
            confidence: 0,
            rationale: rationale.into(),
            strategy: ExecutionStrategy::Market,
        }
    }

    /// True when the direction is actionable.
    pub fn is_actionable(&self) -> bool {
        self.direction.is_actionable()
    }

    /// Check the directional ordering invariant on entry/stop/target.
    pub fn prices_ordered(&self) -> bool {
        match self.direction {
            Direction::Long => self.stop < self.entry && self.entry < self.target,
            Direction::Short => self.target < self.entry && self.entry < self.stop,
            Direction::None => false,
        }
    }
}

/// Persisted audit record of one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Unique record id.
    pub id: String,
    /// Asset symbol analyzed.
    pub symbol: String,
    /// Trading mode at the time of analysis.
    pub mode: TradingMode,
    /// Market price observed when the pass ran.
    pub price: Price,
    /// Recommendation as returned by the advisor.
    pub raw: Recommendation,
    /// Recommendation after sanitization.
    pub sanitized: Recommendation,
    /// When the pass ran.
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(
        mode: TradingMode,
        price: Price,
        raw: Recommendation,
        sanitized: Recommendation,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            symbol: raw.symbol.clone(),
            mode,
            price,
            raw,
            sanitized,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Long.sign(), 1);
        assert_eq!(Direction::Short.sign(), -1);
        assert_eq!(Direction::None.sign(), 0);
    }

    #[test]
    fn test_mode_cadence_ordering() {
        let modes = [
            TradingMode::Scalping,
            TradingMode::Intraday,
            TradingMode::Swing,
            TradingMode::Longterm,
        ];
        for pair in modes.windows(2) {
            assert!(pair[0].analysis_cadence() < pair[1].analysis_cadence());
        }
    }

    #[test]
    fn test_mode_timeframes_contain_primary() {
        for mode in [
            TradingMode::Scalping,
            TradingMode::Intraday,
            TradingMode::Swing,
            TradingMode::Longterm,
        ] {
            assert!(mode.timeframes().contains(&mode.primary_timeframe()));
        }
    }

    #[test]
    fn test_no_trade_is_not_actionable() {
        let rec = Recommendation::no_trade("ETHUSD", "advisor unavailable");
        assert!(!rec.is_actionable());
        assert_eq!(rec.confidence, 0);
        assert!(!rec.prices_ordered());
    }

    #[test]
    fn test_prices_ordered_long() {
        let rec = Recommendation {
            symbol: "ETHUSD".to_string(),
            direction: Direction::Long,
            entry: Price::new(dec!(2700)),
            stop: Price::new(dec!(2685)),
            target: Price::new(dec!(2730)),
            confidence: 80,
            rationale: String::new(),
            strategy: ExecutionStrategy::Market,
        };
        assert!(rec.prices_ordered());

        let mut inverted = rec.clone();
        inverted.direction = Direction::Short;
        assert!(!inverted.prices_ordered());
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("LONG".parse::<Direction>().unwrap(), Direction::Long);
        assert_eq!("short".parse::<Direction>().unwrap(), Direction::Short);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Long).unwrap(), "\"long\"");
        assert_eq!(
            serde_json::from_str::<Direction>("\"none\"").unwrap(),
            Direction::None
        );
    }
}
