//! Application configuration.

use crate::error::{AppError, AppResult};
use pilot_engine::{DeciderConfig, MonitorConfig, PendingStoreConfig};
use pilot_risk::RiskPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Exchange connection configuration.
///
/// Credentials are read from the environment, never from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// REST API base URL.
    #[serde(default = "default_exchange_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Environment variable holding the API secret.
    #[serde(default = "default_api_secret_env")]
    pub api_secret_env: String,
}

fn default_exchange_base_url() -> String {
    "https://api.delta.exchange".to_string()
}

fn default_api_key_env() -> String {
    "PILOT_EXCHANGE_KEY".to_string()
}

fn default_api_secret_env() -> String {
    "PILOT_EXCHANGE_SECRET".to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_exchange_base_url(),
            api_key_env: default_api_key_env(),
            api_secret_env: default_api_secret_env(),
        }
    }
}

/// Advisor (LLM) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Environment variable holding the API key. If the variable is unset
    /// the agent runs monitor-only.
    #[serde(default = "default_advisor_key_env")]
    pub api_key_env: String,
    /// Model override; the client default applies when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// Endpoint override (gateways, test servers).
    #[serde(default)]
    pub api_url: Option<String>,
}

fn default_advisor_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_advisor_key_env(),
            model: None,
            api_url: None,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory for the JSON store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Notification configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook URL for trade notifications; none disables dispatch.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// The single symbol this agent trades.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Monitor cadence in seconds. The analysis cadence comes from the
    /// stored settings' trading mode.
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub risk: RiskPolicy,
    #[serde(default)]
    pub pending: PendingStoreConfig,
    #[serde(default)]
    pub decider: DeciderConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_symbol() -> String {
    "ETHUSD".to_string()
}

fn default_monitor_interval_secs() -> u64 {
    10
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            monitor_interval_secs: default_monitor_interval_secs(),
            exchange: ExchangeConfig::default(),
            advisor: AdvisorConfig::default(),
            risk: RiskPolicy::default(),
            pending: PendingStoreConfig::default(),
            decider: DeciderConfig::default(),
            monitor: MonitorConfig::default(),
            persistence: PersistenceConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load from a file when it exists, defaults otherwise.
    pub fn from_file_or_default(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: BotConfig = toml::from_str("").unwrap();
        assert_eq!(config.symbol, "ETHUSD");
        assert_eq!(config.monitor_interval_secs, 10);
        assert_eq!(config.pending.ttl_secs, 900);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: BotConfig = toml::from_str(
            r#"
            symbol = "BTCUSD"

            [risk]
            min_confidence = 80

            [pending]
            ttl_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.symbol, "BTCUSD");
        assert_eq!(config.risk.min_confidence, 80);
        assert_eq!(config.risk.stop_distance, dec!(0.005));
        assert_eq!(config.pending.ttl_secs, 600);
        assert_eq!(config.monitor.warmup_secs, 60);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = BotConfig::from_file_or_default("/nonexistent/pilot.toml").unwrap();
        assert_eq!(config.symbol, "ETHUSD");
    }
}
