//! Notification dispatch collaborator.
//!
//! Fire-and-forget by contract: [`Notifier::notify`] returns nothing, and
//! implementations log delivery failures instead of propagating them. A
//! lost notification must never unwind a trade.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pilot_core::{Direction, Price, Qty, TradeStatus};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Events worth telling the user about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotifyEvent {
    TradeOpened {
        symbol: String,
        direction: Direction,
        entry_price: Price,
        quantity: Qty,
        leverage: u32,
        stop_loss: Price,
        take_profit: Price,
    },
    TradeClosed {
        symbol: String,
        direction: Direction,
        status: TradeStatus,
        exit_price: Price,
        pnl: Decimal,
        pnl_pct: Decimal,
    },
    LimitOrderExpired {
        symbol: String,
        direction: Direction,
        target_entry: Price,
        expired_at: DateTime<Utc>,
    },
}

/// Notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Dispatch an event. Must not fail the caller: log and move on.
    async fn notify(&self, event: &NotifyEvent);
}

/// Posts events as JSON to a mail-gateway webhook.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &NotifyEvent) {
        match self.client.post(&self.url).json(event).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(?event, "Notification delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Notification rejected by webhook");
            }
            Err(e) => {
                warn!(error = %e, "Notification delivery failed");
            }
        }
    }
}

/// Discards events; used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, event: &NotifyEvent) {
        debug!(?event, "Notification suppressed (no sink configured)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_serialization_tags() {
        let event = NotifyEvent::TradeClosed {
            symbol: "ETHUSD".to_string(),
            direction: Direction::Long,
            status: TradeStatus::SlHit,
            exit_price: Price::new(dec!(2684)),
            pnl: dec!(-160),
            pnl_pct: dec!(-0.59),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"trade_closed""#));
        assert!(json.contains(r#""status":"sl_hit""#));
    }

    #[tokio::test]
    async fn test_webhook_failure_does_not_propagate() {
        // Unroutable address: delivery fails, notify still returns ().
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/hook");
        notifier
            .notify(&NotifyEvent::LimitOrderExpired {
                symbol: "ETHUSD".to_string(),
                direction: Direction::Short,
                target_entry: Price::new(dec!(2750)),
                expired_at: Utc::now(),
            })
            .await;
    }
}
