//! In-memory registry of not-yet-filled limit intents.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use pilot_core::{Direction, Price, Recommendation};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque pending-order id.
///
/// Format: `pp_{timestamp_ms}_{uuid_short}`, unique per process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingOrderId(String);

impl PendingOrderId {
    fn generate(now: DateTime<Utc>) -> Self {
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("pp_{}_{uuid_short}", now.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PendingOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A deferred limit intent, owned by the store while unfilled.
///
/// State machine: pending -> triggered | expired | cancelled. All three
/// transitions remove the entry; there is no resurrection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLimitOrder {
    pub id: PendingOrderId,
    /// The sanitized recommendation this intent came from.
    pub recommendation: Recommendation,
    /// Market price observed when the intent was registered.
    pub price_at_creation: Price,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingLimitOrder {
    /// TTL elapsed with no trigger.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the live price satisfies the trigger condition.
    ///
    /// Long intents trigger when the price falls to the target entry (with
    /// tolerance above it); short intents when it rises to it (with
    /// tolerance below). `tolerance` is a plain fraction.
    pub fn is_triggered(&self, current: Price, tolerance: Decimal) -> bool {
        let entry = self.recommendation.entry;
        match self.recommendation.direction {
            Direction::Long => current <= entry.offset_frac(tolerance),
            Direction::Short => current >= entry.offset_frac(-tolerance),
            Direction::None => false,
        }
    }
}

/// Tuning for the pending-order store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingStoreConfig {
    /// Time-to-live of an intent in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,
    /// Trigger tolerance as a plain fraction.
    #[serde(default = "default_trigger_tolerance")]
    pub trigger_tolerance: Decimal,
}

fn default_ttl_secs() -> i64 {
    15 * 60
}

fn default_trigger_tolerance() -> Decimal {
    dec!(0.001)
}

impl Default for PendingStoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            trigger_tolerance: default_trigger_tolerance(),
        }
    }
}

/// In-memory registry of pending limit intents.
///
/// The single mutable shared resource of the engine. Both cadences reach it
/// through their pass guards, so the mutex below is never contended in
/// normal operation; it exists so the type is `Sync` without further
/// ceremony.
pub struct PendingOrderStore {
    entries: Mutex<HashMap<PendingOrderId, PendingLimitOrder>>,
    config: PendingStoreConfig,
}

impl PendingOrderStore {
    #[must_use]
    pub fn new(config: PendingStoreConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Register a limit intent.
    ///
    /// Returns None when an active (non-expired) intent with the same
    /// symbol and direction already exists; a second one would double the
    /// exposure on trigger.
    pub fn try_add(
        &self,
        recommendation: Recommendation,
        current: Price,
        now: DateTime<Utc>,
    ) -> Option<PendingOrderId> {
        let mut entries = self.entries.lock();
        let duplicate = entries.values().any(|entry| {
            !entry.is_expired(now)
                && entry.recommendation.symbol == recommendation.symbol
                && entry.recommendation.direction == recommendation.direction
        });
        if duplicate {
            debug!(
                symbol = %recommendation.symbol,
                direction = %recommendation.direction,
                "Duplicate pending intent refused"
            );
            return None;
        }

        let id = PendingOrderId::generate(now);
        let order = PendingLimitOrder {
            id: id.clone(),
            recommendation,
            price_at_creation: current,
            created_at: now,
            expires_at: now + Duration::seconds(self.config.ttl_secs),
        };
        info!(
            id = %id,
            symbol = %order.recommendation.symbol,
            direction = %order.recommendation.direction,
            entry = %order.recommendation.entry,
            expires_at = %order.expires_at,
            "Pending limit intent registered"
        );
        entries.insert(id.clone(), order);
        Some(id)
    }

    /// Scan for a trigger at the given price.
    ///
    /// Expired entries are purged first and never returned as triggers. At
    /// most one trigger is returned per invocation (first match; scan order
    /// otherwise unspecified); callers re-invoke to process further
    /// triggers. The returned entry has been removed from the store.
    pub fn check_pending(&self, current: Price, now: DateTime<Utc>) -> Option<PendingLimitOrder> {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| !entry.is_expired(now));

        let triggered_id = entries
            .values()
            .find(|entry| entry.is_triggered(current, self.config.trigger_tolerance))
            .map(|entry| entry.id.clone())?;

        let order = entries.remove(&triggered_id);
        if let Some(order) = &order {
            info!(
                id = %order.id,
                symbol = %order.recommendation.symbol,
                current = %current,
                target = %order.recommendation.entry,
                "Pending limit intent triggered"
            );
        }
        order
    }

    /// Remove all expired entries, returning them for notification.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Vec<PendingLimitOrder> {
        let mut entries = self.entries.lock();
        let expired: Vec<PendingOrderId> = entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.id.clone())
            .collect();
        expired
            .iter()
            .filter_map(|id| {
                let order = entries.remove(id);
                if let Some(order) = &order {
                    info!(id = %order.id, symbol = %order.recommendation.symbol, "Pending limit intent expired");
                }
                order
            })
            .collect()
    }

    /// Explicitly cancel an intent.
    pub fn cancel(&self, id: &PendingOrderId) -> Option<PendingLimitOrder> {
        let order = self.entries.lock().remove(id);
        if let Some(order) = &order {
            info!(id = %order.id, "Pending limit intent cancelled");
        }
        order
    }

    /// Whether an active (non-expired) intent exists for symbol+direction.
    pub fn has_active(&self, symbol: &str, direction: Direction, now: DateTime<Utc>) -> bool {
        self.entries.lock().values().any(|entry| {
            !entry.is_expired(now)
                && entry.recommendation.symbol == symbol
                && entry.recommendation.direction == direction
        })
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
