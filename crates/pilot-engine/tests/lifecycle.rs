//! End-to-end order lifecycle against mocked collaborators.
//!
//! Walks one limit intent from registration through trigger, market
//! placement, and monitored close, asserting the ordering guarantee along
//! the way: no local trade ever exists without a confirmed exchange order
//! reference.

use chrono::{Duration, Utc};
use pilot_core::{
    Direction, ExecutionStrategy, OrderRef, Price, Qty, Recommendation, Settings, TradeStatus,
};
use pilot_engine::{
    DeciderConfig, Decision, ExecutionDecider, MonitorConfig, MonitorLoop, MonitorOutcome,
    PassGuard, PendingOrderStore, PendingStoreConfig, TradeLedger,
};
use pilot_exchange::{
    ExchangeApi, MockExchangeApi, MockMarketData, OrderState, OrderStatusReport, Product,
    WalletBalance,
};
use pilot_notify::NoopNotifier;
use pilot_persistence::MemoryStore;
use pilot_risk::{sanitize, RiskPolicy};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn product() -> Product {
    Product {
        symbol: "ETHUSD".to_string(),
        contract_value: dec!(0.01),
        tick_size: Price::new(dec!(0.01)),
        settling_asset: "USD".to_string(),
        max_leverage: 100,
    }
}

fn settings() -> Settings {
    Settings {
        auto_trading: true,
        ..Settings::default()
    }
}

struct Harness {
    pending: Arc<PendingOrderStore>,
    decider: Arc<ExecutionDecider>,
    monitor: MonitorLoop,
    store: MemoryStore,
}

fn harness(market: MockMarketData, exchange: MockExchangeApi) -> Harness {
    let store = MemoryStore::new();
    let pending = Arc::new(PendingOrderStore::new(PendingStoreConfig::default()));
    let ledger = Arc::new(TradeLedger::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    ));
    let exchange: Arc<dyn ExchangeApi> = Arc::new(exchange);
    let decider = Arc::new(ExecutionDecider::new(
        Arc::clone(&exchange),
        Arc::clone(&pending),
        Arc::clone(&ledger),
        Arc::new(NoopNotifier),
        RiskPolicy::default(),
        DeciderConfig::default(),
    ));
    let monitor = MonitorLoop::new(
        "ETHUSD",
        Arc::new(market),
        exchange,
        Arc::clone(&pending),
        Arc::clone(&decider),
        ledger,
        Arc::new(NoopNotifier),
        MonitorConfig::default(),
    );
    Harness {
        pending,
        decider,
        monitor,
        store,
    }
}

fn funded_exchange() -> MockExchangeApi {
    let mut exchange = MockExchangeApi::new();
    exchange.expect_products().returning(|| Ok(vec![product()]));
    exchange.expect_wallet_balances().returning(|| {
        Ok(vec![WalletBalance {
            asset: "USD".to_string(),
            available: dec!(1000),
        }])
    });
    exchange
}

/// Advisor output for a limit entry below the current market.
fn limit_recommendation(current: Price, policy: &RiskPolicy) -> Recommendation {
    let raw = Recommendation {
        symbol: "ETHUSD".to_string(),
        direction: Direction::Long,
        entry: Price::new(current.inner() * dec!(0.998)),
        stop: Price::ZERO,
        target: Price::ZERO,
        confidence: 84,
        rationale: "support retest".to_string(),
        strategy: ExecutionStrategy::Limit,
    };
    sanitize(&raw, current, None, policy)
}

#[tokio::test]
async fn limit_intent_full_lifecycle() {
    let policy = RiskPolicy::default();
    let t0 = Utc::now();
    let current = Price::new(dec!(2738.24));

    let mut exchange = funded_exchange();
    exchange.expect_set_leverage().returning(|_, _| Ok(()));
    exchange
        .expect_place_market_order_with_bracket()
        .returning(|_| Ok(OrderRef::new("1001")));

    // First status call: the fresh fill after placement. Later calls (from
    // the monitor pass) report the bracket resolved at the target.
    let mut call = 0;
    exchange.expect_order_status().returning(move |_| {
        call += 1;
        if call == 1 {
            Ok(OrderStatusReport {
                state: OrderState::Open,
                filled_qty: Qty::new(dec!(91)),
                avg_fill_price: Some(Price::new(dec!(2732.80))),
            })
        } else {
            Ok(OrderStatusReport {
                state: OrderState::Closed,
                filled_qty: Qty::new(dec!(91)),
                avg_fill_price: Some(Price::new(dec!(2760.10))),
            })
        }
    });
    exchange.expect_positions().returning(|| Ok(vec![]));

    let mut market = MockMarketData::new();
    let mut price_call = 0;
    market.expect_current_price().returning(move |_| {
        price_call += 1;
        // First monitor pass sees the dip that triggers the intent; later
        // passes see the rally toward the target.
        Ok(Price::new(if price_call == 1 {
            dec!(2732.80)
        } else {
            dec!(2760.00)
        }))
    });

    let h = harness(market, exchange);

    // Analysis pass: sanitized limit recommendation is deferred.
    let rec = limit_recommendation(current, &policy);
    assert!(rec.is_actionable());
    let decision = h
        .decider
        .decide(&rec, &settings(), current, 0, t0)
        .await
        .unwrap();
    assert!(matches!(decision, Decision::Deferred(_)));
    assert_eq!(h.pending.len(), 1);
    assert!(h.store.all_trades().is_empty());

    // Monitor pass at the dip: the intent triggers and fills at market.
    let t1 = t0 + Duration::minutes(2);
    let outcome = h.monitor.run_once(&settings(), t1).await.unwrap();
    let MonitorOutcome::TriggeredEntry(Decision::Placed(trade)) = outcome else {
        panic!("expected a triggered placement");
    };
    assert!(h.pending.is_empty());
    assert_eq!(trade.status, TradeStatus::Open);
    assert!(trade.order_ref.is_some());
    assert_eq!(trade.entry_price.inner(), dec!(2732.80));

    // Monitor pass after the rally (past warm-up): the bracket resolved,
    // fill closest to the target leg, positive PnL.
    let t2 = t1 + Duration::minutes(5);
    let outcome = h.monitor.run_once(&settings(), t2).await.unwrap();
    assert!(matches!(outcome, MonitorOutcome::Reconciled { closed: 1 }));

    let settled = h
        .store
        .all_trades()
        .into_iter()
        .find(|t| t.id == trade.id)
        .unwrap();
    assert_eq!(settled.status, TradeStatus::TpHit);
    assert!(settled.pnl.unwrap() > Decimal::ZERO);
    assert_eq!(settled.exit_price.unwrap().inner(), dec!(2760.10));
}

#[tokio::test]
async fn guard_drops_overlapping_triggers() {
    let guard = PassGuard::new("monitor");
    let first = guard.try_acquire().expect("first trigger enters");
    assert!(guard.try_acquire().is_none(), "overlap must be a no-op");
    drop(first);
    assert!(guard.try_acquire().is_some());
}

#[tokio::test]
async fn no_trade_without_exchange_confirmation() {
    let mut exchange = funded_exchange();
    exchange.expect_set_leverage().returning(|_, _| Ok(()));
    exchange
        .expect_place_market_order_with_bracket()
        .returning(|_| {
            Err(pilot_exchange::ExchangeError::Http(
                "connection reset".to_string(),
            ))
        });

    let h = harness(MockMarketData::new(), exchange);
    let policy = RiskPolicy::default();
    let current = Price::new(dec!(2738.24));

    let raw = Recommendation {
        symbol: "ETHUSD".to_string(),
        direction: Direction::Long,
        entry: current,
        stop: Price::ZERO,
        target: Price::ZERO,
        confidence: 90,
        rationale: String::new(),
        strategy: ExecutionStrategy::Market,
    };
    let rec = sanitize(&raw, current, None, &policy);

    let result = h
        .decider
        .decide(&rec, &settings(), current, 0, Utc::now())
        .await;
    assert!(result.is_err());
    assert!(h.store.all_trades().is_empty());
}
