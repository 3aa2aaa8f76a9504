//! Order-lifecycle and limit-trigger engine.
//!
//! The only part of the system with real state-machine and coordination
//! concerns. Everything here is driven by two externally triggered passes:
//!
//! - analysis: sanitized recommendation -> [`ExecutionDecider`] -> exchange
//!   order or [`PendingOrderStore`] entry
//! - monitor: [`MonitorLoop::run_once`] -> pending-order triggers, open-trade
//!   reconciliation, expiry purge
//!
//! Both passes are guarded by a [`PassGuard`] each; overlapping triggers of
//! the same kind are dropped, not queued. Every exchange-visible mutation
//! happens before the matching local write: a `Trade` exists only once the
//! exchange has confirmed placement.

pub mod decider;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod monitor;
pub mod pending;

pub use decider::{Decision, DeciderConfig, ExecutionDecider, RejectReason};
pub use error::{EngineError, EngineResult};
pub use guard::{PassGuard, PassPermit};
pub use ledger::TradeLedger;
pub use monitor::{MonitorConfig, MonitorLoop, MonitorOutcome};
pub use pending::{PendingLimitOrder, PendingOrderId, PendingOrderStore, PendingStoreConfig};
