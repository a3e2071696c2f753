//! Core business logic module
//!
//! This module contains the ledger's core components:
//! - `state` - Authoritative in-memory stores (balances, events, merges)
//! - `payments` - Scheduled-payment registry with due-time ordering
//! - `engine` - Deterministic operation engine
//! - `shell` - Thread-safe front end with account-granular locking
//! - `traits` - Operation and observer seams

pub mod engine;
pub mod payments;
pub mod shell;
pub mod state;
pub mod traits;

pub use engine::LedgerEngine;
pub use payments::{PaymentInfo, PaymentRegistry};
pub use shell::ConcurrentLedger;
pub use state::{AccountSnapshot, LedgerState, MergeEdge};
pub use traits::{CommitSink, Ledger, MoneyMovement, MovementKind, RiskObserver};
