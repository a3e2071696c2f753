//! Banking Ledger Library
//! # Overview
//!
//! This library provides a concurrent, in-memory retail-banking ledger
//! with scheduled payments, account merges, and historical balance
//! queries, replayable from CSV operation records.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (operations, outcomes, events, errors)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::state`] - Authoritative balances, event streams, merge edges
//!   - [`core::payments`] - Scheduled-payment registry with due-time ordering
//!   - [`core::engine`] - Deterministic operation engine
//!   - [`core::shell`] - Thread-safe front end with account-granular locking
//! - [`concurrent`] - Worker pool draining bounded intake queues
//! - [`io`] - CSV reading and snapshot output
//! - [`strategy`] - Serial and concurrent replay pipelines
//! - [`persist`] - Write-through commit-record sinks
//! - [`fraud`] - Spending histogrammer fed committed money movements
//!
//! # Operations
//!
//! The ledger supports eight operations:
//!
//! - **CreateAccount**: Register a new account with zero balance
//! - **Deposit**: Credit funds and return the new balance
//! - **Transfer**: Move funds between two accounts
//! - **GetBalance**: Reconstruct a balance as of a past timestamp
//! - **TopSpenders**: Rank active accounts by outgoing total
//! - **SchedulePayment**: Register a payment due after a delay
//! - **CancelPayment**: Cancel a pending payment
//! - **MergeAccounts**: Fold one account into another, preserving history
//!
//! # Ordering
//!
//! Before any operation executes, every scheduled payment due at or
//! before the operation's timestamp is processed, in due-timestamp order
//! with creation order breaking ties. Replaying a fixed record sequence
//! therefore produces the same final state regardless of thread count.

// Module declarations
pub mod cli;
pub mod concurrent;
pub mod core;
pub mod fraud;
pub mod io;
pub mod persist;
pub mod strategy;
pub mod types;

pub use crate::core::{ConcurrentLedger, Ledger, LedgerEngine};
pub use crate::io::write_snapshot_csv;
pub use crate::types::{
    AccountId, Amount, LedgerError, Operation, OperationRecord, Outcome, Timestamp,
};
