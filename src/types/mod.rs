//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `operation`: Operation records, outcomes, and identifier aliases
//! - `event`: Balance events and persistence commit records
//! - `error`: Error types for the banking ledger

pub mod error;
pub mod event;
pub mod operation;

pub use error::LedgerError;
pub use event::{BalanceEvent, CommitKind, CommitRecord, EventKind};
pub use operation::{AccountId, Amount, Operation, OperationRecord, Outcome, Timestamp};
