//! Operation records and outcomes for the banking ledger
//!
//! This module defines the unit of work the transport hands to the ledger:
//! an operation kind with its payload, stamped with a client-supplied
//! timestamp. Outcomes carry the typed result of a successful operation;
//! failures are reported through [`LedgerError`](crate::types::LedgerError).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identifier
///
/// Opaque, client-chosen string. Account ids are compared lexicographically
/// where an ordering is needed (lock acquisition, spender tie-breaks).
pub type AccountId = String;

/// Client-supplied timestamp
///
/// Monotonically non-decreasing 64-bit integer. The ledger makes no
/// wall-clock assumption; ordering between operations is defined entirely
/// by these values.
pub type Timestamp = i64;

/// Money amount in minor units (e.g. cents)
///
/// Signed 64-bit integer. Balances of active accounts never go below zero.
pub type Amount = i64;

/// A single ledger operation with its payload
///
/// Each variant corresponds to one operation kind of the wire protocol.
/// The payload fields mirror the operation-record payloads delivered by
/// the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Operation {
    /// Create a new account with zero balance
    CreateAccount { account: AccountId },

    /// Credit funds to an existing account
    Deposit { account: AccountId, amount: Amount },

    /// Move funds between two distinct existing accounts
    Transfer {
        source: AccountId,
        target: AccountId,
        amount: Amount,
    },

    /// Query the balance of an account as of a past timestamp
    GetBalance {
        account: AccountId,
        time_at: Timestamp,
    },

    /// List the top `n` accounts by cumulative outgoing amount
    TopSpenders { n: i64 },

    /// Register a payment due `delay` ticks from now
    SchedulePayment {
        account: AccountId,
        amount: Amount,
        delay: i64,
    },

    /// Cancel a pending scheduled payment owned by `account`
    CancelPayment {
        account: AccountId,
        payment_id: String,
    },

    /// Fold `source` into `target`; `source` ceases to exist
    MergeAccounts {
        target: AccountId,
        source: AccountId,
    },
}

impl Operation {
    /// The account used to route this operation to a worker
    ///
    /// Operations touching two accounts route by the first-named one;
    /// account-less operations have no routing key and may land on any
    /// worker. Same-account submission order is preserved because equal
    /// keys always hash to the same worker.
    pub fn primary_account(&self) -> Option<&str> {
        match self {
            Operation::CreateAccount { account }
            | Operation::Deposit { account, .. }
            | Operation::GetBalance { account, .. }
            | Operation::SchedulePayment { account, .. }
            | Operation::CancelPayment { account, .. } => Some(account),
            Operation::Transfer { source, .. } => Some(source),
            Operation::MergeAccounts { target, .. } => Some(target),
            Operation::TopSpenders { .. } => None,
        }
    }
}

/// A timestamped operation record, the unit the transport delivers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Client-supplied timestamp for this operation
    pub timestamp: Timestamp,

    /// The operation to apply
    #[serde(flatten)]
    pub op: Operation,
}

impl OperationRecord {
    pub fn new(timestamp: Timestamp, op: Operation) -> Self {
        OperationRecord { timestamp, op }
    }
}

/// Typed result of a successfully applied operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `CreateAccount` succeeded
    Created,

    /// New balance after `Deposit` or `Transfer`, or the reconstructed
    /// balance for `GetBalance`
    Balance(Amount),

    /// `TopSpenders` entries, formatted `"<id>(<outgoing>)"`
    Spenders(Vec<String>),

    /// Identifier allocated by `SchedulePayment`
    Scheduled(String),

    /// `CancelPayment` succeeded
    Canceled,

    /// `MergeAccounts` succeeded
    Merged,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created => write!(f, "created"),
            Outcome::Balance(b) => write!(f, "balance={}", b),
            Outcome::Spenders(entries) => write!(f, "spenders=[{}]", entries.join(",")),
            Outcome::Scheduled(id) => write!(f, "scheduled={}", id),
            Outcome::Canceled => write!(f, "canceled"),
            Outcome::Merged => write!(f, "merged"),
        }
    }
}
