//! Balance events and commit records
//!
//! Every debit or credit against an account appends one balance event to
//! that account's stream; historical balance queries are answered by
//! summing event deltas up to the queried timestamp. Commit records are
//! the post-commit notifications handed to a persistence sink, one per
//! state transition.

use super::operation::{AccountId, Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// Why a balance delta was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Zero-delta marker appended at account (re-)creation
    Creation,
    /// Client deposit
    Deposit,
    /// Debit side of a transfer
    TransferOut,
    /// Credit side of a transfer
    TransferIn,
    /// Successful scheduled-payment debit
    Payment,
    /// Child balance folded in by a merge
    MergeIn,
    /// Balance folded out of a merged-away child
    MergeOut,
}

/// One entry in an account's balance-event stream
///
/// Streams are append-only and kept in insertion order. The sum of deltas
/// with `ts <= T` equals the account's balance at time `T` for any `T` at
/// which the account was active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEvent {
    pub ts: Timestamp,
    pub delta: Amount,
    pub kind: EventKind,
}

impl BalanceEvent {
    pub fn new(ts: Timestamp, delta: Amount, kind: EventKind) -> Self {
        BalanceEvent { ts, delta, kind }
    }
}

/// Record type delivered to a persistence sink after a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitKind {
    AccountCreated,
    Deposit,
    TransferSend,
    TransferReceive,
    PaymentScheduled,
    PaymentProcessed,
    PaymentCanceled,
    AccountMerge,
    BalanceEvent,
}

/// Post-commit notification of a single state transition
///
/// Sinks receive these strictly after the in-memory state has been
/// updated; they mirror decisions already made and are never consulted
/// for authoritative reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub kind: CommitKind,
    pub timestamp: Timestamp,
    pub account: AccountId,
    pub amount: Amount,
    /// Counterparty account, payment id, or similar context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CommitRecord {
    pub fn new(kind: CommitKind, timestamp: Timestamp, account: &str, amount: Amount) -> Self {
        CommitRecord {
            kind,
            timestamp,
            account: account.to_string(),
            amount,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_kind_serializes_screaming_snake() {
        let record = CommitRecord::new(CommitKind::TransferSend, 4, "alice", 200)
            .with_detail("bob");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"TRANSFER_SEND\""));
        assert!(json.contains("\"detail\":\"bob\""));
    }

    #[test]
    fn test_detail_omitted_when_absent() {
        let record = CommitRecord::new(CommitKind::Deposit, 2, "alice", 500);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("detail"));
    }
}
