//! Ledger state: the authoritative in-memory stores
//!
//! This module provides the `LedgerState` struct holding every
//! account-keyed store the ledger owns: current balances, cumulative
//! outgoing totals, balance-event streams, creation-time lists, and merge
//! edges. The state is the shape of the data, not an actor; all mutation
//! decisions are made by the operation engine.
//!
//! # Thread Safety
//!
//! Each store is a `DashMap`, so individual reads and writes are safe
//! from multiple threads. Multi-step invariants (check balance, then
//! debit) are protected one level up by the concurrency shell's locks;
//! the serial engine simply runs single-threaded.
//!
//! # Balance Reconstruction
//!
//! The balance of account `A` at time `T` is the sum of its event deltas
//! with `ts <= T`, provided `A` existed at `T`: some creation timestamp
//! is `<= T` and no merge edge with `merged_at <= T` is recorded. Merge
//! folds the child balance into the parent with one delta on each stream,
//! so sums stay correct on both sides of the edge.

use crate::types::{AccountId, Amount, BalanceEvent, EventKind, Timestamp};
use dashmap::DashMap;

/// Directed merge edge: child account folded into a parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeEdge {
    /// Account that absorbed the child
    pub parent: AccountId,
    /// Timestamp of the merge; the child is inactive from here on
    pub merged_at: Timestamp,
}

/// Final state of one active account, for snapshots and output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub account: AccountId,
    pub balance: Amount,
    pub outgoing: Amount,
}

/// Authoritative in-memory ledger stores
///
/// The active-account set is exactly the key set of `balances`. Event
/// streams and creation lists outlive an account's active lifetime so
/// historical queries keep working after a merge.
#[derive(Debug, Default)]
pub struct LedgerState {
    /// Current balance per active account
    balances: DashMap<AccountId, Amount>,

    /// Cumulative amount paid out per account (transfers sent plus
    /// successfully debited scheduled payments)
    outgoing: DashMap<AccountId, Amount>,

    /// Append-only balance-event stream per account id
    events: DashMap<AccountId, Vec<BalanceEvent>>,

    /// Timestamps at which each id was (re-)created, in order
    creations: DashMap<AccountId, Vec<Timestamp>>,

    /// Current merge edge per merged-away child id
    merged_into: DashMap<AccountId, MergeEdge>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `account` is currently active
    pub fn is_active(&self, account: &str) -> bool {
        self.balances.contains_key(account)
    }

    /// Current balance of an active account
    pub fn balance(&self, account: &str) -> Option<Amount> {
        self.balances.get(account).map(|b| *b)
    }

    /// Cumulative outgoing total; zero when no entry exists
    pub fn outgoing_of(&self, account: &str) -> Amount {
        self.outgoing.get(account).map(|o| *o).unwrap_or(0)
    }

    /// Number of currently active accounts
    pub fn active_count(&self) -> usize {
        self.balances.len()
    }

    /// Begin a new lifetime for `account` at `ts`
    ///
    /// Inserts a zero balance, records the creation timestamp, appends the
    /// zero-delta creation marker to the event stream, and clears any
    /// merge edge left over from a previous lifetime so lookups see the
    /// new existence. The caller must have checked the id is not active.
    pub fn create(&self, account: &str, ts: Timestamp) {
        self.balances.insert(account.to_string(), 0);
        self.creations
            .entry(account.to_string())
            .or_default()
            .push(ts);
        self.push_event(account, BalanceEvent::new(ts, 0, EventKind::Creation));
        self.merged_into.remove(account);
    }

    /// Apply a signed delta to an active account's balance
    ///
    /// Updates the current balance with saturating arithmetic and appends
    /// the matching event. Returns the new balance. The caller is
    /// responsible for existence and sufficient-funds checks.
    pub fn apply_delta(&self, account: &str, ts: Timestamp, delta: Amount, kind: EventKind) -> Amount {
        let mut entry = self
            .balances
            .entry(account.to_string())
            .or_insert(0);
        *entry = entry.saturating_add(delta);
        let new_balance = *entry;
        drop(entry);
        self.push_event(account, BalanceEvent::new(ts, delta, kind));
        new_balance
    }

    /// Add to an account's cumulative outgoing total
    pub fn add_outgoing(&self, account: &str, amount: Amount) {
        let mut entry = self.outgoing.entry(account.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Remove and return an account's outgoing entry (merge fold)
    pub fn take_outgoing(&self, account: &str) -> Amount {
        self.outgoing.remove(account).map(|(_, o)| o).unwrap_or(0)
    }

    /// Record that `child` was folded into `parent` at `ts`
    ///
    /// Drops the child from the active-balance set; its event stream and
    /// creation history remain for historical queries.
    pub fn record_merge(&self, child: &str, parent: &str, ts: Timestamp) {
        self.merged_into.insert(
            child.to_string(),
            MergeEdge {
                parent: parent.to_string(),
                merged_at: ts,
            },
        );
        self.balances.remove(child);
    }

    /// Reconstruct the balance of `account` at `time_at`
    ///
    /// Returns `None` when the account did not exist at that time: either
    /// its current merge edge has `merged_at <= time_at`, or no creation
    /// timestamp is `<= time_at`. Otherwise the result is the sum of all
    /// event deltas with `ts <= time_at`, which composes across re-created
    /// lifetimes because every lifetime starts at zero and merge folds the
    /// old balance out with a negative delta.
    pub fn balance_at(&self, account: &str, time_at: Timestamp) -> Option<Amount> {
        if let Some(edge) = self.merged_into.get(account) {
            if edge.merged_at <= time_at {
                return None;
            }
        }
        let created = self
            .creations
            .get(account)
            .is_some_and(|times| times.iter().any(|&t| t <= time_at));
        if !created {
            return None;
        }
        let sum = self
            .events
            .get(account)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|e| e.ts <= time_at)
                    .fold(0i64, |acc, e| acc.saturating_add(e.delta))
            })
            .unwrap_or(0);
        Some(sum)
    }

    /// Active accounts paired with their outgoing totals
    ///
    /// Unsorted; the caller orders as needed.
    pub fn spenders(&self) -> Vec<(AccountId, Amount)> {
        self.balances
            .iter()
            .map(|entry| {
                let account = entry.key().clone();
                let outgoing = self.outgoing_of(&account);
                (account, outgoing)
            })
            .collect()
    }

    /// Snapshot of all active accounts, sorted by id for deterministic output
    pub fn snapshot(&self) -> Vec<AccountSnapshot> {
        let mut accounts: Vec<AccountSnapshot> = self
            .balances
            .iter()
            .map(|entry| AccountSnapshot {
                account: entry.key().clone(),
                balance: *entry.value(),
                outgoing: self.outgoing_of(entry.key()),
            })
            .collect();
        accounts.sort_by(|a, b| a.account.cmp(&b.account));
        accounts
    }

    /// Event stream of an account id, in insertion order
    #[cfg(test)]
    pub fn events_of(&self, account: &str) -> Vec<BalanceEvent> {
        self.events
            .get(account)
            .map(|stream| stream.clone())
            .unwrap_or_default()
    }

    fn push_event(&self, account: &str, event: BalanceEvent) {
        self.events
            .entry(account.to_string())
            .or_default()
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_starts_active_at_zero() {
        let state = LedgerState::new();
        state.create("alice", 1);

        assert!(state.is_active("alice"));
        assert_eq!(state.balance("alice"), Some(0));
        assert_eq!(state.balance_at("alice", 1), Some(0));
    }

    #[test]
    fn test_balance_before_creation_is_not_found() {
        let state = LedgerState::new();
        state.create("alice", 5);

        assert_eq!(state.balance_at("alice", 4), None);
        assert_eq!(state.balance_at("alice", 5), Some(0));
    }

    #[test]
    fn test_apply_delta_updates_balance_and_history() {
        let state = LedgerState::new();
        state.create("alice", 1);

        let balance = state.apply_delta("alice", 2, 500, EventKind::Deposit);
        assert_eq!(balance, 500);

        let balance = state.apply_delta("alice", 3, -200, EventKind::TransferOut);
        assert_eq!(balance, 300);

        assert_eq!(state.balance_at("alice", 2), Some(500));
        assert_eq!(state.balance_at("alice", 3), Some(300));
    }

    #[test]
    fn test_merged_account_is_inactive_from_merge_timestamp() {
        let state = LedgerState::new();
        state.create("alice", 1);
        state.create("bob", 1);
        state.apply_delta("bob", 2, 50, EventKind::Deposit);

        // Fold bob into alice at ts 4
        state.apply_delta("alice", 4, 50, EventKind::MergeIn);
        state.apply_delta("bob", 4, -50, EventKind::MergeOut);
        state.record_merge("bob", "alice", 4);

        assert!(!state.is_active("bob"));
        assert_eq!(state.balance_at("bob", 4), None);
        assert_eq!(state.balance_at("bob", 5), None);
        assert_eq!(state.balance_at("bob", 3), Some(50));
        assert_eq!(state.balance_at("alice", 5), Some(50));
    }

    #[test]
    fn test_recreation_clears_stale_merge_edge() {
        let state = LedgerState::new();
        state.create("alice", 1);
        state.create("bob", 1);
        state.apply_delta("bob", 2, 30, EventKind::Deposit);

        state.apply_delta("alice", 3, 30, EventKind::MergeIn);
        state.apply_delta("bob", 3, -30, EventKind::MergeOut);
        state.record_merge("bob", "alice", 3);

        // New lifetime for the same id
        state.create("bob", 10);
        assert!(state.is_active("bob"));
        assert_eq!(state.balance_at("bob", 10), Some(0));

        // Old lifetime still answers historical queries
        assert_eq!(state.balance_at("bob", 2), Some(30));
    }

    #[test]
    fn test_outgoing_defaults_to_zero_and_accumulates() {
        let state = LedgerState::new();
        state.create("alice", 1);

        assert_eq!(state.outgoing_of("alice"), 0);
        state.add_outgoing("alice", 200);
        state.add_outgoing("alice", 50);
        assert_eq!(state.outgoing_of("alice"), 250);

        assert_eq!(state.take_outgoing("alice"), 250);
        assert_eq!(state.outgoing_of("alice"), 0);
    }

    #[test]
    fn test_snapshot_is_sorted_by_account_id() {
        let state = LedgerState::new();
        for id in ["carol", "alice", "bob"] {
            state.create(id, 1);
        }
        state.apply_delta("bob", 2, 10, EventKind::Deposit);

        let snapshot = state.snapshot();
        let ids: Vec<&str> = snapshot.iter().map(|s| s.account.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob", "carol"]);
        assert_eq!(snapshot[1].balance, 10);
    }
}
