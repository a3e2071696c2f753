//! Concurrency shell over the deterministic engine
//!
//! This module provides `ConcurrentLedger`, which maps concurrent client
//! requests onto the engine with account-granular locking:
//!
//! - a top-level reader-writer lock guards account creation, global
//!   enumeration, and due-payment processing
//! - one lazily-created reader-writer lock per account serializes
//!   operations touching that account; locks are never destroyed before
//!   shell teardown
//! - two-account operations (transfer, merge) take both account locks in
//!   ascending id order, a total order that rules out deadlock
//!
//! Because due processing may touch accounts other than the caller's, it
//! runs as a top-level-write-locked critical section at the start of
//! every call; the guard is then downgraded to a read lock so unrelated
//! per-account operations keep running concurrently. Ordering between
//! concurrent operations is defined by their client-supplied timestamps,
//! not arrival order; the per-account write lock is the serialization
//! point that keeps same-account operations in submission order.

use crate::core::engine::LedgerEngine;
use crate::core::state::AccountSnapshot;
use crate::core::traits::Ledger;
use crate::types::{LedgerError, Operation, OperationRecord, Outcome};
use dashmap::DashMap;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::sync::Arc;

/// Thread-safe ledger front end
///
/// Wraps a [`LedgerEngine`] with the locking discipline above. All
/// methods take `&self`; the shell is shared across worker threads via
/// `Arc`.
pub struct ConcurrentLedger {
    engine: LedgerEngine,

    /// Serializes creation, enumeration, and due processing against
    /// everything else
    root: RwLock<()>,

    /// Per-account operation locks, created on first reference
    account_locks: DashMap<String, Arc<RwLock<()>>>,
}

impl ConcurrentLedger {
    pub fn new() -> Self {
        Self::with_engine(LedgerEngine::new())
    }

    /// Wrap an engine, keeping any sinks already attached to it
    pub fn with_engine(engine: LedgerEngine) -> Self {
        ConcurrentLedger {
            engine,
            root: RwLock::new(()),
            account_locks: DashMap::new(),
        }
    }

    /// Apply one operation record under the shell's locking discipline
    pub fn apply(&self, record: &OperationRecord) -> Result<Outcome, LedgerError> {
        let ts = record.timestamp;

        // Due processing can mutate any account, so it runs exclusively.
        let root = self.root.write();
        self.engine.run_due_payments(ts);

        match &record.op {
            // The new id must appear atomically in the active set, so the
            // exclusive lock is held through the creation itself.
            Operation::CreateAccount { account } => self.engine.create_account(ts, account),

            // Enumeration runs under the downgraded read lock: serialized
            // against creation, concurrent with per-account operations.
            Operation::TopSpenders { n } => {
                let _root = RwLockWriteGuard::downgrade(root);
                self.engine.top_spenders(*n)
            }

            Operation::Deposit { account, amount } => {
                let _root = RwLockWriteGuard::downgrade(root);
                let lock = self.account_lock(account);
                let _guard = lock.write();
                self.engine.deposit(ts, account, *amount)
            }

            Operation::GetBalance { account, time_at } => {
                let _root = RwLockWriteGuard::downgrade(root);
                let lock = self.account_lock(account);
                let _guard = lock.read();
                self.engine.get_balance(account, *time_at)
            }

            Operation::SchedulePayment {
                account,
                amount,
                delay,
            } => {
                let _root = RwLockWriteGuard::downgrade(root);
                let lock = self.account_lock(account);
                let _guard = lock.write();
                self.engine.schedule_payment(ts, account, *amount, *delay)
            }

            Operation::CancelPayment {
                account,
                payment_id,
            } => {
                let _root = RwLockWriteGuard::downgrade(root);
                let lock = self.account_lock(account);
                let _guard = lock.write();
                self.engine.cancel_payment(ts, account, payment_id)
            }

            Operation::Transfer {
                source,
                target,
                amount,
            } => {
                let _root = RwLockWriteGuard::downgrade(root);
                self.with_pair_locked(source, target, || {
                    self.engine.transfer(ts, source, target, *amount)
                })
            }

            Operation::MergeAccounts { target, source } => {
                let _root = RwLockWriteGuard::downgrade(root);
                self.with_pair_locked(target, source, || {
                    self.engine.merge_accounts(ts, target, source)
                })
            }
        }
    }

    /// Final states of all active accounts, sorted by id
    pub fn snapshot(&self) -> Vec<AccountSnapshot> {
        let _root = self.root.read();
        self.engine.snapshot()
    }

    /// The operation lock for `account`, created on first reference
    ///
    /// The map entry API makes racing creations converge on a single
    /// lock; entries live until shell teardown.
    fn account_lock(&self, account: &str) -> Arc<RwLock<()>> {
        self.account_locks
            .entry(account.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Run `f` with both accounts write-locked in ascending id order
    ///
    /// Equal ids take a single lock; the engine rejects the operation
    /// with `InvalidArgument` afterwards.
    fn with_pair_locked<R>(&self, a: &str, b: &str, f: impl FnOnce() -> R) -> R {
        if a == b {
            let lock = self.account_lock(a);
            let _guard = lock.write();
            return f();
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first_lock = self.account_lock(first);
        let second_lock = self.account_lock(second);
        let _first_guard = first_lock.write();
        let _second_guard = second_lock.write();
        f()
    }
}

impl Default for ConcurrentLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for ConcurrentLedger {
    fn apply(&self, record: &OperationRecord) -> Result<Outcome, LedgerError> {
        ConcurrentLedger::apply(self, record)
    }

    fn snapshot(&self) -> Vec<AccountSnapshot> {
        ConcurrentLedger::snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn record(ts: i64, op: Operation) -> OperationRecord {
        OperationRecord::new(ts, op)
    }

    #[test]
    fn test_shell_applies_operations_like_the_engine() {
        let ledger = ConcurrentLedger::new();

        assert_eq!(
            ledger.apply(&record(1, Operation::CreateAccount { account: "alice".into() })),
            Ok(Outcome::Created)
        );
        assert_eq!(
            ledger.apply(&record(2, Operation::Deposit { account: "alice".into(), amount: 500 })),
            Ok(Outcome::Balance(500))
        );
        assert_eq!(
            ledger.apply(&record(3, Operation::GetBalance { account: "alice".into(), time_at: 2 })),
            Ok(Outcome::Balance(500))
        );
    }

    #[test]
    fn test_concurrent_deposits_on_one_account_all_land() {
        let ledger = Arc::new(ConcurrentLedger::new());
        ledger
            .apply(&record(1, Operation::CreateAccount { account: "alice".into() }))
            .unwrap();

        let mut handles = vec![];
        for i in 0..16 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                ledger
                    .apply(&record(
                        2 + i,
                        Operation::Deposit {
                            account: "alice".into(),
                            amount: 100,
                        },
                    ))
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].balance, 1600);
    }

    #[test]
    fn test_concurrent_transfers_conserve_total_balance() {
        let ledger = Arc::new(ConcurrentLedger::new());
        for id in ["alice", "bob"] {
            ledger
                .apply(&record(1, Operation::CreateAccount { account: id.into() }))
                .unwrap();
            ledger
                .apply(&record(2, Operation::Deposit { account: id.into(), amount: 10_000 }))
                .unwrap();
        }

        // Opposite-direction transfers exercise the ascending-id lock order
        let mut handles = vec![];
        for i in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                let (source, target) = if i % 2 == 0 {
                    ("alice", "bob")
                } else {
                    ("bob", "alice")
                };
                for j in 0..50 {
                    let _ = ledger.apply(&record(
                        3 + j,
                        Operation::Transfer {
                            source: source.into(),
                            target: target.into(),
                            amount: 7,
                        },
                    ));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = ledger.snapshot();
        let total: i64 = snapshot.iter().map(|s| s.balance).sum();
        assert_eq!(total, 20_000);
    }

    #[test]
    fn test_concurrent_creates_of_one_id_succeed_once() {
        let ledger = Arc::new(ConcurrentLedger::new());

        let mut handles = vec![];
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                ledger
                    .apply(&record(1, Operation::CreateAccount { account: "alice".into() }))
                    .is_ok()
            }));
        }
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(ledger.snapshot().len(), 1);
    }

    #[test]
    fn test_transfer_to_self_does_not_deadlock() {
        let ledger = ConcurrentLedger::new();
        ledger
            .apply(&record(1, Operation::CreateAccount { account: "alice".into() }))
            .unwrap();

        let result = ledger.apply(&record(
            2,
            Operation::Transfer {
                source: "alice".into(),
                target: "alice".into(),
                amount: 10,
            },
        ));
        assert!(matches!(result, Err(LedgerError::InvalidArgument { .. })));
    }

    #[test]
    fn test_due_processing_under_contention() {
        let ledger = Arc::new(ConcurrentLedger::new());
        ledger
            .apply(&record(1, Operation::CreateAccount { account: "alice".into() }))
            .unwrap();
        ledger
            .apply(&record(2, Operation::Deposit { account: "alice".into(), amount: 1_000 }))
            .unwrap();
        ledger
            .apply(&record(
                3,
                Operation::SchedulePayment {
                    account: "alice".into(),
                    amount: 400,
                    delay: 10,
                },
            ))
            .unwrap();

        // Readers racing past the due time; exactly one due run debits
        let mut handles = vec![];
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                ledger
                    .apply(&record(
                        20,
                        Operation::GetBalance {
                            account: "alice".into(),
                            time_at: 20,
                        },
                    ))
                    .unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Outcome::Balance(600));
        }
    }
}
