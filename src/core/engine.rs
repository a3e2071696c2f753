//! Deterministic operation engine
//!
//! This module provides the `LedgerEngine` that orchestrates every ledger
//! operation over the state stores and the payment registry. The engine
//! is a pure transition function: given a timestamped operation and the
//! current state, it first drains all scheduled payments due at or before
//! that timestamp, then executes the operation, producing a typed outcome
//! or a typed error with no partial mutation left behind.
//!
//! The engine enforces the ordering discipline between scheduled payments
//! and client operations:
//! - all payments due at timestamp `T` run before any client operation
//!   timestamped `T`
//! - payments sharing a due timestamp run in creation order
//! - an earlier-due payment always runs before a later-due one
//!
//! The engine itself takes no locks beyond the registry's internal one
//! and never blocks; thread safety across operations is the concurrency
//! shell's job. Driven single-threaded, the engine is fully deterministic
//! in the operation sequence and its timestamps.

use crate::core::payments::PaymentRegistry;
use crate::core::state::{AccountSnapshot, LedgerState};
use crate::core::traits::{CommitSink, Ledger, MoneyMovement, MovementKind, RiskObserver};
use crate::types::{
    Amount, CommitKind, CommitRecord, EventKind, LedgerError, Operation, OperationRecord, Outcome,
    Timestamp,
};
use std::sync::Arc;
use tracing::debug;

/// Deterministic ledger operation engine
///
/// Owns all ledger state exclusively. Optional sinks are informed after
/// each committed transition; they never affect outcomes.
pub struct LedgerEngine {
    state: LedgerState,
    registry: PaymentRegistry,
    sink: Option<Arc<dyn CommitSink>>,
    observer: Option<Arc<dyn RiskObserver>>,
}

impl LedgerEngine {
    /// Create an empty engine with no accounts or payments
    pub fn new() -> Self {
        LedgerEngine {
            state: LedgerState::new(),
            registry: PaymentRegistry::new(),
            sink: None,
            observer: None,
        }
    }

    /// Attach a persistence sink informed of committed transitions
    pub fn with_sink(mut self, sink: Arc<dyn CommitSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach a risk observer fed committed money movements
    pub fn with_observer(mut self, observer: Arc<dyn RiskObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Process every pending payment due at or before `ts`
    ///
    /// Payments are attempted in global processing order (due timestamp
    /// ascending, creation ordinal ascending). A canceled payment is
    /// dropped; a payment whose owner is not active is marked processed
    /// with no delta; a payment the owner cannot cover is dropped and
    /// marked processed, never retried. Successful debits append a
    /// balance event at the payment's due timestamp and count toward the
    /// owner's outgoing total.
    ///
    /// Callers that hold their own exclusivity (the concurrency shell's
    /// top-level write lock) invoke this directly; `apply` invokes it at
    /// the start of every operation.
    pub fn run_due_payments(&self, ts: Timestamp) {
        for payment_id in self.registry.take_due(ts) {
            let Some(info) = self.registry.get(&payment_id) else {
                continue;
            };
            if info.canceled {
                continue;
            }

            let mut debited = 0;
            if self.state.is_active(&info.account) {
                let balance = self.state.balance(&info.account).unwrap_or(0);
                if balance >= info.amount {
                    self.state
                        .apply_delta(&info.account, info.due_ts, -info.amount, EventKind::Payment);
                    self.state.add_outgoing(&info.account, info.amount);
                    debited = info.amount;
                    self.observe(MoneyMovement {
                        account: info.account.clone(),
                        amount: info.amount,
                        timestamp: info.due_ts,
                        kind: MovementKind::ScheduledPayment,
                    });
                } else {
                    debug!(
                        payment = %payment_id,
                        account = %info.account,
                        balance,
                        amount = info.amount,
                        "dropping scheduled payment: insufficient funds"
                    );
                }
            }

            self.registry.mark_processed(&payment_id);
            self.commit(
                CommitRecord::new(CommitKind::PaymentProcessed, info.due_ts, &info.account, debited)
                    .with_detail(payment_id),
            );
        }
    }

    /// Run due payments through the record's timestamp, then the operation
    pub fn apply(&self, record: &OperationRecord) -> Result<Outcome, LedgerError> {
        self.run_due_payments(record.timestamp);
        self.execute(record.timestamp, &record.op)
    }

    /// Execute one operation without the due-processing pass
    ///
    /// The concurrency shell runs due processing under its own lock and
    /// then dispatches here; everyone else should use `apply`.
    pub fn execute(&self, ts: Timestamp, op: &Operation) -> Result<Outcome, LedgerError> {
        match op {
            Operation::CreateAccount { account } => self.create_account(ts, account),
            Operation::Deposit { account, amount } => self.deposit(ts, account, *amount),
            Operation::Transfer {
                source,
                target,
                amount,
            } => self.transfer(ts, source, target, *amount),
            Operation::GetBalance { account, time_at } => self.get_balance(account, *time_at),
            Operation::TopSpenders { n } => self.top_spenders(*n),
            Operation::SchedulePayment {
                account,
                amount,
                delay,
            } => self.schedule_payment(ts, account, *amount, *delay),
            Operation::CancelPayment {
                account,
                payment_id,
            } => self.cancel_payment(ts, account, payment_id),
            Operation::MergeAccounts { target, source } => self.merge_accounts(ts, target, source),
        }
    }

    /// Create a new account with zero balance
    ///
    /// Fails with `AlreadyExists` if the id is currently active.
    /// Re-creating an id merged away earlier begins a fresh lifetime.
    pub fn create_account(&self, ts: Timestamp, account: &str) -> Result<Outcome, LedgerError> {
        if self.state.is_active(account) {
            return Err(LedgerError::already_exists(account));
        }
        self.state.create(account, ts);
        self.commit(CommitRecord::new(CommitKind::AccountCreated, ts, account, 0));
        Ok(Outcome::Created)
    }

    /// Credit `amount` to an account and return the new balance
    ///
    /// A zero amount is a legal no-op that still appends a balance event.
    pub fn deposit(&self, ts: Timestamp, account: &str, amount: Amount) -> Result<Outcome, LedgerError> {
        if amount < 0 {
            return Err(LedgerError::invalid_argument("deposit amount is negative"));
        }
        if !self.state.is_active(account) {
            return Err(LedgerError::not_found(account));
        }
        let new_balance = self.state.apply_delta(account, ts, amount, EventKind::Deposit);
        self.commit(CommitRecord::new(CommitKind::Deposit, ts, account, amount));
        self.observe(MoneyMovement {
            account: account.to_string(),
            amount,
            timestamp: ts,
            kind: MovementKind::Deposit,
        });
        Ok(Outcome::Balance(new_balance))
    }

    /// Move `amount` from `source` to `target`, returning the new source balance
    pub fn transfer(
        &self,
        ts: Timestamp,
        source: &str,
        target: &str,
        amount: Amount,
    ) -> Result<Outcome, LedgerError> {
        if source == target {
            return Err(LedgerError::invalid_argument(
                "transfer source and target are the same account",
            ));
        }
        if amount < 0 {
            return Err(LedgerError::invalid_argument("transfer amount is negative"));
        }
        if !self.state.is_active(source) {
            return Err(LedgerError::not_found(source));
        }
        if !self.state.is_active(target) {
            return Err(LedgerError::not_found(target));
        }
        let balance = self.state.balance(source).unwrap_or(0);
        if balance < amount {
            return Err(LedgerError::insufficient_funds(source, balance, amount));
        }

        let new_source_balance = self
            .state
            .apply_delta(source, ts, -amount, EventKind::TransferOut);
        self.state.apply_delta(target, ts, amount, EventKind::TransferIn);
        self.state.add_outgoing(source, amount);

        self.commit(
            CommitRecord::new(CommitKind::TransferSend, ts, source, amount).with_detail(target),
        );
        self.commit(
            CommitRecord::new(CommitKind::TransferReceive, ts, target, amount).with_detail(source),
        );
        self.observe(MoneyMovement {
            account: source.to_string(),
            amount,
            timestamp: ts,
            kind: MovementKind::TransferSend,
        });
        Ok(Outcome::Balance(new_source_balance))
    }

    /// The top `n` active accounts by outgoing total
    ///
    /// Sorted by outgoing descending, account id ascending on ties, each
    /// formatted `"<id>(<outgoing>)"`. A non-positive `n` yields an empty
    /// list; an oversized `n` yields all active accounts.
    pub fn top_spenders(&self, n: i64) -> Result<Outcome, LedgerError> {
        let mut spenders = self.state.spenders();
        spenders.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let limit = n.max(0).min(spenders.len() as i64) as usize;
        let entries = spenders
            .into_iter()
            .take(limit)
            .map(|(account, outgoing)| format!("{}({})", account, outgoing))
            .collect();
        Ok(Outcome::Spenders(entries))
    }

    /// Register a payment of `amount` due `delay` ticks after `ts`
    ///
    /// Returns the freshly allocated payment id. Because due processing
    /// runs before the operation, a zero-delay payment is not debited in
    /// the same call; it becomes due for any subsequent operation at or
    /// after `ts`.
    pub fn schedule_payment(
        &self,
        ts: Timestamp,
        account: &str,
        amount: Amount,
        delay: i64,
    ) -> Result<Outcome, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::invalid_argument(
                "scheduled payment amount must be positive",
            ));
        }
        if delay < 0 {
            return Err(LedgerError::invalid_argument("payment delay is negative"));
        }
        if !self.state.is_active(account) {
            return Err(LedgerError::not_found(account));
        }

        let due_ts = ts.saturating_add(delay);
        let payment_id = self.registry.schedule(account, amount, due_ts);
        self.commit(
            CommitRecord::new(CommitKind::PaymentScheduled, ts, account, amount)
                .with_detail(payment_id.clone()),
        );
        Ok(Outcome::Scheduled(payment_id))
    }

    /// Cancel a pending payment owned by `account`
    pub fn cancel_payment(
        &self,
        ts: Timestamp,
        account: &str,
        payment_id: &str,
    ) -> Result<Outcome, LedgerError> {
        self.registry.cancel(account, payment_id)?;
        let amount = self
            .registry
            .get(payment_id)
            .map(|info| info.amount)
            .unwrap_or(0);
        self.commit(
            CommitRecord::new(CommitKind::PaymentCanceled, ts, account, amount)
                .with_detail(payment_id),
        );
        Ok(Outcome::Canceled)
    }

    /// Fold account `source` into `target`
    ///
    /// Moves the source balance and outgoing total to the target, rewrites
    /// ownership of the source's pending payments, records the merge edge,
    /// and deactivates the source. The source's event stream and creation
    /// history remain for historical queries.
    pub fn merge_accounts(
        &self,
        ts: Timestamp,
        target: &str,
        source: &str,
    ) -> Result<Outcome, LedgerError> {
        if target == source {
            return Err(LedgerError::invalid_argument(
                "merge source and target are the same account",
            ));
        }
        if !self.state.is_active(target) {
            return Err(LedgerError::not_found(target));
        }
        if !self.state.is_active(source) {
            return Err(LedgerError::not_found(source));
        }

        let source_balance = self.state.balance(source).unwrap_or(0);
        self.state
            .apply_delta(target, ts, source_balance, EventKind::MergeIn);
        self.state
            .apply_delta(source, ts, -source_balance, EventKind::MergeOut);

        let source_outgoing = self.state.take_outgoing(source);
        if source_outgoing > 0 {
            self.state.add_outgoing(target, source_outgoing);
        }

        let moved = self.registry.reassign_owner(source, target);
        if moved > 0 {
            debug!(from = %source, to = %target, moved, "reassigned pending payments on merge");
        }

        self.state.record_merge(source, target, ts);

        self.commit(
            CommitRecord::new(CommitKind::AccountMerge, ts, target, source_balance)
                .with_detail(source),
        );
        self.commit(
            CommitRecord::new(CommitKind::BalanceEvent, ts, target, source_balance)
                .with_detail("merge_in"),
        );
        self.commit(
            CommitRecord::new(CommitKind::BalanceEvent, ts, source, -source_balance)
                .with_detail("merge_out"),
        );
        Ok(Outcome::Merged)
    }

    /// Reconstruct the balance of `account` as of `time_at`
    ///
    /// Not-found when the account had been merged away by `time_at` or no
    /// lifetime of the id had begun yet.
    pub fn get_balance(&self, account: &str, time_at: Timestamp) -> Result<Outcome, LedgerError> {
        self.state
            .balance_at(account, time_at)
            .map(Outcome::Balance)
            .ok_or_else(|| LedgerError::not_found(account))
    }

    /// Final states of all active accounts, sorted by id
    pub fn snapshot(&self) -> Vec<AccountSnapshot> {
        self.state.snapshot()
    }

    fn commit(&self, record: CommitRecord) {
        if let Some(sink) = &self.sink {
            sink.record(&record);
        }
    }

    fn observe(&self, movement: MoneyMovement) {
        if let Some(observer) = &self.observer {
            observer.observe(&movement);
        }
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for LedgerEngine {
    fn apply(&self, record: &OperationRecord) -> Result<Outcome, LedgerError> {
        LedgerEngine::apply(self, record)
    }

    fn snapshot(&self) -> Vec<AccountSnapshot> {
        LedgerEngine::snapshot(self)
    }
}
