//! Scheduled-payment registry
//!
//! This module provides the `PaymentRegistry` component that indexes
//! pending payments two ways: by identifier (for cancel and lookup) and
//! by due timestamp (an ordered map whose per-timestamp lists preserve
//! creation order). Together the two indexes define the global processing
//! order: due timestamp ascending, then creation ordinal ascending.
//!
//! # Identifier Format
//!
//! Payment ids are `payment<N>` where `N` is a process-global ordinal
//! starting at 1, strictly increasing, never reused.
//!
//! # Terminal States
//!
//! A payment is pending, canceled, or processed, exactly one at a time.
//! Canceled and processed are terminal; a terminal payment never
//! reappears in any due bucket. Canceled records stay indexed so repeat
//! cancels can be rejected rather than report not-found.

use crate::types::{AccountId, Amount, LedgerError, Timestamp};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

/// Stored record of one scheduled payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInfo {
    /// Owning account; rewritten when the owner is merged away
    pub account: AccountId,

    /// Amount to debit when due
    pub amount: Amount,

    /// Timestamp at which the payment becomes due
    pub due_ts: Timestamp,

    /// Set by a successful cancel; terminal
    pub canceled: bool,

    /// Set once the payment has been attempted (debited or dropped); terminal
    pub processed: bool,

    /// Global creation ordinal, the same-due-timestamp tie-break
    pub ordinal: u64,
}

#[derive(Debug, Default)]
struct PaymentBook {
    /// Payment id to record, for cancel and lookup validations
    by_id: HashMap<String, PaymentInfo>,

    /// Due timestamp to payment ids in creation order
    due_index: BTreeMap<Timestamp, Vec<String>>,

    /// Next ordinal to allocate; starts at 1
    next_ordinal: u64,
}

/// Registry of scheduled payments with due-time ordering
///
/// All methods take `&self`; the registry guards its book with a mutex
/// held only for the duration of each call. Due-processing exclusivity
/// across the whole ledger is the concurrency shell's responsibility.
#[derive(Debug)]
pub struct PaymentRegistry {
    book: Mutex<PaymentBook>,
}

impl PaymentRegistry {
    pub fn new() -> Self {
        PaymentRegistry {
            book: Mutex::new(PaymentBook {
                next_ordinal: 1,
                ..PaymentBook::default()
            }),
        }
    }

    /// Register a payment due at `due_ts` and return its fresh id
    pub fn schedule(&self, account: &str, amount: Amount, due_ts: Timestamp) -> String {
        let mut book = self.book.lock();
        let ordinal = book.next_ordinal;
        book.next_ordinal += 1;
        let payment_id = format!("payment{}", ordinal);

        book.by_id.insert(
            payment_id.clone(),
            PaymentInfo {
                account: account.to_string(),
                amount,
                due_ts,
                canceled: false,
                processed: false,
                ordinal,
            },
        );
        book.due_index
            .entry(due_ts)
            .or_default()
            .push(payment_id.clone());

        payment_id
    }

    /// Pop every payment id due at or before `ts`, in processing order
    ///
    /// Buckets are drained in ascending due-timestamp order; ids within a
    /// bucket keep creation order. Canceled ids are included (the caller
    /// skips them) and, like all returned ids, never reappear in a later
    /// drain.
    pub fn take_due(&self, ts: Timestamp) -> Vec<String> {
        let mut book = self.book.lock();
        let mut due = Vec::new();
        loop {
            let next_due = match book.due_index.first_key_value() {
                Some((&bucket_ts, _)) => bucket_ts,
                None => break,
            };
            if next_due > ts {
                break;
            }
            if let Some((_, ids)) = book.due_index.pop_first() {
                due.extend(ids);
            }
        }
        due
    }

    /// Snapshot of a payment record
    pub fn get(&self, payment_id: &str) -> Option<PaymentInfo> {
        self.book.lock().by_id.get(payment_id).cloned()
    }

    /// Mark a payment processed (terminal)
    pub fn mark_processed(&self, payment_id: &str) {
        if let Some(info) = self.book.lock().by_id.get_mut(payment_id) {
            info.processed = true;
        }
    }

    /// Cancel a pending payment owned by `account`
    ///
    /// # Errors
    ///
    /// - `NotFound` when the id was never allocated
    /// - `Terminal` when the payment is already canceled, already
    ///   processed, or owned by another account
    pub fn cancel(&self, account: &str, payment_id: &str) -> Result<(), LedgerError> {
        let mut book = self.book.lock();
        let info = book
            .by_id
            .get_mut(payment_id)
            .ok_or_else(|| LedgerError::not_found(payment_id))?;

        if info.canceled {
            return Err(LedgerError::terminal(payment_id, "already canceled"));
        }
        if info.processed {
            return Err(LedgerError::terminal(payment_id, "already processed"));
        }
        if info.account != account {
            return Err(LedgerError::terminal(payment_id, "owned by another account"));
        }

        info.canceled = true;
        Ok(())
    }

    /// Rewrite the owner of every pending payment from `from` to `to`
    ///
    /// Used by merge so due processing debits the surviving account. The
    /// due-time index is untouched; owners are resolved through the id
    /// map. Returns the number of rewritten payments.
    pub fn reassign_owner(&self, from: &str, to: &str) -> usize {
        let mut book = self.book.lock();
        let mut moved = 0;
        for info in book.by_id.values_mut() {
            if !info.canceled && !info.processed && info.account == from {
                info.account = to.to_string();
                moved += 1;
            }
        }
        moved
    }
}

impl Default for PaymentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
