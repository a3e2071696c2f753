//! Core trait seams
//!
//! `Ledger` is the operation seam implemented by both the deterministic
//! serial engine and the concurrency shell, letting callers swap one for
//! the other. `CommitSink` and `RiskObserver` are the outward seams for
//! the optional persistence mirror and the fraud feed; both are informed
//! strictly after a state transition commits and neither can influence a
//! ledger outcome.

use crate::core::state::AccountSnapshot;
use crate::types::{
    AccountId, Amount, CommitRecord, LedgerError, OperationRecord, Outcome, Timestamp,
};

/// The ledger operation surface
pub trait Ledger: Send + Sync {
    /// Apply one timestamped operation record
    ///
    /// Runs due-payment processing through the record's timestamp, then
    /// the operation itself. Returns the typed outcome or a typed error;
    /// no partial mutation is observable on failure.
    fn apply(&self, record: &OperationRecord) -> Result<Outcome, LedgerError>;

    /// Final states of all active accounts, sorted by id
    fn snapshot(&self) -> Vec<AccountSnapshot>;
}

/// Write-through mirror of committed state transitions
///
/// Implementations must tolerate concurrent calls; records arrive from
/// whichever thread committed the transition. The sink is never consulted
/// for authoritative reads.
pub trait CommitSink: Send + Sync {
    fn record(&self, record: &CommitRecord);
}

/// A committed money-moving outcome, as fed to the risk observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyMovement {
    pub account: AccountId,
    pub amount: Amount,
    pub timestamp: Timestamp,
    pub kind: MovementKind,
}

/// Which kind of movement committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementKind {
    Deposit,
    TransferSend,
    ScheduledPayment,
}

/// Observer for committed money movements
///
/// Fed deposits, transfer sends, and successfully debited scheduled
/// payments. Observes only; not authoritative on ledger state.
pub trait RiskObserver: Send + Sync {
    fn observe(&self, movement: &MoneyMovement);
}
