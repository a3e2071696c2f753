//! Fraud feed: spending histogrammer
//!
//! The ledger feeds committed money movements to a [`RiskObserver`]; this
//! module provides the default observer, a per-account spending
//! histogrammer. It bins movement amounts into log-scale buckets per
//! account and scores new amounts by how far they sit above the
//! account's established spending profile. The histogrammer observes a
//! feed; it is never authoritative on ledger state and cannot influence
//! an outcome.

use crate::core::traits::{MoneyMovement, RiskObserver};
use crate::types::{AccountId, Amount};
use dashmap::DashMap;

const BUCKETS: usize = 16;

/// Risk score above which a movement is considered anomalous
pub const FLAG_THRESHOLD: f64 = 0.7;

#[derive(Debug, Default, Clone)]
struct AccountProfile {
    /// Movement counts per log2 amount bucket
    buckets: [u64; BUCKETS],
    movements: u64,
    total_amount: i64,
}

impl AccountProfile {
    fn record(&mut self, amount: Amount) {
        self.buckets[bucket_of(amount)] += 1;
        self.movements += 1;
        self.total_amount = self.total_amount.saturating_add(amount);
    }

    fn mean_amount(&self) -> f64 {
        if self.movements == 0 {
            0.0
        } else {
            self.total_amount as f64 / self.movements as f64
        }
    }
}

/// Log2 bucket index, clamped to the histogram width
fn bucket_of(amount: Amount) -> usize {
    if amount <= 0 {
        return 0;
    }
    let log2 = 63 - amount.leading_zeros() as usize;
    log2.min(BUCKETS - 1)
}

/// Per-account spending histogram
///
/// Thread-safe; movements arrive from whichever worker committed them.
#[derive(Debug, Default)]
pub struct SpendingHistogram {
    profiles: DashMap<AccountId, AccountProfile>,
}

impl SpendingHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of movements recorded for an account
    pub fn movements_of(&self, account: &str) -> u64 {
        self.profiles
            .get(account)
            .map(|p| p.movements)
            .unwrap_or(0)
    }

    /// Histogram bucket counts for an account
    pub fn buckets_of(&self, account: &str) -> [u64; BUCKETS] {
        self.profiles
            .get(account)
            .map(|p| p.buckets)
            .unwrap_or([0; BUCKETS])
    }

    /// Score an amount against the account's spending profile
    ///
    /// Returns 0.0 to 1.0. Accounts with fewer than three recorded
    /// movements score 0.0 (no profile yet); beyond that the score grows
    /// with the ratio of the amount to the account's mean movement,
    /// saturating at 1.0 around ten times the mean.
    pub fn anomaly_score(&self, account: &str, amount: Amount) -> f64 {
        let Some(profile) = self.profiles.get(account) else {
            return 0.0;
        };
        if profile.movements < 3 {
            return 0.0;
        }
        let mean = profile.mean_amount();
        if mean <= 0.0 {
            return 0.0;
        }
        let ratio = amount as f64 / mean;
        ((ratio - 1.0) / 9.0).clamp(0.0, 1.0)
    }

    /// Whether an amount would be flagged against the current profile
    pub fn is_flagged(&self, account: &str, amount: Amount) -> bool {
        self.anomaly_score(account, amount) > FLAG_THRESHOLD
    }
}

impl RiskObserver for SpendingHistogram {
    fn observe(&self, movement: &MoneyMovement) {
        self.profiles
            .entry(movement.account.clone())
            .or_default()
            .record(movement.amount);
    }
}
