//! Error types for the banking ledger
//!
//! Every operation either succeeds with a typed [`Outcome`] or fails with
//! one of the variants below. Business-level failures never panic and
//! never leave partial state behind; the transport boundary additionally
//! maps I/O and parse failures into the same type.
//!
//! # Error Categories
//!
//! - **Business errors**: not-found, insufficient funds, duplicate create,
//!   invalid argument, terminal payment
//! - **Boundary errors**: file I/O and record parsing, produced by the
//!   transport layer and never by the engine itself
//!
//! [`Outcome`]: crate::types::Outcome

use crate::types::operation::Amount;
use thiserror::Error;

/// Main error type for the banking ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Referenced account or payment id does not currently exist
    ///
    /// Raised when an operation names an account that is not active
    /// (never created, or merged away), or a payment id that was never
    /// allocated.
    #[error("'{id}' not found")]
    NotFound {
        /// The account or payment id that was not found
        id: String,
    },

    /// Debiting would bring the balance below zero
    ///
    /// The operation is rejected and the account state is unchanged.
    #[error("insufficient funds in '{account}': balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Account that would have gone negative
        account: String,
        /// Balance at the time of the attempt
        balance: Amount,
        /// Amount the operation tried to debit
        requested: Amount,
    },

    /// `CreateAccount` on an id that is already active
    #[error("account '{account}' already exists")]
    AlreadyExists {
        /// The duplicate account id
        account: String,
    },

    /// Malformed request payload
    ///
    /// Covers same-source-and-target transfers and merges, non-positive
    /// payment amounts, negative delays, and negative deposit or transfer
    /// amounts. Transport parse failures are also surfaced as this kind
    /// at the boundary.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument
        message: String,
    },

    /// Cancel on a payment that already reached a terminal state
    ///
    /// A payment is terminal once processed or canceled; cancels from a
    /// non-owning account are rejected the same way.
    #[error("payment '{payment_id}' is terminal: {reason}")]
    Terminal {
        /// The payment id the cancel referenced
        payment_id: String,
        /// Which terminal condition was hit
        reason: String,
    },

    /// I/O failure while reading input or writing output
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O failure
        message: String,
    },

    /// A record could not be parsed
    ///
    /// Recoverable at the transport boundary: the malformed record is
    /// skipped and processing continues.
    #[error("parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred, if known
        line: Option<u64>,
        /// Description of the parse failure
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());
        LedgerError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

// Helper constructors for the common variants

impl LedgerError {
    /// Create a NotFound error
    pub fn not_found(id: &str) -> Self {
        LedgerError::NotFound { id: id.to_string() }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: &str, balance: Amount, requested: Amount) -> Self {
        LedgerError::InsufficientFunds {
            account: account.to_string(),
            balance,
            requested,
        }
    }

    /// Create an AlreadyExists error
    pub fn already_exists(account: &str) -> Self {
        LedgerError::AlreadyExists {
            account: account.to_string(),
        }
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        LedgerError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a Terminal error
    pub fn terminal(payment_id: &str, reason: &str) -> Self {
        LedgerError::Terminal {
            payment_id: payment_id.to_string(),
            reason: reason.to_string(),
        }
    }
}
