//! CSV format handling for operation records and snapshot output
//!
//! This module centralizes the CSV format concerns:
//! - `CsvOpRecord` structure for deserialization
//! - Conversion from CSV rows to typed operation records
//! - Final account-snapshot serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::core::state::AccountSnapshot;
use crate::types::{LedgerError, Operation, OperationRecord, Timestamp};
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV row structure for deserialization
///
/// Input columns: `op, ts, account, target, amount, delay, payment_id,
/// time_at, n`. Fields an operation kind does not use are left empty.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CsvOpRecord {
    pub op: String,
    pub ts: Timestamp,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub delay: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub time_at: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
}

fn required_str(field: Option<String>, name: &str, op: &str) -> Result<String, String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(format!("{} requires a '{}' field", op, name)),
    }
}

fn required_int(field: Option<String>, name: &str, op: &str) -> Result<i64, String> {
    let raw = required_str(field, name, op)?;
    i64::from_str(&raw).map_err(|_| format!("invalid {} '{}' for {}", name, raw, op))
}

/// Convert a CSV row to a typed operation record
///
/// Validates that the fields each operation kind needs are present and
/// numeric fields parse. Returns a plain message on failure; the reader
/// attaches line context.
pub fn convert_op_record(row: CsvOpRecord) -> Result<OperationRecord, String> {
    let ts = row.ts;
    let op = match row.op.trim().to_lowercase().as_str() {
        "create" | "create_account" => Operation::CreateAccount {
            account: required_str(row.account, "account", "create")?,
        },
        "deposit" => Operation::Deposit {
            account: required_str(row.account, "account", "deposit")?,
            amount: required_int(row.amount, "amount", "deposit")?,
        },
        "transfer" => Operation::Transfer {
            source: required_str(row.account, "account", "transfer")?,
            target: required_str(row.target, "target", "transfer")?,
            amount: required_int(row.amount, "amount", "transfer")?,
        },
        "balance" | "get_balance" => Operation::GetBalance {
            account: required_str(row.account, "account", "balance")?,
            time_at: required_int(row.time_at, "time_at", "balance")?,
        },
        "top_spenders" => Operation::TopSpenders {
            n: required_int(row.n, "n", "top_spenders")?,
        },
        "schedule" | "schedule_payment" => Operation::SchedulePayment {
            account: required_str(row.account, "account", "schedule")?,
            amount: required_int(row.amount, "amount", "schedule")?,
            delay: required_int(row.delay, "delay", "schedule")?,
        },
        "cancel" | "cancel_payment" => Operation::CancelPayment {
            account: required_str(row.account, "account", "cancel")?,
            payment_id: required_str(row.payment_id, "payment_id", "cancel")?,
        },
        "merge" | "merge_accounts" => Operation::MergeAccounts {
            target: required_str(row.account, "account", "merge")?,
            source: required_str(row.target, "target", "merge")?,
        },
        other => return Err(format!("unknown operation '{}'", other)),
    };

    Ok(OperationRecord::new(ts, op))
}

/// Write the final account snapshot as CSV
///
/// Columns: `account,balance,outgoing`. The input is expected sorted by
/// account id, which `snapshot()` guarantees.
pub fn write_snapshot_csv(
    accounts: &[AccountSnapshot],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);
    writer
        .write_record(["account", "balance", "outgoing"])
        .map_err(LedgerError::from)?;
    for account in accounts {
        let balance = account.balance.to_string();
        let outgoing = account.outgoing.to_string();
        writer
            .write_record([account.account.as_str(), balance.as_str(), outgoing.as_str()])
            .map_err(LedgerError::from)?;
    }
    writer.flush()?;
    Ok(())
}
