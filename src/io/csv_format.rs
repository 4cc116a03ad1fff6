//! CSV format handling for transaction replay and balance output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to transactions
//! - Audit report serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::core::AuditReport;
use crate::types::{AccountId, Transaction, TransactionKind};
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: kind, account, receiver, amount.
/// `receiver` is only used by transfers and `amount` is ignored for audits.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    pub kind: String,
    pub account: Option<AccountId>,
    pub receiver: Option<AccountId>,
    pub amount: Option<String>,
}

/// Convert a CsvRecord to a Transaction
///
/// This function:
/// - Parses the kind string (case-insensitive; `balance` is accepted for audits)
/// - Parses the amount as a finite floating-point number
/// - Validates that deposits and transfers carry an account and an amount
/// - Validates that transfers carry a receiver
///
/// Unknown account ids are not checked here; the handlers report them.
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<Transaction, String> {
    let kind = match csv_record.kind.to_lowercase().as_str() {
        "deposit" => TransactionKind::Deposit,
        "transfer" => TransactionKind::Transfer,
        "audit" | "balance" => TransactionKind::Audit,
        _ => return Err(format!("Invalid transaction kind: '{}'", csv_record.kind)),
    };

    if kind == TransactionKind::Audit {
        return Ok(Transaction::audit());
    }

    let account = csv_record
        .account
        .ok_or_else(|| format!("{} requires an account", kind))?;

    let amount = match csv_record.amount {
        Some(amount_str) if !amount_str.trim().is_empty() => {
            match amount_str.trim().parse::<f64>() {
                Ok(amount) if amount.is_finite() => amount,
                _ => {
                    return Err(format!(
                        "Invalid amount '{}' for account {}",
                        amount_str, account
                    ))
                }
            }
        }
        _ => {
            return Err(format!(
                "{} for account {} requires an amount",
                kind, account
            ))
        }
    };

    match kind {
        TransactionKind::Transfer => {
            let receiver = csv_record
                .receiver
                .ok_or_else(|| format!("transfer from account {} requires a receiver", account))?;
            Ok(Transaction::transfer(account, receiver, amount))
        }
        _ => Ok(Transaction::deposit(account, amount)),
    }
}

/// Write an audit report in CSV format
///
/// Writes one `id,name,balance` row per account, sorted by id, followed by a
/// `total` row. Balances are printed with two decimal places.
pub fn write_balances_csv(report: &AuditReport, output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["id", "name", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut lines = report.lines.clone();
    lines.sort_by_key(|line| line.id);

    for line in lines {
        writer
            .write_record(&[
                line.id.to_string(),
                line.name,
                format!("{:.2}", line.balance),
            ])
            .map_err(|e| format!("Failed to write balance record: {}", e))?;
    }

    writer
        .write_record(&["total".to_string(), String::new(), format!("{:.2}", report.total)])
        .map_err(|e| format!("Failed to write total record: {}", e))?;

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountSnapshot;
    use rstest::rstest;

    fn record(
        kind: &str,
        account: Option<u32>,
        receiver: Option<u32>,
        amount: Option<&str>,
    ) -> CsvRecord {
        CsvRecord {
            kind: kind.to_string(),
            account,
            receiver,
            amount: amount.map(|s| s.to_string()),
        }
    }

    #[rstest]
    #[case::deposit(record("deposit", Some(1), None, Some("100.0")), Transaction::deposit(1, 100.0))]
    #[case::withdrawal(record("deposit", Some(1), None, Some("-20.5")), Transaction::deposit(1, -20.5))]
    #[case::upper_case(record("DEPOSIT", Some(2), None, Some("1")), Transaction::deposit(2, 1.0))]
    #[case::transfer(record("transfer", Some(5), Some(2), Some("100")), Transaction::transfer(5, 2, 100.0))]
    #[case::audit(record("audit", None, None, None), Transaction::audit())]
    #[case::balance_alias(record("Balance", Some(3), None, Some("9")), Transaction::audit())]
    #[case::whitespace_amount(record("deposit", Some(1), None, Some("  7.25  ")), Transaction::deposit(1, 7.25))]
    fn test_convert_csv_record_valid(#[case] csv_record: CsvRecord, #[case] expected: Transaction) {
        assert_eq!(convert_csv_record(csv_record), Ok(expected));
    }

    #[rstest]
    #[case::invalid_kind(record("withdrawal", Some(1), None, Some("1")), "Invalid transaction kind")]
    #[case::missing_account(record("deposit", None, None, Some("1")), "requires an account")]
    #[case::missing_amount(record("deposit", Some(1), None, None), "requires an amount")]
    #[case::blank_amount(record("transfer", Some(1), Some(2), Some("  ")), "requires an amount")]
    #[case::invalid_amount(record("deposit", Some(1), None, Some("abc")), "Invalid amount")]
    #[case::infinite_amount(record("deposit", Some(1), None, Some("inf")), "Invalid amount")]
    #[case::missing_receiver(record("transfer", Some(1), None, Some("5")), "requires a receiver")]
    fn test_convert_csv_record_errors(#[case] csv_record: CsvRecord, #[case] expected_error: &str) {
        let result = convert_csv_record(csv_record);

        assert!(result.is_err());
        let error = result.unwrap_err();
        assert!(error.contains(expected_error), "unexpected error: {}", error);
    }

    #[rstest]
    #[case::sorted_with_total(
        AuditReport {
            lines: vec![
                AccountSnapshot { id: 2, name: "Account 2".to_string(), balance: 1050.0 },
                AccountSnapshot { id: 0, name: "Account 0".to_string(), balance: 1100.0 },
                AccountSnapshot { id: 1, name: "Account 1".to_string(), balance: 950.0 },
            ],
            total: 3100.0,
        },
        "id,name,balance\n0,Account 0,1100.00\n1,Account 1,950.00\n2,Account 2,1050.00\ntotal,,3100.00\n"
    )]
    #[case::negative_balance(
        AuditReport {
            lines: vec![AccountSnapshot { id: 0, name: "Account 0".to_string(), balance: -12.5 }],
            total: -12.5,
        },
        "id,name,balance\n0,Account 0,-12.50\ntotal,,-12.50\n"
    )]
    #[case::empty(
        AuditReport { lines: vec![], total: 0.0 },
        "id,name,balance\ntotal,,0.00\n"
    )]
    fn test_write_balances_csv(#[case] report: AuditReport, #[case] expected_output: &str) {
        let mut output = Vec::new();
        let result = write_balances_csv(&report, &mut output);
        assert!(result.is_ok());

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str, expected_output);
    }
}
