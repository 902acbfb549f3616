//! CSV format handling for replayed teller operations and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization of operations
//! - Conversion from CSV records to [`TellerOperation`]
//! - AccountSeed rows used to open the accounts a replay runs against
//! - Balance output serialization
//!
//! All conversion functions are pure (no I/O) for easy testing.

use std::io::Write;

use serde::Deserialize;

use crate::types::money::parse_amount;
use crate::types::{
    Account, AccountId, AccountKind, BankError, BankResult, OperationKind, TellerOperation,
};

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: type, account, counterparty,
/// amount. The counterparty is only read for transfers.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub op_type: String,
    pub account: AccountId,
    pub counterparty: Option<AccountId>,
    pub amount: Option<String>,
}

/// Convert a CsvRecord to a TellerOperation
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
///
/// # Returns
///
/// The operation, or a `Validation` error when the type is unknown, the
/// amount is missing or not a positive two-decimal amount, or a transfer has
/// no counterparty
pub fn convert_csv_record(csv_record: CsvRecord) -> BankResult<TellerOperation> {
    let kind = match csv_record.op_type.trim().to_lowercase().as_str() {
        "deposit" => OperationKind::Deposit,
        "withdrawal" => OperationKind::Withdrawal,
        "transfer" => OperationKind::Transfer,
        _ => {
            return Err(BankError::validation(
                "type",
                format!(
                    "invalid operation type '{}' for account {}",
                    csv_record.op_type, csv_record.account
                ),
            ))
        }
    };

    let amount = match csv_record.amount.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => parse_amount("amount", text)?,
        _ => {
            return Err(BankError::validation(
                "amount",
                format!("{:?} on account {} requires an amount", kind, csv_record.account),
            ))
        }
    };

    let counterparty = match kind {
        OperationKind::Transfer => Some(csv_record.counterparty.ok_or_else(|| {
            BankError::validation(
                "counterparty",
                format!("transfer from account {} requires a counterparty", csv_record.account),
            )
        })?),
        // Ignored for single-account operations
        OperationKind::Deposit | OperationKind::Withdrawal => None,
    };

    Ok(TellerOperation {
        kind,
        account: csv_record.account,
        counterparty,
        amount,
    })
}

/// One account to open before a replay: `kind,opening_balance,overdraft`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountSeed {
    pub kind: String,
    pub opening_balance: Option<String>,
    pub overdraft: Option<String>,
}

impl AccountSeed {
    pub fn account_kind(&self) -> BankResult<AccountKind> {
        match self.kind.trim().to_lowercase().as_str() {
            "savings" => Ok(AccountKind::Savings),
            "checking" => Ok(AccountKind::Checking),
            other => Err(BankError::validation(
                "kind",
                format!("unknown account kind '{}'", other),
            )),
        }
    }
}

/// Write final balances as CSV
///
/// Columns: account, kind, status, balance. Accounts are sorted by id and
/// balances printed with two decimals.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> BankResult<()> {
    let write_failed = |e: csv::Error| BankError::storage(format!("failed to write balances: {}", e));
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["account", "kind", "status", "balance"])
        .map_err(write_failed)?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.id.to_string(),
                account.kind().as_str().to_string(),
                account.status.as_str().to_string(),
                format!("{:.2}", account.balance),
            ])
            .map_err(write_failed)?;
    }

    writer.flush()?;
    Ok(())
}
