//! Transaction-related types for the banking engine
//!
//! A [`Transaction`] is the immutable audit record of a balance change.
//! [`TellerOperation`] is the input record replayed from CSV files.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, CardId, TerminalId, TransactionId};

/// Kind of monetary movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Credit funds to an account
    Deposit,
    /// Debit funds from an account (teller, card or cardless)
    Withdrawal,
    /// Move funds between two accounts
    Transfer,
    BillPayment,
    Purchase,
}

impl TransactionType {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_uppercase().as_str() {
            "DEPOSIT" => Some(TransactionType::Deposit),
            "WITHDRAWAL" => Some(TransactionType::Withdrawal),
            "TRANSFER" => Some(TransactionType::Transfer),
            "BILL_PAYMENT" => Some(TransactionType::BillPayment),
            "PURCHASE" => Some(TransactionType::Purchase),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Completed,
}

/// Immutable ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// System-generated unique reference (TRX...)
    pub reference: String,
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub source: Option<AccountId>,
    pub destination: Option<AccountId>,
    pub card: Option<CardId>,
    pub terminal: Option<TerminalId>,
    pub status: TransactionStatus,
    pub description: String,
}

impl Transaction {
    pub fn touches(&self, account: AccountId) -> bool {
        self.source == Some(account) || self.destination == Some(account)
    }
}

/// Fields of a transaction chosen by the operation; id, reference and
/// timestamp are assigned at commit
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub source: Option<AccountId>,
    pub destination: Option<AccountId>,
    pub card: Option<CardId>,
    pub terminal: Option<TerminalId>,
    pub description: String,
}

impl TransactionDraft {
    pub fn new(tx_type: TransactionType, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            tx_type,
            amount,
            source: None,
            destination: None,
            card: None,
            terminal: None,
            description: description.into(),
        }
    }

    pub fn from_account(mut self, account: AccountId) -> Self {
        self.source = Some(account);
        self
    }

    pub fn to_account(mut self, account: AccountId) -> Self {
        self.destination = Some(account);
        self
    }

    pub fn with_card(mut self, card: CardId) -> Self {
        self.card = Some(card);
        self
    }

    pub fn at_terminal(mut self, terminal: Option<TerminalId>) -> Self {
        self.terminal = terminal;
        self
    }
}

/// Transaction listing filter
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Matches either side of the movement
    pub account: Option<AccountId>,
    pub tx_type: Option<TransactionType>,
    /// Inclusive lower bound
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of records; the configured default when `None`
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn for_account(account: AccountId) -> Self {
        Self {
            account: Some(account),
            ..Self::default()
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.account.is_none_or(|account| tx.touches(account))
            && self.tx_type.is_none_or(|tx_type| tx.tx_type == tx_type)
            && self.from.is_none_or(|from| tx.timestamp >= from)
            && self.to.is_none_or(|to| tx.timestamp <= to)
    }
}

/// Kind of a replayed teller operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Deposit,
    Withdrawal,
    Transfer,
}

/// Teller operation read from a replay file
#[derive(Debug, Clone, PartialEq)]
pub struct TellerOperation {
    pub kind: OperationKind,
    pub account: AccountId,
    /// Destination account of a transfer
    pub counterparty: Option<AccountId>,
    pub amount: Decimal,
}

impl TellerOperation {
    /// Accounts whose locks the operation takes
    pub fn accounts(&self) -> impl Iterator<Item = AccountId> {
        std::iter::once(self.account).chain(self.counterparty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample(source: Option<AccountId>, destination: Option<AccountId>) -> Transaction {
        Transaction {
            id: 1,
            reference: "TRX20260101000000ABCDEF".to_string(),
            tx_type: TransactionType::Transfer,
            amount: Decimal::new(30000, 2),
            timestamp: Utc::now(),
            source,
            destination,
            card: None,
            terminal: None,
            status: TransactionStatus::Completed,
            description: "test".to_string(),
        }
    }

    #[rstest]
    #[case::source(Some(1), Some(2), 1, true)]
    #[case::destination(Some(1), Some(2), 2, true)]
    #[case::unrelated(Some(1), Some(2), 3, false)]
    #[case::deposit_only(None, Some(3), 3, true)]
    fn test_filter_by_account(
        #[case] source: Option<AccountId>,
        #[case] destination: Option<AccountId>,
        #[case] account: AccountId,
        #[case] expected: bool,
    ) {
        let filter = TransactionFilter::for_account(account);
        assert_eq!(filter.matches(&sample(source, destination)), expected);
    }

    #[test]
    fn test_filter_by_type_and_range() {
        let tx = sample(Some(1), Some(2));
        let mut filter = TransactionFilter {
            tx_type: Some(TransactionType::Transfer),
            from: Some(tx.timestamp),
            to: Some(tx.timestamp),
            ..TransactionFilter::default()
        };
        assert!(filter.matches(&tx));

        filter.tx_type = Some(TransactionType::Deposit);
        assert!(!filter.matches(&tx));
    }

    #[rstest]
    #[case("deposit", Some(TransactionType::Deposit))]
    #[case("BILL_PAYMENT", Some(TransactionType::BillPayment))]
    #[case("refund", None)]
    fn test_parse_transaction_type(#[case] text: &str, #[case] expected: Option<TransactionType>) {
        assert_eq!(TransactionType::parse(text), expected);
    }
}
