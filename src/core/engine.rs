//! Balance engine
//!
//! This module provides the BalanceEngine that applies monetary deltas to
//! accounts and records the matching transactions.
//!
//! The engine enforces business rules such as:
//! - Account status checks before any movement
//! - Spendable funds (minimum balance for savings, overdraft for checking)
//! - Account daily debit limits
//! - Ownership when a customer acts on an account
//!
//! Every operation runs as one atomic unit under the locks of the accounts it
//! touches: validation, balance changes and the transaction record commit
//! together or not at all.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use super::ledger::Ledger;
use crate::types::money::validate_amount;
use crate::types::{
    Account, AccountId, Actor, BankError, BankResult, OperationKind, TellerOperation, Transaction,
    TransactionDraft, TransactionFilter, TransactionType,
};

/// Reject an actor that may not operate `account`
pub(crate) fn authorize(actor: &Actor, account: &Account) -> BankResult<()> {
    match actor {
        Actor::Customer(identity) if identity.person != account.owner => {
            Err(BankError::Unauthorized {
                person: identity.person,
                account: account.id,
            })
        }
        _ => Ok(()),
    }
}

/// Check that an active account can cover `amount`
pub(crate) fn ensure_funds(account: &Account, amount: Decimal) -> BankResult<()> {
    if !account.is_active() {
        return Err(BankError::account_inactive(account.id));
    }
    let available = account.spendable();
    if available < amount {
        return Err(BankError::insufficient_funds(account.id, available, amount));
    }
    Ok(())
}

/// Add `amount` to an account held under its lock
pub(crate) fn credit(account: &mut Account, amount: Decimal, now: DateTime<Utc>) -> BankResult<()> {
    if !account.is_active() {
        return Err(BankError::account_inactive(account.id));
    }
    account.balance = account
        .balance
        .checked_add(amount)
        .ok_or_else(|| BankError::arithmetic_overflow("credit", account.id))?;
    account.updated_at = now;
    Ok(())
}

/// Take `amount` from an account held under its lock
///
/// Fails without touching the account if it is inactive, cannot cover the
/// amount, or would exceed its daily debit limit.
pub(crate) fn debit(account: &mut Account, amount: Decimal, now: DateTime<Utc>) -> BankResult<()> {
    ensure_funds(account, amount)?;

    let day = now.date_naive();
    let used = account.daily_debits.used_on(day);
    let mut usage = account.daily_debits.clone();
    let after = usage
        .record(day, amount)
        .ok_or_else(|| BankError::arithmetic_overflow("debit", account.id))?;
    if after > account.daily_limit {
        return Err(BankError::daily_limit_exceeded(
            format!("account {}", account.id),
            account.daily_limit,
            used,
            amount,
        ));
    }

    account.balance = account
        .balance
        .checked_sub(amount)
        .ok_or_else(|| BankError::arithmetic_overflow("debit", account.id))?;
    account.daily_debits = usage;
    account.updated_at = now;
    Ok(())
}

/// Balance engine
///
/// Cheap to clone; clones share the same ledger.
#[derive(Debug, Clone)]
pub struct BalanceEngine {
    ledger: Arc<Ledger>,
}

impl BalanceEngine {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Credit funds to an account
    ///
    /// # Arguments
    ///
    /// * `account` - Account to credit
    /// * `amount` - Positive amount with at most two decimals
    ///
    /// # Returns
    ///
    /// The DEPOSIT transaction recorded for the credit
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is not positive or too precise (`Validation`)
    /// - The account does not exist (`NotFound`) or is closed (`AccountInactive`)
    /// - The journal cannot be written (`Storage`)
    pub fn deposit(&self, account: AccountId, amount: Decimal) -> BankResult<Transaction> {
        let amount = validate_amount("amount", amount)?;
        let now = self.ledger.now();

        self.ledger
            .store()
            .with_lock(account, |acc| {
                credit(acc, amount, now)?;
                let draft =
                    TransactionDraft::new(TransactionType::Deposit, amount, "Teller deposit")
                        .to_account(acc.id);
                self.ledger.post(now, draft, vec![acc.clone()], None, None)
            })
            .inspect_err(|e| warn!(account, amount = %amount, error = %e, "deposit rejected"))
    }

    /// Debit funds from an account
    ///
    /// # Arguments
    ///
    /// * `account` - Account to debit
    /// * `amount` - Positive amount with at most two decimals
    /// * `actor` - Who performs the withdrawal; customers may only debit
    ///   their own accounts, terminals are stamped on the transaction
    ///
    /// # Returns
    ///
    /// The WITHDRAWAL transaction recorded for the debit
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is invalid (`Validation`)
    /// - The account does not exist (`NotFound`) or is closed (`AccountInactive`)
    /// - The actor is a customer who does not own the account (`Unauthorized`)
    /// - Spendable funds do not cover the amount (`InsufficientFunds`)
    /// - The account's daily limit would be exceeded (`DailyLimitExceeded`)
    /// - The journal cannot be written (`Storage`)
    pub fn withdraw(
        &self,
        account: AccountId,
        amount: Decimal,
        actor: Actor,
    ) -> BankResult<Transaction> {
        let amount = validate_amount("amount", amount)?;
        let now = self.ledger.now();

        self.ledger
            .store()
            .with_lock(account, |acc| {
                authorize(&actor, acc)?;
                debit(acc, amount, now)?;
                let draft =
                    TransactionDraft::new(TransactionType::Withdrawal, amount, "Teller withdrawal")
                        .from_account(acc.id)
                        .at_terminal(actor.terminal());
                self.ledger.post(now, draft, vec![acc.clone()], None, None)
            })
            .inspect_err(|e| warn!(account, amount = %amount, error = %e, "withdrawal rejected"))
    }

    /// Move funds between two accounts on behalf of a teller
    ///
    /// See [`BalanceEngine::transfer_as`].
    pub fn transfer(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        description: &str,
    ) -> BankResult<Transaction> {
        self.transfer_as(Actor::Teller, source, destination, amount, description)
    }

    /// Move funds between two accounts
    ///
    /// Both account locks are taken in ascending id order. The debit, the
    /// credit and the TRANSFER record commit as one unit.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is invalid, or source and destination are the same
    ///   account (`Validation`)
    /// - Either account does not exist (`NotFound`) or is closed
    ///   (`AccountInactive`)
    /// - The actor is a customer who does not own the source (`Unauthorized`)
    /// - The source cannot cover the amount (`InsufficientFunds`) or would
    ///   exceed its daily limit (`DailyLimitExceeded`)
    /// - The journal cannot be written (`Storage`)
    pub fn transfer_as(
        &self,
        actor: Actor,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        description: &str,
    ) -> BankResult<Transaction> {
        let amount = validate_amount("amount", amount)?;
        let now = self.ledger.now();
        let description = match description.trim() {
            "" => "Transfer".to_string(),
            text => text.to_string(),
        };

        self.ledger
            .store()
            .with_locks(source, destination, |src, dst| {
                authorize(&actor, src)?;
                debit(src, amount, now)?;
                credit(dst, amount, now)?;
                let draft = TransactionDraft::new(TransactionType::Transfer, amount, description)
                    .from_account(src.id)
                    .to_account(dst.id)
                    .at_terminal(actor.terminal());
                self.ledger
                    .post(now, draft, vec![src.clone(), dst.clone()], None, None)
            })
            .inspect_err(|e| {
                warn!(source, destination, amount = %amount, error = %e, "transfer rejected")
            })
    }

    /// Latest committed balance of an account
    pub fn query_balance(&self, account: AccountId) -> BankResult<Decimal> {
        Ok(self.ledger.store().account(account)?.balance)
    }

    /// Apply a replayed teller operation
    pub fn apply(&self, operation: &TellerOperation) -> BankResult<Transaction> {
        match operation.kind {
            OperationKind::Deposit => self.deposit(operation.account, operation.amount),
            OperationKind::Withdrawal => {
                self.withdraw(operation.account, operation.amount, Actor::Teller)
            }
            OperationKind::Transfer => {
                let destination = operation.counterparty.ok_or_else(|| {
                    BankError::validation("counterparty", "transfer requires a destination account")
                })?;
                self.transfer(operation.account, destination, operation.amount, "")
            }
        }
    }

    /// Transactions matching `filter`, newest first
    pub fn list_transactions(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        self.ledger
            .transactions()
            .list(filter, self.ledger.config().list_limit)
    }

    pub fn transaction_by_reference(&self, reference: &str) -> BankResult<Transaction> {
        self.ledger.transactions().get_by_reference(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::journal::LedgerEvent;
    use crate::core::test_support::{dec, fixture, put_checking, put_savings};
    use crate::core::traits::Journal;
    use crate::types::{AccountStatus, AccountTerms, ErrorKind, Identity};
    use chrono::Duration;
    use rstest::rstest;

    #[test]
    fn test_deposit_credits_and_records() {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("10.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        let tx = engine.deposit(1, dec("25.50")).unwrap();

        assert_eq!(engine.query_balance(1).unwrap(), dec("35.50"));
        assert_eq!(tx.tx_type, TransactionType::Deposit);
        assert_eq!(tx.destination, Some(1));
        assert_eq!(tx.source, None);
        assert_eq!(fx.journal.events().len(), 1);
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-1")]
    #[case::three_decimals("1.001")]
    fn test_deposit_rejects_invalid_amount(#[case] amount: &str) {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("10.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        let err = engine.deposit(1, dec(amount)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(fx.journal.events().is_empty());
    }

    #[test]
    fn test_deposit_to_missing_account() {
        let fx = fixture();
        let engine = BalanceEngine::new(fx.ledger.clone());
        assert_eq!(engine.deposit(42, dec("1")).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_withdraw_insufficient_funds_changes_nothing() {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("50.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        let err = engine.withdraw(1, dec("50.01"), Actor::Teller).unwrap_err();

        assert_eq!(
            err,
            BankError::insufficient_funds(1, dec("50.00"), dec("50.01"))
        );
        assert_eq!(engine.query_balance(1).unwrap(), dec("50.00"));
        assert!(fx.ledger.transactions().is_empty());
    }

    #[test]
    fn test_withdraw_from_closed_account() {
        let fx = fixture();
        let mut account = put_savings(&fx.ledger, 1, dec("50.00"));
        account.status = AccountStatus::Closed;
        fx.ledger.store().put_account(account);
        let engine = BalanceEngine::new(fx.ledger.clone());

        let err = engine.withdraw(1, dec("1"), Actor::Teller).unwrap_err();
        assert_eq!(err, BankError::account_inactive(1));
    }

    #[test]
    fn test_withdraw_respects_minimum_balance() {
        let fx = fixture();
        let mut account = put_savings(&fx.ledger, 1, dec("100.00"));
        if let AccountTerms::Savings(terms) = &mut account.terms {
            terms.minimum_balance = dec("20.00");
        }
        fx.ledger.store().put_account(account);
        let engine = BalanceEngine::new(fx.ledger.clone());

        assert_eq!(
            engine.withdraw(1, dec("80.01"), Actor::Teller).unwrap_err().kind(),
            ErrorKind::InsufficientFunds
        );
        engine.withdraw(1, dec("80.00"), Actor::Teller).unwrap();
        assert_eq!(engine.query_balance(1).unwrap(), dec("20.00"));
    }

    #[test]
    fn test_checking_overdraft_is_bounded() {
        let fx = fixture();
        put_checking(&fx.ledger, 1, dec("100.00"), dec("50.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        engine.withdraw(1, dec("150.00"), Actor::Teller).unwrap();
        assert_eq!(engine.query_balance(1).unwrap(), dec("-50.00"));

        let err = engine.withdraw(1, dec("0.01"), Actor::Teller).unwrap_err();
        assert_eq!(err, BankError::insufficient_funds(1, dec("0.00"), dec("0.01")));
    }

    #[test]
    fn test_overdraft_near_decimal_max_still_withdraws() {
        let fx = fixture();
        put_checking(&fx.ledger, 1, Decimal::MAX - dec("100"), dec("200.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        engine.withdraw(1, dec("1.00"), Actor::Teller).unwrap();
        assert_eq!(engine.query_balance(1).unwrap(), Decimal::MAX - dec("101.00"));
    }

    #[test]
    fn test_daily_usage_overflow_is_rejected() {
        let fx = fixture();
        let mut account = put_savings(&fx.ledger, 1, dec("100.00"));
        account.daily_limit = Decimal::MAX;
        account.daily_debits.record(fx.ledger.today(), Decimal::MAX);
        fx.ledger.store().put_account(account.clone());
        let engine = BalanceEngine::new(fx.ledger.clone());

        let err = engine.withdraw(1, dec("1.00"), Actor::Teller).unwrap_err();
        assert_eq!(err, BankError::arithmetic_overflow("debit", 1));
        assert_eq!(fx.ledger.store().account(1).unwrap(), account);
        assert!(fx.journal.events().is_empty());
    }

    #[test]
    fn test_daily_limit_resets_next_day() {
        let fx = fixture();
        let mut account = put_savings(&fx.ledger, 1, dec("10000.00"));
        account.daily_limit = dec("100.00");
        fx.ledger.store().put_account(account);
        let engine = BalanceEngine::new(fx.ledger.clone());

        engine.withdraw(1, dec("60.00"), Actor::Teller).unwrap();
        let err = engine.withdraw(1, dec("40.01"), Actor::Teller).unwrap_err();
        assert_eq!(
            err,
            BankError::daily_limit_exceeded("account 1", dec("100.00"), dec("60.00"), dec("40.01"))
        );

        fx.clock.advance(Duration::days(1));
        engine.withdraw(1, dec("100.00"), Actor::Teller).unwrap();
        assert_eq!(engine.query_balance(1).unwrap(), dec("9840.00"));
    }

    #[test]
    fn test_customer_may_only_withdraw_from_own_account() {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("100.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());
        let now = fx.ledger.now();

        let stranger = Actor::Customer(Identity { person: 2, issued_at: now });
        let err = engine.withdraw(1, dec("10"), stranger).unwrap_err();
        assert_eq!(err, BankError::Unauthorized { person: 2, account: 1 });

        let owner = Actor::Customer(Identity { person: 1, issued_at: now });
        engine.withdraw(1, dec("10"), owner).unwrap();
        assert_eq!(engine.query_balance(1).unwrap(), dec("90.00"));
    }

    #[test]
    fn test_terminal_is_stamped_on_withdrawal() {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("100.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        let tx = engine.withdraw(1, dec("10"), Actor::Terminal(7)).unwrap();
        assert_eq!(tx.terminal, Some(7));
    }

    #[test]
    fn test_transfer_scenario() {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("1000.00"));
        put_savings(&fx.ledger, 2, dec("0.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        let tx = engine.transfer(1, 2, dec("300.00"), "rent").unwrap();

        assert_eq!(engine.query_balance(1).unwrap(), dec("700.00"));
        assert_eq!(engine.query_balance(2).unwrap(), dec("300.00"));
        assert_eq!(tx.tx_type, TransactionType::Transfer);
        assert_eq!(tx.amount, dec("300.00"));
        assert_eq!((tx.source, tx.destination), (Some(1), Some(2)));
        assert_eq!(tx.description, "rent");

        let transfers = engine.list_transactions(&TransactionFilter {
            tx_type: Some(TransactionType::Transfer),
            ..TransactionFilter::default()
        });
        assert_eq!(transfers, vec![tx]);
    }

    #[test]
    fn test_failed_transfer_is_atomic() {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("100.00"));
        put_savings(&fx.ledger, 2, dec("5.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        let err = engine.transfer(1, 2, dec("100.01"), "").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(engine.query_balance(1).unwrap(), dec("100.00"));
        assert_eq!(engine.query_balance(2).unwrap(), dec("5.00"));
        assert!(fx.ledger.transactions().is_empty());
        assert!(fx.journal.events().is_empty());
    }

    #[test]
    fn test_transfer_to_closed_account_rolls_back_debit() {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("100.00"));
        let mut closed = put_savings(&fx.ledger, 2, dec("0.00"));
        closed.status = AccountStatus::Closed;
        fx.ledger.store().put_account(closed);
        let engine = BalanceEngine::new(fx.ledger.clone());

        let err = engine.transfer(1, 2, dec("10.00"), "").unwrap_err();

        assert_eq!(err, BankError::account_inactive(2));
        let source = fx.ledger.store().account(1).unwrap();
        assert_eq!(source.balance, dec("100.00"));
        assert_eq!(source.daily_debits.used, Decimal::ZERO);
    }

    #[rstest]
    #[case::missing_destination(1, 9, ErrorKind::NotFound)]
    #[case::missing_source(9, 1, ErrorKind::NotFound)]
    #[case::same_account(1, 1, ErrorKind::ValidationError)]
    fn test_transfer_invalid_accounts(
        #[case] source: AccountId,
        #[case] destination: AccountId,
        #[case] expected: ErrorKind,
    ) {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("100.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        let err = engine.transfer(source, destination, dec("1"), "").unwrap_err();
        assert_eq!(err.kind(), expected);
    }

    #[test]
    fn test_posted_event_carries_new_balances() {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("100.00"));
        put_savings(&fx.ledger, 2, dec("0.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        engine.transfer(2, 1, dec("0.01"), "").unwrap_err();
        engine.transfer(1, 2, dec("40.00"), "").unwrap();

        match fx.journal.events().as_slice() {
            [LedgerEvent::Posted { accounts, transaction, .. }] => {
                let balances: Vec<_> = accounts.iter().map(|a| (a.id, a.balance)).collect();
                assert_eq!(balances, vec![(1, dec("60.00")), (2, dec("40.00"))]);
                assert_eq!(transaction.amount, dec("40.00"));
            }
            other => panic!("unexpected journal: {:?}", other),
        }
    }

    struct BrokenJournal;

    impl Journal<LedgerEvent> for BrokenJournal {
        fn append(&self, _event: &LedgerEvent) -> BankResult<()> {
            Err(BankError::storage("disk full"))
        }
    }

    #[test]
    fn test_journal_failure_leaves_no_effect() {
        let fx = fixture();
        let ledger = Arc::new(
            Ledger::new(
                crate::core::test_support::test_config(),
                Arc::new(BrokenJournal),
                fx.clock.clone(),
            )
            .unwrap(),
        );
        put_savings(&ledger, 1, dec("100.00"));
        put_savings(&ledger, 2, dec("0.00"));
        let engine = BalanceEngine::new(ledger.clone());

        let err = engine.transfer(1, 2, dec("10.00"), "").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(engine.query_balance(1).unwrap(), dec("100.00"));
        assert_eq!(engine.query_balance(2).unwrap(), dec("0.00"));
        assert!(ledger.transactions().is_empty());
    }

    #[rstest]
    #[case::deposit(OperationKind::Deposit, None, "110.00")]
    #[case::withdrawal(OperationKind::Withdrawal, None, "90.00")]
    #[case::transfer(OperationKind::Transfer, Some(2), "90.00")]
    fn test_apply_operation(
        #[case] kind: OperationKind,
        #[case] counterparty: Option<AccountId>,
        #[case] expected: &str,
    ) {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("100.00"));
        put_savings(&fx.ledger, 2, dec("0.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        engine
            .apply(&TellerOperation {
                kind,
                account: 1,
                counterparty,
                amount: dec("10.00"),
            })
            .unwrap();
        assert_eq!(engine.query_balance(1).unwrap(), dec(expected));
    }

    #[test]
    fn test_apply_transfer_without_counterparty() {
        let fx = fixture();
        put_savings(&fx.ledger, 1, dec("100.00"));
        let engine = BalanceEngine::new(fx.ledger.clone());

        let err = engine
            .apply(&TellerOperation {
                kind: OperationKind::Transfer,
                account: 1,
                counterparty: None,
                amount: dec("1"),
            })
            .unwrap_err();
        assert!(matches!(err, BankError::Validation { field: "counterparty", .. }));
    }
}
