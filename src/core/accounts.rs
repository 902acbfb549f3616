//! Account registry
//!
//! Opens savings and checking accounts for registered persons and manages
//! their lifecycle. An opening balance is always posted as a DEPOSIT so that
//! no balance exists without a transaction behind it.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use super::engine::credit;
use super::ids::{generate_unique, random_digits};
use super::journal::LedgerEvent;
use super::ledger::Ledger;
use crate::types::money::validate_amount;
use crate::types::{
    Account, AccountId, AccountKind, AccountStatus, AccountTerms, BankError, BankResult,
    CheckingTerms, DailyUsage, PersonId, SavingsTerms, TransactionDraft, TransactionType,
};

/// Options common to both account kinds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Opening {
    /// Posted as a DEPOSIT when positive
    pub initial_deposit: Decimal,
    /// Defaults to the configured daily limit
    pub daily_limit: Option<Decimal>,
    pub monthly_fee: Decimal,
}

impl Opening {
    pub fn with_deposit(initial_deposit: Decimal) -> Self {
        Self {
            initial_deposit,
            ..Self::default()
        }
    }
}

fn non_negative(field: &'static str, value: Decimal) -> BankResult<()> {
    if value < Decimal::ZERO {
        return Err(BankError::validation(field, "must not be negative"));
    }
    Ok(())
}

fn validate_terms(terms: &AccountTerms) -> BankResult<()> {
    match terms {
        AccountTerms::Savings(t) => {
            non_negative("interest_rate", t.interest_rate)?;
            non_negative("minimum_balance", t.minimum_balance)?;
            non_negative("maintenance_fee", t.maintenance_fee)
        }
        AccountTerms::Checking(t) => {
            non_negative("authorized_overdraft", t.authorized_overdraft)?;
            non_negative("checkbook_cost", t.checkbook_cost)
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountRegistry {
    ledger: Arc<Ledger>,
}

impl AccountRegistry {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn open_savings(
        &self,
        owner: PersonId,
        opening: Opening,
        terms: SavingsTerms,
    ) -> BankResult<Account> {
        self.open(owner, opening, AccountTerms::Savings(terms))
    }

    pub fn open_checking(
        &self,
        owner: PersonId,
        opening: Opening,
        terms: CheckingTerms,
    ) -> BankResult<Account> {
        self.open(owner, opening, AccountTerms::Checking(terms))
    }

    /// Open an account for an active person
    ///
    /// # Arguments
    ///
    /// * `owner` - Person that will own the account
    /// * `opening` - Opening deposit, daily limit and monthly fee
    /// * `terms` - Savings or checking extension
    ///
    /// # Returns
    ///
    /// The account as committed, with its generated number
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The owner does not exist (`NotFound`) or is deactivated (`PersonInactive`)
    /// - An amount or term is negative or too precise (`Validation`)
    /// - No unique account number could be generated (`Exhausted`)
    /// - The journal cannot be written (`Storage`)
    pub fn open(
        &self,
        owner: PersonId,
        opening: Opening,
        terms: AccountTerms,
    ) -> BankResult<Account> {
        let config = self.ledger.config();
        let deposit = match opening.initial_deposit {
            amount if amount == Decimal::ZERO => None,
            amount => Some(validate_amount("initial_deposit", amount)?),
        };
        let daily_limit = match opening.daily_limit {
            Some(limit) => validate_amount("daily_limit", limit)?,
            None => config.default_daily_limit,
        };
        non_negative("monthly_fee", opening.monthly_fee)?;
        validate_terms(&terms)?;

        let store = self.ledger.store();
        let person = store.person(owner)?;
        if !person.active {
            return Err(BankError::PersonInactive { person: owner });
        }

        let id = store.next_account_id();
        let number = generate_unique(
            "account number",
            config.max_generation_attempts,
            || {
                format!(
                    "{}{}",
                    config.account_number_prefix,
                    random_digits(config.account_number_digits)
                )
            },
            |candidate| store.account_numbers().claim(candidate, id),
        )?;

        let now = self.ledger.now();
        let mut account = Account {
            id,
            owner,
            number,
            status: AccountStatus::Active,
            balance: Decimal::ZERO,
            monthly_fee: opening.monthly_fee,
            daily_limit,
            daily_debits: DailyUsage::default(),
            created_at: now,
            updated_at: now,
            terms,
        };

        let committed = match deposit {
            Some(amount) => credit(&mut account, amount, now).and_then(|()| {
                let draft =
                    TransactionDraft::new(TransactionType::Deposit, amount, "Opening deposit")
                        .to_account(id);
                self.ledger
                    .post(now, draft, vec![account.clone()], None, None)
                    .map(|_| ())
            }),
            None => self.ledger.record(&LedgerEvent::AccountSaved {
                account: account.clone(),
            }),
        };
        if let Err(e) = committed {
            store.account_numbers().release(&account.number);
            return Err(e);
        }

        store.put_account(account.clone());
        info!(
            account = id,
            owner,
            number = %account.number,
            kind = account.kind().as_str(),
            balance = %account.balance,
            "account opened"
        );
        Ok(account)
    }

    pub fn get(&self, id: AccountId) -> BankResult<Account> {
        self.ledger.store().account(id)
    }

    pub fn by_number(&self, number: &str) -> BankResult<Account> {
        self.ledger.store().account_by_number(number)
    }

    /// Accounts of one owner, ordered by id
    pub fn list(
        &self,
        owner: PersonId,
        active_only: bool,
        kind: Option<AccountKind>,
    ) -> Vec<Account> {
        self.ledger
            .store()
            .accounts()
            .into_iter()
            .filter(|a| a.owner == owner)
            .filter(|a| !active_only || a.is_active())
            .filter(|a| kind.is_none_or(|k| a.kind() == k))
            .collect()
    }

    /// Close an active account with a zero balance
    pub fn close(&self, id: AccountId) -> BankResult<Account> {
        let now = self.ledger.now();
        let closed = self.ledger.store().with_lock(id, |account| {
            if !account.is_active() {
                return Err(BankError::account_inactive(account.id));
            }
            if !account.balance.is_zero() {
                return Err(BankError::validation(
                    "balance",
                    format!("account {} still holds {}", account.id, account.balance),
                ));
            }
            account.status = AccountStatus::Closed;
            account.updated_at = now;
            self.ledger.record(&LedgerEvent::AccountSaved {
                account: account.clone(),
            })?;
            Ok(account.clone())
        })?;
        info!(account = id, "account closed");
        Ok(closed)
    }
}
