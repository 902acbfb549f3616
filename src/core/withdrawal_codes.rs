//! Cardless withdrawal codes
//!
//! This module provides the WithdrawalCodeManager that issues short-lived
//! single-use codes bound to an account and an amount, and redeems them at a
//! terminal.
//!
//! # State machine
//!
//! ```text
//! PENDING --redeem before expiry--> USED
//! PENDING --redeem after expiry---> EXPIRED
//! PENDING --cancel----------------> CANCELLED
//! ```
//!
//! Expiry is evaluated lazily when a redemption is attempted. A code that
//! left PENDING never changes again. A redemption holds the code lock while it
//! takes the account lock; the USED code, the account debit and the
//! WITHDRAWAL record commit in one journal event.

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::engine::{debit, ensure_funds};
use super::ids::{generate_unique, random_digits};
use super::journal::LedgerEvent;
use super::ledger::Ledger;
use super::ledger_store::lock;
use crate::types::money::validate_amount;
use crate::types::{
    AccountId, BankError, BankResult, CodeState, TerminalId, Transaction, TransactionDraft,
    TransactionType, WithdrawalCode,
};

fn not_pending(code: &str) -> BankError {
    BankError::not_found("Pending withdrawal code", code)
}

#[derive(Debug, Clone)]
pub struct WithdrawalCodeManager {
    ledger: Arc<Ledger>,
}

impl WithdrawalCodeManager {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Issue a code for `amount` on `account`
    ///
    /// Funds are checked now but not reserved; redemption checks them again.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is invalid (`Validation`)
    /// - The account does not exist (`NotFound`) or is closed (`AccountInactive`)
    /// - The account cannot currently cover the amount (`InsufficientFunds`)
    /// - No unique code could be generated (`Exhausted`)
    /// - The journal cannot be written (`Storage`)
    pub fn issue(&self, account: AccountId, amount: Decimal) -> BankResult<WithdrawalCode> {
        let amount = validate_amount("amount", amount)?;
        let config = self.ledger.config();
        let store = self.ledger.store();
        let now = self.ledger.now();

        let code = store
            .with_lock(account, |acc| {
                ensure_funds(acc, amount)?;
                let expires_at = Duration::try_seconds(config.withdrawal_code_ttl_secs)
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .ok_or_else(|| {
                        BankError::validation("withdrawal_code_ttl_secs", "out of range")
                    })?;
                let value = generate_unique(
                    "withdrawal code",
                    config.max_generation_attempts,
                    || random_digits(config.withdrawal_code_length),
                    |candidate| store.code_index().claim(candidate, acc.id),
                )?;
                let code = WithdrawalCode {
                    code: value,
                    account: acc.id,
                    amount,
                    generated_at: now,
                    expires_at,
                    state: CodeState::Pending,
                    used_at: None,
                    terminal: None,
                };
                if let Err(e) = self
                    .ledger
                    .record(&LedgerEvent::CodeSaved { code: code.clone() })
                {
                    store.code_index().release(&code.code);
                    return Err(e);
                }
                Ok(code)
            })
            .inspect_err(|e| warn!(account, amount = %amount, error = %e, "code issue rejected"))?;

        store.put_code(code.clone());
        info!(
            account,
            amount = %amount,
            expires_at = %code.expires_at,
            "withdrawal code issued"
        );
        Ok(code)
    }

    /// Redeem a pending code at a terminal
    ///
    /// # Arguments
    ///
    /// * `code` - Code presented at the terminal
    /// * `terminal` - Terminal stamped on the code and the transaction
    ///
    /// # Returns
    ///
    /// The WITHDRAWAL transaction debiting the code's account
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No PENDING code matches (`NotFound`), which includes codes already
    ///   used, cancelled or expired
    /// - The code is past its expiration (`Expired`); the code becomes EXPIRED
    /// - The account can no longer cover the amount (`InsufficientFunds`) or
    ///   would exceed its daily limit (`DailyLimitExceeded`); the code stays
    ///   PENDING
    /// - The journal cannot be written (`Storage`)
    pub fn redeem(&self, code: &str, terminal: TerminalId) -> BankResult<Transaction> {
        let code = code.trim();
        let handle = self
            .ledger
            .store()
            .code_handle(code)
            .ok_or_else(|| not_pending(code))?;
        let mut guard = lock(&handle);
        if guard.state != CodeState::Pending {
            return Err(not_pending(code));
        }

        let now = self.ledger.now();
        if guard.is_expired_at(now) {
            let mut expired = guard.clone();
            expired.state = CodeState::Expired;
            self.ledger.record(&LedgerEvent::CodeSaved {
                code: expired.clone(),
            })?;
            *guard = expired;
            warn!(account = guard.account, expired_at = %guard.expires_at, "withdrawal code expired");
            return Err(BankError::Expired {
                code: code.to_string(),
                expired_at: guard.expires_at,
            });
        }

        let mut used = guard.clone();
        used.state = CodeState::Used;
        used.used_at = Some(now);
        used.terminal = Some(terminal);

        let transaction = self
            .ledger
            .store()
            .with_lock(guard.account, |acc| {
                debit(acc, used.amount, now)?;
                let draft = TransactionDraft::new(
                    TransactionType::Withdrawal,
                    used.amount,
                    "Cardless withdrawal",
                )
                .from_account(acc.id)
                .at_terminal(Some(terminal));
                self.ledger
                    .post(now, draft, vec![acc.clone()], None, Some(used.clone()))
            })
            .inspect_err(|e| {
                warn!(account = guard.account, terminal, error = %e, "code redemption rejected")
            })?;

        *guard = used;
        info!(
            account = guard.account,
            terminal,
            reference = %transaction.reference,
            "withdrawal code redeemed"
        );
        Ok(transaction)
    }

    /// Cancel a pending code
    pub fn cancel(&self, code: &str) -> BankResult<WithdrawalCode> {
        let code = code.trim();
        let handle = self
            .ledger
            .store()
            .code_handle(code)
            .ok_or_else(|| not_pending(code))?;
        let mut guard = lock(&handle);
        if guard.state != CodeState::Pending {
            return Err(not_pending(code));
        }

        let mut cancelled = guard.clone();
        cancelled.state = CodeState::Cancelled;
        self.ledger.record(&LedgerEvent::CodeSaved {
            code: cancelled.clone(),
        })?;
        *guard = cancelled.clone();
        info!(account = cancelled.account, "withdrawal code cancelled");
        Ok(cancelled)
    }

    pub fn get(&self, code: &str) -> BankResult<WithdrawalCode> {
        self.ledger.store().code(code)
    }

    /// Codes of one account, newest first
    pub fn list(&self, account: AccountId) -> Vec<WithdrawalCode> {
        self.ledger.store().codes_of(account)
    }
}
