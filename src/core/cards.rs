//! Card issuance and authentication
//!
//! This module provides the CardAuthenticator component that issues debit
//! and credit cards, checks card state and PIN, and composes card-based
//! withdrawals with the balance engine.
//!
//! # Lock order
//!
//! A card withdrawal holds the card lock while it takes the account lock,
//! never the other way round. The card's daily usage and the account debit
//! commit in the same journal event.

use std::sync::{Arc, Mutex};

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::engine::debit;
use super::ids::{card_number, generate_unique, random_digits};
use super::journal::LedgerEvent;
use super::ledger::Ledger;
use super::ledger_store::lock;
use super::secrets::{validate_pin, SecretHasher};
use crate::types::card::mask_card_number;
use crate::types::money::validate_amount;
use crate::types::{
    AccountId, BankError, BankResult, Card, CardId, CardKind, CardStatus, CardTerms, CardView,
    CreditTerms, DailyUsage, DebitTerms, IssuedCard, TerminalId, Transaction, TransactionDraft,
    TransactionType,
};

const ISSUING_COUNTRY: &str = "ECUADOR";

/// Daily limits of a debit card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebitLimits {
    pub withdrawal: Decimal,
    pub purchase: Decimal,
}

/// Reject a card that may not be used today with this PIN
fn check_card(hasher: &SecretHasher, card: &Card, pin: &str, today: NaiveDate) -> BankResult<()> {
    if card.status != CardStatus::Active {
        return Err(BankError::CardBlocked {
            card: card.masked_number(),
            reason: "blocked",
        });
    }
    if today > card.expires_on {
        return Err(BankError::CardBlocked {
            card: card.masked_number(),
            reason: "expired",
        });
    }
    if !hasher.verify(pin, &card.pin_hash) {
        return Err(BankError::WrongPin {
            card: card.masked_number(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct CardAuthenticator {
    ledger: Arc<Ledger>,
}

impl CardAuthenticator {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Issue a debit card, with the configured limits unless `limits` is set
    pub fn issue_debit(
        &self,
        account: AccountId,
        holder: &str,
        pin: &str,
        limits: Option<DebitLimits>,
    ) -> BankResult<IssuedCard> {
        let config = self.ledger.config();
        let limits = match limits {
            Some(limits) => DebitLimits {
                withdrawal: validate_amount("daily_withdrawal_limit", limits.withdrawal)?,
                purchase: validate_amount("daily_purchase_limit", limits.purchase)?,
            },
            None => DebitLimits {
                withdrawal: config.debit_daily_withdrawal_limit,
                purchase: config.debit_daily_purchase_limit,
            },
        };
        let terms = CardTerms::Debit(DebitTerms {
            daily_withdrawal_limit: limits.withdrawal,
            daily_purchase_limit: limits.purchase,
            withdrawals: DailyUsage::default(),
        });
        self.issue(account, holder, pin, terms)
    }

    /// Issue a credit card with the whole line available
    pub fn issue_credit(
        &self,
        account: AccountId,
        holder: &str,
        pin: &str,
        credit_line: Decimal,
    ) -> BankResult<IssuedCard> {
        let config = self.ledger.config();
        let credit_line = validate_amount("credit_line", credit_line)?;
        let terms = CardTerms::Credit(CreditTerms {
            credit_line,
            available_credit: credit_line,
            statement_day: config.credit_statement_day,
            payment_day: config.credit_payment_day,
            interest_rate: config.credit_interest_rate,
            accrued_balance: Decimal::ZERO,
        });
        self.issue(account, holder, pin, terms)
    }

    /// Create a card bound to an active account
    ///
    /// # Returns
    ///
    /// The card view together with the full number and the verification
    /// code, which are not retrievable afterwards
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The PIN is not 4 to 6 digits or the holder is blank (`Validation`)
    /// - The account does not exist (`NotFound`) or is closed (`AccountInactive`)
    /// - No unique card number could be generated (`Exhausted`)
    /// - The journal cannot be written (`Storage`)
    fn issue(
        &self,
        account: AccountId,
        holder: &str,
        pin: &str,
        terms: CardTerms,
    ) -> BankResult<IssuedCard> {
        validate_pin(pin)?;
        let holder = holder.trim().to_uppercase();
        if holder.is_empty() {
            return Err(BankError::validation("holder", "must not be empty"));
        }

        let config = self.ledger.config();
        let store = self.ledger.store();
        if !store.account(account)?.is_active() {
            return Err(BankError::account_inactive(account));
        }

        let issued_on = self.ledger.today();
        let expires_on = config
            .card_validity_years
            .checked_mul(12)
            .and_then(|months| issued_on.checked_add_months(Months::new(months)))
            .ok_or_else(|| BankError::validation("card_validity_years", "out of range"))?;
        let verification_code = random_digits(3);
        let hasher = self.ledger.hasher();
        let pin_hash = hasher.hash(pin)?;
        let verification_hash = hasher.hash(&verification_code)?;

        let id = store.next_card_id();
        let number = generate_unique(
            "card number",
            config.max_generation_attempts,
            || card_number(&config.card_number_prefix),
            |candidate| store.card_numbers().claim(candidate, id),
        )?;

        let card = Card {
            id,
            account,
            number,
            holder,
            issued_on,
            expires_on,
            status: CardStatus::Active,
            pin_hash,
            verification_hash,
            country: ISSUING_COUNTRY.to_string(),
            terms,
        };
        if let Err(e) = self
            .ledger
            .record(&LedgerEvent::CardSaved { card: card.clone() })
        {
            store.card_numbers().release(&card.number);
            return Err(e);
        }

        let issued = IssuedCard {
            card: card.view(),
            number: card.number.clone(),
            verification_code,
        };
        store.put_card(card);
        info!(
            card = id,
            account,
            number = %issued.card.number,
            kind = ?issued.card.kind,
            "card issued"
        );
        Ok(issued)
    }

    fn handle(&self, number: &str) -> BankResult<Arc<Mutex<Card>>> {
        self.ledger
            .store()
            .card_handle_by_number(number)
            .ok_or_else(|| BankError::InvalidCard {
                card: mask_card_number(number.trim()),
            })
    }

    /// Check a card number and PIN
    ///
    /// # Errors
    ///
    /// - `InvalidCard` if no card has this number
    /// - `CardBlocked` if the card is blocked or past its expiration date
    /// - `WrongPin` if the PIN does not match
    pub fn authenticate(&self, number: &str, pin: &str) -> BankResult<CardView> {
        let handle = self.handle(number)?;
        let card = lock(&handle).clone();
        check_card(self.ledger.hasher(), &card, pin, self.ledger.today())
            .inspect_err(|e| warn!(card = %card.masked_number(), error = %e, "card rejected"))?;
        Ok(card.view())
    }

    /// Withdraw cash from the card's account
    ///
    /// # Arguments
    ///
    /// * `number` - Full card number
    /// * `pin` - PIN presented at the terminal
    /// * `amount` - Positive amount with at most two decimals
    /// * `terminal` - Terminal stamped on the transaction
    ///
    /// # Errors
    ///
    /// Any error of [`CardAuthenticator::authenticate`], plus:
    /// - `DailyLimitExceeded` if a debit card's daily withdrawal limit or
    ///   the account's daily limit would be exceeded
    /// - `InsufficientFunds` or `AccountInactive` from the account debit
    /// - `Storage` if the journal cannot be written
    pub fn withdraw(
        &self,
        number: &str,
        pin: &str,
        amount: Decimal,
        terminal: TerminalId,
    ) -> BankResult<Transaction> {
        let amount = validate_amount("amount", amount)?;
        let handle = self.handle(number)?;
        let mut guard = lock(&handle);
        let now = self.ledger.now();
        let today = now.date_naive();

        let result = check_card(self.ledger.hasher(), &guard, pin, today).and_then(|()| {
            let mut card = guard.clone();
            let masked = card.masked_number();
            if let CardTerms::Debit(terms) = &mut card.terms {
                let used = terms.withdrawals.used_on(today);
                let after = terms
                    .withdrawals
                    .record(today, amount)
                    .ok_or_else(|| BankError::arithmetic_overflow("card withdrawal", card.account))?;
                if after > terms.daily_withdrawal_limit {
                    return Err(BankError::daily_limit_exceeded(
                        format!("card {}", masked),
                        terms.daily_withdrawal_limit,
                        used,
                        amount,
                    ));
                }
            }

            let transaction = self.ledger.store().with_lock(card.account, |account| {
                debit(account, amount, now)?;
                let draft =
                    TransactionDraft::new(TransactionType::Withdrawal, amount, "Card withdrawal")
                        .from_account(account.id)
                        .with_card(card.id)
                        .at_terminal(Some(terminal));
                self.ledger
                    .post(now, draft, vec![account.clone()], Some(card.clone()), None)
            })?;
            Ok((card, transaction))
        });

        match result {
            Ok((card, transaction)) => {
                *guard = card;
                Ok(transaction)
            }
            Err(e) => {
                warn!(
                    card = %guard.masked_number(),
                    amount = %amount,
                    terminal,
                    error = %e,
                    "card withdrawal rejected"
                );
                Err(e)
            }
        }
    }

    /// Replace the PIN after checking the current one
    pub fn change_pin(&self, number: &str, current: &str, new_pin: &str) -> BankResult<()> {
        validate_pin(new_pin)?;
        let handle = self.handle(number)?;
        let mut guard = lock(&handle);
        check_card(self.ledger.hasher(), &guard, current, self.ledger.today())?;

        let mut updated = guard.clone();
        updated.pin_hash = self.ledger.hasher().hash(new_pin)?;
        self.ledger.record(&LedgerEvent::CardSaved {
            card: updated.clone(),
        })?;
        *guard = updated;
        info!(card = guard.id, "PIN changed");
        Ok(())
    }

    /// Block a card; blocking is final and repeated calls are no-ops
    pub fn block(&self, id: CardId) -> BankResult<CardView> {
        let handle = self.ledger.store().card_handle(id)?;
        let mut guard = lock(&handle);
        if guard.status == CardStatus::Blocked {
            return Ok(guard.view());
        }

        let mut updated = guard.clone();
        updated.status = CardStatus::Blocked;
        self.ledger.record(&LedgerEvent::CardSaved {
            card: updated.clone(),
        })?;
        *guard = updated;
        info!(card = id, "card blocked");
        Ok(guard.view())
    }

    pub fn get(&self, id: CardId) -> BankResult<CardView> {
        Ok(self.ledger.store().card(id)?.view())
    }

    /// Active cards, optionally of one account or kind
    pub fn list(&self, account: Option<AccountId>, kind: Option<CardKind>) -> Vec<CardView> {
        self.ledger
            .store()
            .cards()
            .into_iter()
            .filter(|c| c.status == CardStatus::Active)
            .filter(|c| account.is_none_or(|a| c.account == a))
            .filter(|c| kind.is_none_or(|k| c.kind() == k))
            .map(|c| c.view())
            .collect()
    }
}
