//! Card types
//!
//! Cards share a common record and carry debit or credit terms in
//! [`CardTerms`]. Secrets (PIN, verification code) are stored only as salted
//! hashes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::DailyUsage;
use super::ids::{AccountId, CardId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardKind {
    Debit,
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    Active,
    Blocked,
}

/// Debit card limits and usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebitTerms {
    pub daily_withdrawal_limit: Decimal,
    pub daily_purchase_limit: Decimal,
    pub withdrawals: DailyUsage,
}

/// Credit card line and statement data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTerms {
    pub credit_line: Decimal,
    pub available_credit: Decimal,
    /// Day of month the statement closes
    pub statement_day: u32,
    /// Day of month payment is due
    pub payment_day: u32,
    pub interest_rate: Decimal,
    pub accrued_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardTerms {
    Debit(DebitTerms),
    Credit(CreditTerms),
}

/// Card record as stored in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub account: AccountId,
    /// 16-digit card number (Luhn-valid)
    pub number: String,
    pub holder: String,
    pub issued_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub status: CardStatus,
    pub pin_hash: String,
    pub verification_hash: String,
    pub country: String,
    pub terms: CardTerms,
}

impl Card {
    pub fn kind(&self) -> CardKind {
        match self.terms {
            CardTerms::Debit(_) => CardKind::Debit,
            CardTerms::Credit(_) => CardKind::Credit,
        }
    }

    pub fn masked_number(&self) -> String {
        mask_card_number(&self.number)
    }

    /// Caller-facing view without secrets
    pub fn view(&self) -> CardView {
        CardView {
            id: self.id,
            account: self.account,
            number: self.masked_number(),
            holder: self.holder.clone(),
            expires: self.expires_on.format("%m/%y").to_string(),
            status: self.status,
            kind: self.kind(),
        }
    }
}

/// Mask all but the last four digits of a card number
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("**** **** **** {}", tail)
}

/// Card data safe to hand to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub id: CardId,
    pub account: AccountId,
    pub number: String,
    pub holder: String,
    pub expires: String,
    pub status: CardStatus,
    pub kind: CardKind,
}

/// Result of card issuance
///
/// The full number and the verification code are only revealed here.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCard {
    pub card: CardView,
    pub number: String,
    pub verification_code: String,
}
