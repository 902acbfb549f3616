//! Account-related types for the banking engine
//!
//! An [`Account`] is a common record plus a kind-specific extension
//! ([`AccountTerms`]) selected by an enum rather than by separate tables.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, PersonId};

/// Account product type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    Savings,
    Checking,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Savings => "SAVINGS",
            AccountKind::Checking => "CHECKING",
        }
    }
}

/// Account lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Closed => "CLOSED",
        }
    }
}

/// Savings-specific terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsTerms {
    /// Savings plan name (BASICA by default)
    pub plan: String,
    /// Yearly interest rate as a fraction (0.0100 = 1%)
    pub interest_rate: Decimal,
    /// Balance that must remain in the account after any debit
    pub minimum_balance: Decimal,
    pub maintenance_fee: Decimal,
}

impl Default for SavingsTerms {
    fn default() -> Self {
        Self {
            plan: "BASICA".to_string(),
            interest_rate: Decimal::new(100, 4),
            minimum_balance: Decimal::ZERO,
            maintenance_fee: Decimal::ZERO,
        }
    }
}

/// Checking-specific terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckingTerms {
    /// How far below zero the balance may go
    pub authorized_overdraft: Decimal,
    pub check_limit: u32,
    pub checkbook_cost: Decimal,
}

impl Default for CheckingTerms {
    fn default() -> Self {
        Self {
            authorized_overdraft: Decimal::ZERO,
            check_limit: 50,
            checkbook_cost: Decimal::new(1500, 2),
        }
    }
}

/// Kind-specific extension of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountTerms {
    Savings(SavingsTerms),
    Checking(CheckingTerms),
}

/// Running total of debits for one calendar day
///
/// Resets lazily: a usage recorded for an earlier day counts as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub day: Option<NaiveDate>,
    pub used: Decimal,
}

impl DailyUsage {
    /// Amount used on `day`
    pub fn used_on(&self, day: NaiveDate) -> Decimal {
        match self.day {
            Some(recorded) if recorded == day => self.used,
            _ => Decimal::ZERO,
        }
    }

    /// Add `amount` to the usage of `day` and return the new total
    ///
    /// Returns `None` and leaves the usage untouched if the total overflows.
    pub fn record(&mut self, day: NaiveDate, amount: Decimal) -> Option<Decimal> {
        let used = self.used_on(day).checked_add(amount)?;
        self.day = Some(day);
        self.used = used;
        Some(used)
    }
}

/// Bank account state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner: PersonId,
    /// Customer-visible unique account number
    pub number: String,
    pub status: AccountStatus,
    /// Current balance; only changed together with a Transaction record
    pub balance: Decimal,
    pub monthly_fee: Decimal,
    /// Maximum total of debits per calendar day
    pub daily_limit: Decimal,
    pub daily_debits: DailyUsage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub terms: AccountTerms,
}

impl Account {
    pub fn kind(&self) -> AccountKind {
        match self.terms {
            AccountTerms::Savings(_) => AccountKind::Savings,
            AccountTerms::Checking(_) => AccountKind::Checking,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Funds that a debit may consume
    ///
    /// Savings accounts keep their minimum balance; checking accounts may dip
    /// into the authorized overdraft. Saturates at the `Decimal` bounds.
    pub fn spendable(&self) -> Decimal {
        match &self.terms {
            AccountTerms::Savings(terms) => self.balance.saturating_sub(terms.minimum_balance),
            AccountTerms::Checking(terms) => {
                self.balance.saturating_add(terms.authorized_overdraft)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(terms: AccountTerms, balance: Decimal) -> Account {
        let now = Utc::now();
        Account {
            id: 1,
            owner: 1,
            number: "2200000001".to_string(),
            status: AccountStatus::Active,
            balance,
            monthly_fee: Decimal::ZERO,
            daily_limit: Decimal::new(5000, 0),
            daily_debits: DailyUsage::default(),
            created_at: now,
            updated_at: now,
            terms,
        }
    }

    #[test]
    fn test_savings_spendable_keeps_minimum_balance() {
        let terms = SavingsTerms {
            minimum_balance: Decimal::new(2000, 2),
            ..SavingsTerms::default()
        };
        let account = account(AccountTerms::Savings(terms), Decimal::new(10000, 2));

        assert_eq!(account.kind(), AccountKind::Savings);
        assert_eq!(account.spendable(), Decimal::new(8000, 2));
    }

    #[test]
    fn test_checking_spendable_includes_overdraft() {
        let terms = CheckingTerms {
            authorized_overdraft: Decimal::new(50000, 2),
            ..CheckingTerms::default()
        };
        let account = account(AccountTerms::Checking(terms), Decimal::new(10000, 2));

        assert_eq!(account.kind(), AccountKind::Checking);
        assert_eq!(account.spendable(), Decimal::new(60000, 2));
    }

    #[test]
    fn test_daily_usage_resets_on_new_day() {
        let monday = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        let mut usage = DailyUsage::default();

        assert_eq!(usage.record(monday, Decimal::new(100, 0)), Some(Decimal::new(100, 0)));
        assert_eq!(usage.record(monday, Decimal::new(50, 0)), Some(Decimal::new(150, 0)));
        assert_eq!(usage.used_on(monday), Decimal::new(150, 0));
        assert_eq!(usage.used_on(tuesday), Decimal::ZERO);

        usage.record(tuesday, Decimal::new(20, 0));
        assert_eq!(usage.used_on(tuesday), Decimal::new(20, 0));
        assert_eq!(usage.used_on(monday), Decimal::ZERO);
    }

    #[test]
    fn test_daily_usage_overflow_leaves_usage_untouched() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mut usage = DailyUsage::default();
        usage.record(day, Decimal::ONE);

        assert_eq!(usage.record(day, Decimal::MAX), None);
        assert_eq!(usage.used_on(day), Decimal::ONE);
    }

    #[test]
    fn test_spendable_saturates_at_decimal_bounds() {
        let terms = CheckingTerms {
            authorized_overdraft: Decimal::new(20000, 2),
            ..CheckingTerms::default()
        };
        let balance = Decimal::MAX - Decimal::new(100, 0);
        let account = account(AccountTerms::Checking(terms), balance);

        assert_eq!(account.spendable(), Decimal::MAX);
    }

    #[test]
    fn test_terms_serialize_with_kind_tag() {
        let json = serde_json::to_value(AccountTerms::Checking(CheckingTerms::default())).unwrap();
        assert_eq!(json["kind"], "CHECKING");
        assert_eq!(json["check_limit"], 50);
    }
}
