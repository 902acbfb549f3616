//! Fixtures shared by the unit tests of the core

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use super::clock::ManualClock;
use super::journal::{LedgerEvent, MemoryJournal};
use super::ledger::Ledger;
use crate::config::EngineConfig;
use crate::types::{
    Account, AccountId, AccountStatus, AccountTerms, CheckingTerms, Contact, DailyUsage,
    NaturalProfile, Person, PersonId, PersonProfile, SavingsTerms,
};

pub fn test_config() -> EngineConfig {
    EngineConfig {
        secret_memory_kib: 64,
        secret_iterations: 1,
        ..EngineConfig::default()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap()
}

pub struct Fixture {
    pub ledger: Arc<Ledger>,
    pub journal: Arc<MemoryJournal<LedgerEvent>>,
    pub clock: Arc<ManualClock>,
}

pub fn fixture() -> Fixture {
    fixture_with(test_config())
}

/// Fixture over `config` exactly as given, without validation
pub fn fixture_with(config: EngineConfig) -> Fixture {
    let journal = Arc::new(MemoryJournal::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let ledger = Ledger::new(config, journal.clone(), clock.clone()).unwrap();
    Fixture {
        ledger: Arc::new(ledger),
        journal,
        clock,
    }
}

pub fn person(id: PersonId) -> Person {
    Person {
        id,
        contact: Contact {
            phone: "0999999999".to_string(),
            email: format!("person{}@example.com", id),
            net_worth: Decimal::ZERO,
        },
        password_hash: None,
        registered_at: start_time(),
        active: true,
        profile: PersonProfile::Natural(NaturalProfile {
            national_id: format!("17{:08}", id),
            first_name: "Ana".to_string(),
            last_name: "Perez".to_string(),
            birth_date: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            gender: None,
            marital_status: None,
            occupation: None,
            nationality: "Ecuatoriana".to_string(),
            address: None,
        }),
    }
}

fn account(id: AccountId, owner: PersonId, balance: Decimal, terms: AccountTerms) -> Account {
    Account {
        id,
        owner,
        number: format!("22{:08}", id),
        status: AccountStatus::Active,
        balance,
        monthly_fee: Decimal::ZERO,
        daily_limit: Decimal::new(500000, 2),
        daily_debits: DailyUsage::default(),
        created_at: start_time(),
        updated_at: start_time(),
        terms,
    }
}

/// Put an active savings account owned by person 1 straight into the store
pub fn put_savings(ledger: &Ledger, id: AccountId, balance: Decimal) -> Account {
    let account = account(id, 1, balance, AccountTerms::Savings(SavingsTerms::default()));
    ledger.store().put_account(account.clone());
    account
}

pub fn put_checking(ledger: &Ledger, id: AccountId, balance: Decimal, overdraft: Decimal) -> Account {
    let terms = CheckingTerms {
        authorized_overdraft: overdraft,
        ..CheckingTerms::default()
    };
    let account = account(id, 1, balance, AccountTerms::Checking(terms));
    ledger.store().put_account(account.clone());
    account
}

pub fn dec(text: &str) -> Decimal {
    text.parse().unwrap()
}
