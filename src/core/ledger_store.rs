//! Ledger store: keyed state of persons, accounts, cards and withdrawal codes
//!
//! # Design
//!
//! Each entity lives behind its own `Arc<Mutex<_>>` inside a `DashMap`. The map
//! shard lock is only held long enough to clone the `Arc`; the entity mutex is
//! the critical section of a read-validate-write sequence. Mutations work on a
//! copy that replaces the locked value only when the whole sequence succeeds,
//! so a failure anywhere leaves the entity untouched.
//!
//! # Lock order
//!
//! Withdrawal code, then card, then accounts in ascending id. No operation
//! holds more than two account locks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

use crate::types::{
    Account, AccountId, BankError, BankResult, Card, CardId, Person, PersonId, PersonProfile,
    WithdrawalCode,
};

/// Lock a mutex, recovering the value if a holder panicked
///
/// Mutations never leave a half-written value behind (they swap in a
/// finished copy), so a poisoned lock still guards consistent data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Concurrent uniqueness constraint over string keys
#[derive(Debug)]
pub struct UniqueIndex<V> {
    entries: DashMap<String, V>,
}

impl<V: Copy> UniqueIndex<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Reserve `key` for `value`; `false` if the key is already taken
    pub fn claim(&self, key: &str, value: V) -> bool {
        let mut inserted = false;
        self.entries.entry(key.to_string()).or_insert_with(|| {
            inserted = true;
            value
        });
        inserted
    }

    /// Undo a claim whose owner was never committed
    pub fn release(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    /// Unconditional insert, used when rebuilding from the journal
    pub fn set(&self, key: &str, value: V) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Copy> Default for UniqueIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Key of a person uniqueness constraint (email, national id, tax id)
pub fn person_key(field: &str, value: &str) -> String {
    format!("{}:{}", field, value.trim().to_lowercase())
}

#[derive(Debug, Default)]
pub struct LedgerStore {
    persons: DashMap<PersonId, Arc<Mutex<Person>>>,
    person_keys: UniqueIndex<PersonId>,
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
    account_numbers: UniqueIndex<AccountId>,
    cards: DashMap<CardId, Arc<Mutex<Card>>>,
    card_numbers: UniqueIndex<CardId>,
    codes: DashMap<String, Arc<Mutex<WithdrawalCode>>>,
    /// Every code ever issued, including codes still being issued
    code_index: UniqueIndex<AccountId>,
    next_person: AtomicU64,
    next_account: AtomicU64,
    next_card: AtomicU64,
}

fn bump(counter: &AtomicU64, id: u64) {
    counter.fetch_max(id, Ordering::SeqCst);
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- identifiers and indexes ----

    pub fn next_person_id(&self) -> PersonId {
        self.next_person.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn next_account_id(&self) -> AccountId {
        self.next_account.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn next_card_id(&self) -> CardId {
        self.next_card.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn person_keys(&self) -> &UniqueIndex<PersonId> {
        &self.person_keys
    }

    pub fn account_numbers(&self) -> &UniqueIndex<AccountId> {
        &self.account_numbers
    }

    pub fn card_numbers(&self) -> &UniqueIndex<CardId> {
        &self.card_numbers
    }

    pub fn code_index(&self) -> &UniqueIndex<AccountId> {
        &self.code_index
    }

    // ---- persons ----

    /// Publish a committed person, indexing its unique keys
    pub fn put_person(&self, person: Person) {
        bump(&self.next_person, person.id);
        self.person_keys
            .set(&person_key("email", &person.contact.email), person.id);
        match &person.profile {
            PersonProfile::Natural(p) => self
                .person_keys
                .set(&person_key("national_id", &p.national_id), person.id),
            PersonProfile::Juridical(p) => self
                .person_keys
                .set(&person_key("tax_id", &p.tax_id), person.id),
        }
        self.persons.insert(person.id, Arc::new(Mutex::new(person)));
    }

    pub fn person_handle(&self, id: PersonId) -> BankResult<Arc<Mutex<Person>>> {
        self.persons
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BankError::not_found("Person", id))
    }

    /// Snapshot of a person
    pub fn person(&self, id: PersonId) -> BankResult<Person> {
        let handle = self.person_handle(id)?;
        let person = lock(&handle).clone();
        Ok(person)
    }

    /// Person owning a unique key
    pub fn find_person(&self, field: &str, value: &str) -> Option<PersonId> {
        self.person_keys.get(&person_key(field, value))
    }

    // ---- accounts ----

    /// Publish a committed account (new or rebuilt from the journal)
    pub fn put_account(&self, account: Account) {
        bump(&self.next_account, account.id);
        self.account_numbers.set(&account.number, account.id);
        let existing = self.accounts.get(&account.id).map(|e| Arc::clone(e.value()));
        match existing {
            Some(handle) => {
                *lock(&handle) = account;
            }
            None => {
                self.accounts
                    .insert(account.id, Arc::new(Mutex::new(account)));
            }
        }
    }

    pub fn account_handle(&self, id: AccountId) -> BankResult<Arc<Mutex<Account>>> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BankError::not_found("Account", id))
    }

    /// Latest committed state of an account
    pub fn account(&self, id: AccountId) -> BankResult<Account> {
        let handle = self.account_handle(id)?;
        let account = lock(&handle).clone();
        Ok(account)
    }

    pub fn account_by_number(&self, number: &str) -> BankResult<Account> {
        let id = self
            .account_numbers
            .get(number.trim())
            .ok_or_else(|| BankError::not_found("Account", number))?;
        self.account(id)
    }

    /// Snapshot of every account, ordered by id
    pub fn accounts(&self) -> Vec<Account> {
        let handles: Vec<Arc<Mutex<Account>>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut accounts: Vec<Account> = handles.iter().map(|h| lock(h).clone()).collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }

    /// Run `f` on an account under its exclusive lock
    ///
    /// `f` works on a copy. The copy replaces the stored account only when `f`
    /// returns `Ok`; on `Err` the account is left exactly as it was.
    pub fn with_lock<T>(
        &self,
        id: AccountId,
        f: impl FnOnce(&mut Account) -> BankResult<T>,
    ) -> BankResult<T> {
        let handle = self.account_handle(id)?;
        let mut guard = lock(&handle);
        let mut working = guard.clone();
        let value = f(&mut working)?;
        *guard = working;
        Ok(value)
    }

    /// Run `f` on two distinct accounts under both locks
    ///
    /// Locks are taken in ascending id order whatever the argument order, and
    /// `f` receives the accounts in argument order. Same all-or-nothing rule as
    /// [`LedgerStore::with_lock`].
    pub fn with_locks<T>(
        &self,
        first: AccountId,
        second: AccountId,
        f: impl FnOnce(&mut Account, &mut Account) -> BankResult<T>,
    ) -> BankResult<T> {
        if first == second {
            return Err(BankError::validation(
                "account",
                format!("source and destination are the same account {}", first),
            ));
        }
        let first_handle = self.account_handle(first)?;
        let second_handle = self.account_handle(second)?;

        let (low, high) = if first < second {
            (&first_handle, &second_handle)
        } else {
            (&second_handle, &first_handle)
        };
        let mut low_guard = lock(low);
        let mut high_guard = lock(high);
        let (first_guard, second_guard) = if first < second {
            (&mut low_guard, &mut high_guard)
        } else {
            (&mut high_guard, &mut low_guard)
        };

        let mut first_working = (**first_guard).clone();
        let mut second_working = (**second_guard).clone();
        let value = f(&mut first_working, &mut second_working)?;
        **first_guard = first_working;
        **second_guard = second_working;
        Ok(value)
    }

    // ---- cards ----

    pub fn put_card(&self, card: Card) {
        bump(&self.next_card, card.id);
        self.card_numbers.set(&card.number, card.id);
        let existing = self.cards.get(&card.id).map(|e| Arc::clone(e.value()));
        match existing {
            Some(handle) => {
                *lock(&handle) = card;
            }
            None => {
                self.cards.insert(card.id, Arc::new(Mutex::new(card)));
            }
        }
    }

    pub fn card_handle(&self, id: CardId) -> BankResult<Arc<Mutex<Card>>> {
        self.cards
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BankError::not_found("Card", id))
    }

    /// Handle of the card with this number, if any
    pub fn card_handle_by_number(&self, number: &str) -> Option<Arc<Mutex<Card>>> {
        let id = self.card_numbers.get(number.trim())?;
        self.cards.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn card(&self, id: CardId) -> BankResult<Card> {
        let handle = self.card_handle(id)?;
        let card = lock(&handle).clone();
        Ok(card)
    }

    /// Snapshot of every card, ordered by id
    pub fn cards(&self) -> Vec<Card> {
        let handles: Vec<Arc<Mutex<Card>>> = self
            .cards
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut cards: Vec<Card> = handles.iter().map(|h| lock(h).clone()).collect();
        cards.sort_by_key(|card| card.id);
        cards
    }

    // ---- withdrawal codes ----

    pub fn put_code(&self, code: WithdrawalCode) {
        self.code_index.set(&code.code, code.account);
        let existing = self.codes.get(&code.code).map(|e| Arc::clone(e.value()));
        match existing {
            Some(handle) => {
                *lock(&handle) = code;
            }
            None => {
                self.codes
                    .insert(code.code.clone(), Arc::new(Mutex::new(code)));
            }
        }
    }

    pub fn code_handle(&self, code: &str) -> Option<Arc<Mutex<WithdrawalCode>>> {
        self.codes
            .get(code.trim())
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn code(&self, code: &str) -> BankResult<WithdrawalCode> {
        let handle = self
            .code_handle(code)
            .ok_or_else(|| BankError::not_found("Withdrawal code", code))?;
        let code = lock(&handle).clone();
        Ok(code)
    }

    /// Snapshot of the codes of one account, newest first
    pub fn codes_of(&self, account: AccountId) -> Vec<WithdrawalCode> {
        let handles: Vec<Arc<Mutex<WithdrawalCode>>> = self
            .codes
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut codes: Vec<WithdrawalCode> = handles
            .iter()
            .map(|h| lock(h).clone())
            .filter(|code| code.account == account)
            .collect();
        codes.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        codes
    }
}
