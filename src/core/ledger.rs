//! Shared state of the account engine
//!
//! [`Ledger`] bundles the entity store, the transaction history, the journal
//! and the clock. Every component of the engine holds it through an `Arc`.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info};

use super::journal::LedgerEvent;
use super::ledger_store::LedgerStore;
use super::secrets::SecretHasher;
use super::traits::{Clock, Journal};
use super::transaction_store::TransactionStore;
use crate::config::EngineConfig;
use crate::types::{
    Account, BankResult, Card, Transaction, TransactionDraft, TransactionStatus, WithdrawalCode,
};

pub struct Ledger {
    store: LedgerStore,
    transactions: TransactionStore,
    journal: Arc<dyn Journal<LedgerEvent>>,
    clock: Arc<dyn Clock>,
    hasher: SecretHasher,
    config: EngineConfig,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("store", &self.store)
            .field("transactions", &self.transactions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    pub fn new(
        config: EngineConfig,
        journal: Arc<dyn Journal<LedgerEvent>>,
        clock: Arc<dyn Clock>,
    ) -> BankResult<Self> {
        let hasher = SecretHasher::new(&config)?;
        Ok(Self {
            store: LedgerStore::new(),
            transactions: TransactionStore::new(),
            journal,
            clock,
            hasher,
            config,
        })
    }

    /// Rebuild state from journaled events, oldest first
    pub fn restore(&self, events: impl IntoIterator<Item = LedgerEvent>) {
        let mut count = 0usize;
        for event in events {
            count += 1;
            match event {
                LedgerEvent::PersonSaved { person } => self.store.put_person(person),
                LedgerEvent::AccountSaved { account } => self.store.put_account(account),
                LedgerEvent::CardSaved { card } => self.store.put_card(card),
                LedgerEvent::CodeSaved { code } => self.store.put_code(code),
                LedgerEvent::Posted {
                    accounts,
                    transaction,
                    card,
                    code,
                } => {
                    for account in accounts {
                        self.store.put_account(account);
                    }
                    if let Some(card) = card {
                        self.store.put_card(card);
                    }
                    if let Some(code) = code {
                        self.store.put_code(code);
                    }
                    self.transactions.store(transaction);
                }
            }
        }
        info!(events = count, "ledger restored from journal");
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn transactions(&self) -> &TransactionStore {
        &self.transactions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn hasher(&self) -> &SecretHasher {
        &self.hasher
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Journal an event that does not move money
    pub fn record(&self, event: &LedgerEvent) -> BankResult<()> {
        self.journal.append(event).inspect_err(|e| {
            error!(error = %e, "journal append failed");
        })
    }

    /// Commit a balance movement
    ///
    /// Must be called while holding the locks of every account in `accounts`
    /// (and of `card`/`code` when given), with their new states. On success
    /// the transaction is recorded; the caller then publishes the new states.
    /// On failure nothing is recorded.
    pub fn post(
        &self,
        now: DateTime<Utc>,
        draft: TransactionDraft,
        accounts: Vec<Account>,
        card: Option<Card>,
        code: Option<WithdrawalCode>,
    ) -> BankResult<Transaction> {
        let (id, reference) = self
            .transactions
            .reserve(now, self.config.max_generation_attempts)?;
        let transaction = Transaction {
            id,
            reference,
            tx_type: draft.tx_type,
            amount: draft.amount,
            timestamp: now,
            source: draft.source,
            destination: draft.destination,
            card: draft.card,
            terminal: draft.terminal,
            status: TransactionStatus::Completed,
            description: draft.description,
        };

        let event = LedgerEvent::Posted {
            accounts,
            transaction: transaction.clone(),
            card,
            code,
        };
        if let Err(e) = self.record(&event) {
            self.transactions.release(&transaction.reference);
            return Err(e);
        }

        self.transactions.store(transaction.clone());
        info!(
            reference = %transaction.reference,
            tx_type = ?transaction.tx_type,
            amount = %transaction.amount,
            source = ?transaction.source,
            destination = ?transaction.destination,
            "transaction committed"
        );
        Ok(transaction)
    }
}
