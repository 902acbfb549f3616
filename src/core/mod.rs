//! Core business logic module
//!
//! This module contains the account engine components:
//! - `ledger_store` - Entities behind per-entity locks, uniqueness indexes
//! - `transaction_store` - Append-only transaction history
//! - `ledger` - Shared state plus the journal-before-publish commit path
//! - `engine` - Deposits, withdrawals, transfers and balance queries
//! - `persons` / `accounts` - Customer and account lifecycle
//! - `cards` - Card issuance, PIN checks and card withdrawals
//! - `withdrawal_codes` - Cardless withdrawal codes
//! - `batch_processor` - Concurrent replay of teller operations
//! - `journal`, `clock`, `traits` - Durability and time abstractions

pub mod accounts;
pub mod batch_processor;
pub mod cards;
pub mod clock;
pub mod engine;
pub mod ids;
pub mod journal;
pub mod ledger;
pub mod ledger_store;
pub mod persons;
pub mod secrets;
pub mod traits;
pub mod transaction_store;
pub mod withdrawal_codes;

#[cfg(test)]
pub(crate) mod test_support;

pub use accounts::{AccountRegistry, Opening};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use cards::{CardAuthenticator, DebitLimits};
pub use clock::{ManualClock, SystemClock};
pub use engine::BalanceEngine;
pub use journal::{FileJournal, JournalFile, LedgerEvent, MemoryJournal};
pub use ledger::Ledger;
pub use ledger_store::LedgerStore;
pub use persons::PersonRegistry;
pub use secrets::SecretHasher;
pub use traits::{Clock, Journal};
pub use transaction_store::TransactionStore;
pub use withdrawal_codes::WithdrawalCodeManager;
