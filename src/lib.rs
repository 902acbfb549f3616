//! Rust Banking Engine Library
//! # Overview
//!
//! This library implements a retail banking core: customers, savings and
//! checking accounts, a ledger of monetary transactions, debit and credit
//! cards, cardless withdrawal codes and bill payments, with every change
//! journaled before it becomes visible.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Transaction, Card, Payment, etc.)
//! - [`config`] - Engine configuration with per-field defaults
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Deposits, withdrawals, transfers and balance queries
//!   - [`core::accounts`] / [`core::persons`] - Account and customer lifecycle
//!   - [`core::cards`] - Card issuance, PIN checks and card withdrawals
//!   - [`core::withdrawal_codes`] - Cardless withdrawal codes
//!   - [`core::ledger`] - Journal-before-publish commit path
//! - [`settlement`] - Bill-payment catalog and settlement
//! - [`bank`] - Wires the components around one ledger and its journals
//! - [`io`] / [`strategy`] - Replay of teller operations from CSV files
//! - [`cli`] - CLI arguments parsing and command dispatch
//!
//! # Concurrency
//!
//! Every account, card and code sits behind its own lock. Operations on
//! distinct accounts proceed in parallel; a transfer locks both accounts in
//! ascending id order.
//!
//! # Durability
//!
//! A change is appended to the journal first and published in memory only
//! once the append succeeded. Opening a bank replays its journals.

// Module declarations
pub mod bank;
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod settlement;
pub mod strategy;
pub mod types;

pub use bank::Bank;
pub use config::EngineConfig;
pub use core::{AccountRegistry, BalanceEngine, CardAuthenticator, WithdrawalCodeManager};
pub use io::write_accounts_csv;
pub use settlement::BillPayments;
pub use types::{
    Account, AccountId, BankError, BankResult, Payment, Transaction, TransactionType,
    WithdrawalCode,
};
