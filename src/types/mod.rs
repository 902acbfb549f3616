//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Accounts and their savings/checking terms
//! - `card`: Debit and credit cards
//! - `person`: Customers, caller identity
//! - `transaction`: Ledger records and replayed teller operations
//! - `withdrawal`: Cardless withdrawal codes
//! - `payment`: Bill-payment catalog and payments
//! - `error`: Error types for the banking engine

pub mod account;
pub mod card;
pub mod error;
pub mod ids;
pub mod money;
pub mod payment;
pub mod person;
pub mod transaction;
pub mod withdrawal;

pub use account::{
    Account, AccountKind, AccountStatus, AccountTerms, CheckingTerms, DailyUsage, SavingsTerms,
};
pub use card::{Card, CardKind, CardStatus, CardTerms, CardView, CreditTerms, DebitTerms, IssuedCard};
pub use error::{BankError, BankResult, ErrorKind};
pub use ids::{AccountId, CardId, PaymentId, PersonId, TerminalId, TransactionId};
pub use payment::{
    Category, Payment, PaymentFilter, PaymentStatus, Provider, Service, SettleRequest,
};
pub use person::{
    Actor, Contact, Identity, JuridicalProfile, NaturalProfile, Person, PersonProfile, PersonView,
};
pub use transaction::{
    OperationKind, TellerOperation, Transaction, TransactionDraft, TransactionFilter,
    TransactionStatus, TransactionType,
};
pub use withdrawal::{CodeState, WithdrawalCode};
