//! Error types for the banking engine
//!
//! Every operation of the core returns [`BankResult`]. Errors carry enough
//! context to build a human-readable message for the caller and expose a
//! fieldless [`ErrorKind`] so a boundary layer (HTTP, CLI) can map failures to
//! status codes without inspecting messages.
//!
//! # Error Categories
//!
//! - **Lookup errors**: missing accounts, cards, codes, services
//! - **Uniqueness errors**: duplicate emails, national ids, exhausted id generation
//! - **Money errors**: insufficient funds, daily limits, service bounds
//! - **Credential errors**: wrong PIN, wrong password, blocked cards
//! - **Storage errors**: journal I/O and decoding failures

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use super::ids::{AccountId, PersonId};

/// Result alias used across the crate
pub type BankResult<T> = Result<T, BankError>;

/// Coarse classification of a [`BankError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InsufficientFunds,
    AccountInactive,
    CardBlocked,
    InvalidCredential,
    Expired,
    OutOfBounds,
    ServiceNotFound,
    ValidationError,
    DailyLimitExceeded,
    Exhausted,
    Unauthorized,
    Storage,
    ArithmeticOverflow,
}

/// Main error type for the banking engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BankError {
    /// The referenced entity does not exist
    #[error("{entity} {key} not found")]
    NotFound {
        /// Entity name ("Account", "Card", "Withdrawal code", ...)
        entity: &'static str,
        /// Identifier that was looked up
        key: String,
    },

    /// A uniqueness constraint would be violated
    #[error("{entity} with {field} '{value}' already exists")]
    Conflict {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// The account cannot cover the requested debit
    #[error("Insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        /// Spendable funds (balance adjusted by minimum balance or overdraft)
        available: Decimal,
        requested: Decimal,
    },

    /// The account is closed (or otherwise not ACTIVE)
    #[error("Account {account} is not active")]
    AccountInactive { account: AccountId },

    /// The person has been deactivated
    #[error("Person {person} is inactive")]
    PersonInactive { person: PersonId },

    /// No card matches the presented number
    #[error("Invalid card {card}")]
    InvalidCard {
        /// Masked card number
        card: String,
    },

    /// The card is blocked or expired
    #[error("Card {card} is {reason}")]
    CardBlocked { card: String, reason: &'static str },

    /// The presented PIN does not match
    #[error("Wrong PIN for card {card}")]
    WrongPin { card: String },

    /// Login or password check failed
    #[error("Invalid credentials for {login}")]
    InvalidCredential { login: String },

    /// Withdrawal code redeemed after its expiration
    #[error("Withdrawal code {code} expired at {expired_at}")]
    Expired {
        code: String,
        expired_at: DateTime<Utc>,
    },

    /// Payment amount outside the service's configured bounds
    #[error("Amount {amount} is not allowed for service {service}: {bound}")]
    OutOfBounds {
        service: String,
        amount: Decimal,
        bound: String,
    },

    /// No active service matches the requested code
    #[error("Service {service} {reason}")]
    ServiceNotFound {
        service: String,
        reason: &'static str,
    },

    /// Malformed input rejected at the boundary of the core
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The debit would exceed an account or card daily limit
    #[error("Daily limit exceeded for {scope}: limit {limit}, used {used}, requested {requested}")]
    DailyLimitExceeded {
        scope: String,
        limit: Decimal,
        used: Decimal,
        requested: Decimal,
    },

    /// Unique identifier generation gave up
    #[error("Could not generate a unique {what} after {attempts} attempts")]
    Exhausted { what: &'static str, attempts: u32 },

    /// An authenticated customer acted on an account it does not own
    #[error("Person {person} may not operate account {account}")]
    Unauthorized { person: PersonId, account: AccountId },

    /// Journal I/O or decoding failed
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Checked decimal arithmetic failed
    #[error("Arithmetic overflow in {operation} on account {account}")]
    ArithmeticOverflow {
        operation: &'static str,
        account: AccountId,
    },
}

impl BankError {
    /// Classification used by callers to map errors to responses
    pub fn kind(&self) -> ErrorKind {
        match self {
            BankError::NotFound { .. } | BankError::InvalidCard { .. } => ErrorKind::NotFound,
            BankError::Conflict { .. } => ErrorKind::Conflict,
            BankError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            BankError::AccountInactive { .. } | BankError::PersonInactive { .. } => {
                ErrorKind::AccountInactive
            }
            BankError::CardBlocked { .. } => ErrorKind::CardBlocked,
            BankError::WrongPin { .. } | BankError::InvalidCredential { .. } => {
                ErrorKind::InvalidCredential
            }
            BankError::Expired { .. } => ErrorKind::Expired,
            BankError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            BankError::ServiceNotFound { .. } => ErrorKind::ServiceNotFound,
            BankError::Validation { .. } => ErrorKind::ValidationError,
            BankError::DailyLimitExceeded { .. } => ErrorKind::DailyLimitExceeded,
            BankError::Exhausted { .. } => ErrorKind::Exhausted,
            BankError::Unauthorized { .. } => ErrorKind::Unauthorized,
            BankError::Storage { .. } => ErrorKind::Storage,
            BankError::ArithmeticOverflow { .. } => ErrorKind::ArithmeticOverflow,
        }
    }
}

impl From<std::io::Error> for BankError {
    fn from(error: std::io::Error) -> Self {
        BankError::Storage {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for BankError {
    fn from(error: serde_json::Error) -> Self {
        BankError::Storage {
            message: format!("journal decode failed: {}", error),
        }
    }
}

impl From<csv::Error> for BankError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());
        BankError::Validation {
            field: "csv",
            message: match line {
                Some(line) => format!("line {}: {}", line, error),
                None => error.to_string(),
            },
        }
    }
}

// Helper functions for creating common errors

impl BankError {
    /// Create a NotFound error
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        BankError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        BankError::Conflict {
            entity,
            field,
            value: value.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, available: Decimal, requested: Decimal) -> Self {
        BankError::InsufficientFunds {
            account,
            available,
            requested,
        }
    }

    /// Create an AccountInactive error
    pub fn account_inactive(account: AccountId) -> Self {
        BankError::AccountInactive { account }
    }

    /// Create a Validation error
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        BankError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create an OutOfBounds error
    pub fn out_of_bounds(service: &str, amount: Decimal, bound: impl Into<String>) -> Self {
        BankError::OutOfBounds {
            service: service.to_string(),
            amount,
            bound: bound.into(),
        }
    }

    /// Create a DailyLimitExceeded error
    pub fn daily_limit_exceeded(
        scope: impl Into<String>,
        limit: Decimal,
        used: Decimal,
        requested: Decimal,
    ) -> Self {
        BankError::DailyLimitExceeded {
            scope: scope.into(),
            limit,
            used,
            requested,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &'static str, account: AccountId) -> Self {
        BankError::ArithmeticOverflow { operation, account }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        BankError::Storage {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(
        BankError::not_found("Account", 7),
        "Account 7 not found"
    )]
    #[case::conflict(
        BankError::conflict("Person", "email", "ana@example.com"),
        "Person with email 'ana@example.com' already exists"
    )]
    #[case::insufficient_funds(
        BankError::insufficient_funds(1, Decimal::new(5000, 2), Decimal::new(10000, 2)),
        "Insufficient funds in account 1: available 50.00, requested 100.00"
    )]
    #[case::account_inactive(
        BankError::account_inactive(42),
        "Account 42 is not active"
    )]
    #[case::card_blocked(
        BankError::CardBlocked { card: "**** **** **** 1234".to_string(), reason: "blocked" },
        "Card **** **** **** 1234 is blocked"
    )]
    #[case::validation(
        BankError::validation("pin", "must be 4 to 6 digits"),
        "Invalid pin: must be 4 to 6 digits"
    )]
    #[case::out_of_bounds(
        BankError::out_of_bounds("EEQ_LUZ", Decimal::new(50, 2), "minimum 1.00"),
        "Amount 0.50 is not allowed for service EEQ_LUZ: minimum 1.00"
    )]
    #[case::exhausted(
        BankError::Exhausted { what: "withdrawal code", attempts: 10 },
        "Could not generate a unique withdrawal code after 10 attempts"
    )]
    fn test_error_display(#[case] error: BankError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case(BankError::not_found("Card", 1), ErrorKind::NotFound)]
    #[case(BankError::InvalidCard { card: "x".into() }, ErrorKind::NotFound)]
    #[case(BankError::WrongPin { card: "x".into() }, ErrorKind::InvalidCredential)]
    #[case(BankError::PersonInactive { person: 3 }, ErrorKind::AccountInactive)]
    #[case(BankError::storage("disk full"), ErrorKind::Storage)]
    #[case(
        BankError::daily_limit_exceeded("account 1", Decimal::ONE, Decimal::ZERO, Decimal::TWO),
        ErrorKind::DailyLimitExceeded
    )]
    fn test_error_kind(#[case] error: BankError, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: BankError = io_error.into();
        assert_eq!(error.kind(), ErrorKind::Storage);
        assert_eq!(error.to_string(), "Storage error: Permission denied");
    }
}
