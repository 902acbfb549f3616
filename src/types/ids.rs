//! Identifier types
//!
//! Internal identifiers are sequential and assigned by the stores. Numbers
//! visible to customers (account numbers, card numbers, withdrawal codes,
//! references and receipts) are random strings generated against uniqueness
//! indexes.

/// Person identifier
pub type PersonId = u64;

/// Account identifier (also the canonical lock order for multi-account operations)
pub type AccountId = u64;

/// Card identifier
pub type CardId = u64;

/// Transaction identifier
pub type TransactionId = u64;

/// Bill payment identifier
pub type PaymentId = u64;

/// ATM / teller terminal identifier
pub type TerminalId = u32;
