//! Bill-payment types
//!
//! The catalog is a three-level tree (category, provider, service) stored as
//! flat records linked by code. A [`Payment`] records one settled bill.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, PaymentId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub code: String,
    pub name: String,
    pub description: String,
    pub display_order: u32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub code: String,
    pub category: String,
    pub name: String,
    /// Whether settling requires a non-empty external reference
    pub requires_reference: bool,
    /// Human hint for the reference ("Cedula o RUC", "Placa", ...)
    pub reference_format: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub code: String,
    pub provider: String,
    pub name: String,
    /// Amount charged when the service does not accept a variable amount
    pub fixed_amount: Option<Decimal>,
    pub allows_variable_amount: bool,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    /// Flat fee added on top of the base amount
    pub fee: Decimal,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Reversed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Reversed => "REVERSED",
        }
    }
}

/// Settled bill payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    /// System-generated unique receipt number (BP...)
    pub receipt: String,
    pub service: String,
    pub service_name: String,
    pub provider: String,
    /// Caller-supplied reference (tax id, plate, contract number...)
    pub reference: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub total: Decimal,
    pub status: PaymentStatus,
    pub detail: String,
    /// Paying account in the account engine, if the caller linked one
    pub account: Option<AccountId>,
    /// Transaction reference in the account engine, if the caller linked one
    pub transaction_reference: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input of a settlement
#[derive(Debug, Clone, PartialEq)]
pub struct SettleRequest {
    pub service: String,
    pub reference: String,
    pub amount: Decimal,
    pub detail: Option<String>,
    pub account: Option<AccountId>,
    pub transaction_reference: Option<String>,
    /// Repeating a key returns the payment first settled with it
    pub idempotency_key: Option<String>,
}

impl SettleRequest {
    pub fn new(service: impl Into<String>, reference: impl Into<String>, amount: Decimal) -> Self {
        Self {
            service: service.into(),
            reference: reference.into(),
            amount,
            detail: None,
            account: None,
            transaction_reference: None,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_account(mut self, account: AccountId, transaction_reference: Option<String>) -> Self {
        self.account = Some(account);
        self.transaction_reference = transaction_reference;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Payment listing filter
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    /// Case-insensitive substring of the external reference
    pub reference: Option<String>,
    pub account: Option<AccountId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &Payment) -> bool {
        let reference_matches = self.reference.as_ref().is_none_or(|needle| {
            payment
                .reference
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        reference_matches
            && self.account.is_none_or(|account| payment.account == Some(account))
            && self.from.is_none_or(|from| payment.created_at >= from)
            && self.to.is_none_or(|to| payment.created_at <= to)
    }
}
