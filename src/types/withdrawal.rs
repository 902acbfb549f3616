//! Cardless withdrawal codes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, TerminalId};

/// Lifecycle of a withdrawal code
///
/// `Pending` moves to exactly one of the other states; those are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeState {
    Pending,
    Used,
    Expired,
    Cancelled,
}

impl CodeState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CodeState::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalCode {
    /// Fixed-length numeric code, unique across all codes ever issued
    pub code: String,
    pub account: AccountId,
    pub amount: Decimal,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: CodeState,
    pub used_at: Option<DateTime<Utc>>,
    pub terminal: Option<TerminalId>,
}

impl WithdrawalCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Minutes the code stays valid after generation
    pub fn validity_minutes(&self) -> i64 {
        (self.expires_at - self.generated_at).num_minutes()
    }
}
