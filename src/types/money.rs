//! Monetary amount helpers
//!
//! All money is `rust_decimal::Decimal` with two fractional digits.

use rust_decimal::Decimal;

use super::error::{BankError, BankResult};

/// Number of fractional digits carried by every amount
pub const MONEY_SCALE: u32 = 2;

/// Validate a caller-supplied amount
///
/// The amount must be strictly positive and must not carry more than
/// [`MONEY_SCALE`] significant fractional digits.
pub fn validate_amount(field: &'static str, amount: Decimal) -> BankResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(BankError::validation(
            field,
            format!("amount must be positive, got {}", amount),
        ));
    }
    let rounded = amount.round_dp(MONEY_SCALE);
    if rounded != amount {
        return Err(BankError::validation(
            field,
            format!("amount {} has more than {} decimal places", amount, MONEY_SCALE),
        ));
    }
    Ok(rounded)
}

/// Parse an amount from text, then validate it
pub fn parse_amount(field: &'static str, text: &str) -> BankResult<Decimal> {
    let amount = text
        .trim()
        .parse::<Decimal>()
        .map_err(|_| BankError::validation(field, format!("'{}' is not a decimal amount", text)))?;
    validate_amount(field, amount)
}
