//! Engine configuration
//!
//! Every field has a default, so a configuration file only needs the values it
//! overrides. Unusable values are replaced by their defaults with a warning
//! instead of failing startup.

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::BankResult;

/// Longest accepted withdrawal code lifetime (30 days)
pub const MAX_WITHDRAWAL_CODE_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Longest accepted card validity
pub const MAX_CARD_VALIDITY_YEARS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds a withdrawal code stays redeemable
    pub withdrawal_code_ttl_secs: i64,
    /// Number of digits of a withdrawal code
    pub withdrawal_code_length: usize,
    /// Attempts made to generate a unique number/code before giving up
    pub max_generation_attempts: u32,
    pub account_number_prefix: String,
    /// Random digits appended to the account number prefix
    pub account_number_digits: usize,
    pub card_number_prefix: String,
    pub card_validity_years: u32,
    pub default_daily_limit: Decimal,
    pub debit_daily_withdrawal_limit: Decimal,
    pub debit_daily_purchase_limit: Decimal,
    pub credit_statement_day: u32,
    pub credit_payment_day: u32,
    pub credit_interest_rate: Decimal,
    /// Records returned by listings when the caller sets no limit
    pub list_limit: usize,
    /// Argon2 memory cost in KiB for PINs, passwords and verification codes
    pub secret_memory_kib: u32,
    /// Argon2 iterations
    pub secret_iterations: u32,
    /// fsync the journal files after every write, not just flush
    pub journal_sync: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            withdrawal_code_ttl_secs: 600,
            withdrawal_code_length: 6,
            max_generation_attempts: 10,
            account_number_prefix: "22".to_string(),
            account_number_digits: 8,
            card_number_prefix: "4551".to_string(),
            card_validity_years: 5,
            default_daily_limit: Decimal::new(500000, 2),
            debit_daily_withdrawal_limit: Decimal::new(50000, 2),
            debit_daily_purchase_limit: Decimal::new(200000, 2),
            credit_statement_day: 15,
            credit_payment_day: 25,
            credit_interest_rate: Decimal::new(1650, 4),
            list_limit: 50,
            secret_memory_kib: 19 * 1024,
            secret_iterations: 2,
            journal_sync: true,
        }
    }
}

fn is_digits(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_digit())
}

impl EngineConfig {
    /// Load a JSON configuration file, or the defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> BankResult<Self> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                serde_json::from_str::<EngineConfig>(&text)?
            }
            None => EngineConfig::default(),
        };
        Ok(config.validated())
    }

    /// Replace unusable values with their defaults
    pub fn validated(self) -> Self {
        let default = Self::default();
        let mut config = self;

        if !(1..=MAX_WITHDRAWAL_CODE_TTL_SECS).contains(&config.withdrawal_code_ttl_secs) {
            warn!(
                value = config.withdrawal_code_ttl_secs,
                default = default.withdrawal_code_ttl_secs,
                "invalid withdrawal_code_ttl_secs, using default"
            );
            config.withdrawal_code_ttl_secs = default.withdrawal_code_ttl_secs;
        }
        if config.withdrawal_code_length == 0 || config.withdrawal_code_length > 12 {
            warn!(
                value = config.withdrawal_code_length,
                default = default.withdrawal_code_length,
                "invalid withdrawal_code_length, using default"
            );
            config.withdrawal_code_length = default.withdrawal_code_length;
        }
        if config.max_generation_attempts == 0 {
            warn!(
                default = default.max_generation_attempts,
                "invalid max_generation_attempts (0), using default"
            );
            config.max_generation_attempts = default.max_generation_attempts;
        }
        if !is_digits(&config.account_number_prefix) || config.account_number_digits == 0 {
            warn!(
                prefix = %config.account_number_prefix,
                digits = config.account_number_digits,
                "invalid account number format, using default"
            );
            config.account_number_prefix = default.account_number_prefix.clone();
            config.account_number_digits = default.account_number_digits;
        }
        // 16-digit numbers: prefix, random body, one check digit
        if !is_digits(&config.card_number_prefix) || config.card_number_prefix.len() >= 15 {
            warn!(
                prefix = %config.card_number_prefix,
                "invalid card_number_prefix, using default"
            );
            config.card_number_prefix = default.card_number_prefix.clone();
        }
        if !(1..=MAX_CARD_VALIDITY_YEARS).contains(&config.card_validity_years) {
            warn!(
                value = config.card_validity_years,
                default = default.card_validity_years,
                "invalid card_validity_years, using default"
            );
            config.card_validity_years = default.card_validity_years;
        }
        for (name, value, fallback) in [
            (
                "default_daily_limit",
                &mut config.default_daily_limit,
                default.default_daily_limit,
            ),
            (
                "debit_daily_withdrawal_limit",
                &mut config.debit_daily_withdrawal_limit,
                default.debit_daily_withdrawal_limit,
            ),
            (
                "debit_daily_purchase_limit",
                &mut config.debit_daily_purchase_limit,
                default.debit_daily_purchase_limit,
            ),
        ] {
            if *value <= Decimal::ZERO {
                warn!(field = name, value = %value, "invalid limit, using default");
                *value = fallback;
            }
        }
        if !(1..=28).contains(&config.credit_statement_day) {
            warn!(value = config.credit_statement_day, "invalid credit_statement_day, using default");
            config.credit_statement_day = default.credit_statement_day;
        }
        if !(1..=28).contains(&config.credit_payment_day) {
            warn!(value = config.credit_payment_day, "invalid credit_payment_day, using default");
            config.credit_payment_day = default.credit_payment_day;
        }
        if config.list_limit == 0 {
            warn!("invalid list_limit (0), using default");
            config.list_limit = default.list_limit;
        }
        if config.secret_memory_kib < 8 || config.secret_iterations == 0 {
            warn!(
                memory_kib = config.secret_memory_kib,
                iterations = config.secret_iterations,
                "invalid secret hashing cost, using default"
            );
            config.secret_memory_kib = default.secret_memory_kib;
            config.secret_iterations = default.secret_iterations;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.withdrawal_code_ttl_secs, 600);
        assert_eq!(config.default_daily_limit, Decimal::new(5000, 0));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"withdrawal_code_ttl_secs": 60, "list_limit": 5}}"#).unwrap();
        file.flush().unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.withdrawal_code_ttl_secs, 60);
        assert_eq!(config.list_limit, 5);
        assert_eq!(config.card_number_prefix, "4551");
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        file.flush().unwrap();

        assert!(EngineConfig::load(Some(file.path())).is_err());
    }

    #[rstest]
    #[case::zero_ttl(EngineConfig { withdrawal_code_ttl_secs: 0, ..EngineConfig::default() })]
    #[case::huge_ttl(EngineConfig { withdrawal_code_ttl_secs: i64::MAX, ..EngineConfig::default() })]
    #[case::ttl_above_cap(EngineConfig { withdrawal_code_ttl_secs: MAX_WITHDRAWAL_CODE_TTL_SECS + 1, ..EngineConfig::default() })]
    #[case::zero_validity(EngineConfig { card_validity_years: 0, ..EngineConfig::default() })]
    #[case::huge_validity(EngineConfig { card_validity_years: u32::MAX, ..EngineConfig::default() })]
    #[case::zero_code_length(EngineConfig { withdrawal_code_length: 0, ..EngineConfig::default() })]
    #[case::zero_attempts(EngineConfig { max_generation_attempts: 0, ..EngineConfig::default() })]
    #[case::letters_in_prefix(EngineConfig { card_number_prefix: "45A1".into(), ..EngineConfig::default() })]
    #[case::negative_limit(EngineConfig { default_daily_limit: Decimal::NEGATIVE_ONE, ..EngineConfig::default() })]
    #[case::zero_list_limit(EngineConfig { list_limit: 0, ..EngineConfig::default() })]
    fn test_invalid_values_fall_back_to_defaults(#[case] config: EngineConfig) {
        assert_eq!(config.validated(), EngineConfig::default());
    }

    #[test]
    fn test_values_at_caps_are_kept() {
        let config = EngineConfig {
            withdrawal_code_ttl_secs: MAX_WITHDRAWAL_CODE_TTL_SECS,
            card_validity_years: MAX_CARD_VALIDITY_YEARS,
            ..EngineConfig::default()
        };
        assert_eq!(config.clone().validated(), config);
    }
}
