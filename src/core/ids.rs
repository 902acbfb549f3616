//! Generation of customer-visible numbers
//!
//! Numbers are random and checked against a uniqueness index by the caller;
//! [`generate_unique`] retries a bounded number of times and never
//! overwrites an existing entry.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::types::{BankError, BankResult};

/// `len` random decimal digits
pub fn random_digits(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Luhn check digit for a digit string
pub fn luhn_check_digit(payload: &str) -> u32 {
    let sum: u32 = payload
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    (10 - sum % 10) % 10
}

/// Whether a digit string ends with its Luhn check digit
pub fn is_luhn_valid(number: &str) -> bool {
    if number.len() < 2 || !number.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let (payload, check) = number.split_at(number.len() - 1);
    check.parse::<u32>().ok() == Some(luhn_check_digit(payload))
}

/// 16-digit card number: prefix, random body, Luhn check digit
pub fn card_number(prefix: &str) -> String {
    let body = random_digits(15usize.saturating_sub(prefix.len()));
    let payload = format!("{}{}", prefix, body);
    let check = luhn_check_digit(&payload);
    format!("{}{}", payload, check)
}

/// `PREFIX` + `YYYYMMDDHHMMSS` + `hex_len` upper-case hex characters
pub fn timestamped_reference(prefix: &str, now: DateTime<Utc>, hex_len: usize) -> String {
    let entropy = Uuid::new_v4().simple().to_string().to_uppercase();
    format!(
        "{}{}{}",
        prefix,
        now.format("%Y%m%d%H%M%S"),
        &entropy[..hex_len.min(entropy.len())]
    )
}

/// Generate candidates until `claim` accepts one
///
/// `claim` must atomically reserve the candidate and return `false` if it is
/// already taken.
pub fn generate_unique(
    what: &'static str,
    attempts: u32,
    mut generate: impl FnMut() -> String,
    mut claim: impl FnMut(&str) -> bool,
) -> BankResult<String> {
    for attempt in 1..=attempts {
        let candidate = generate();
        if claim(&candidate) {
            return Ok(candidate);
        }
        debug!(what, attempt, "generated value already taken, retrying");
    }
    Err(BankError::Exhausted { what, attempts })
}
