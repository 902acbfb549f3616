//! Processing strategy module for replays
//!
//! A replay reads teller operations from a CSV file, applies them to a
//! [`Bank`] and writes the final balances. The strategy decides how the
//! operations are read and scheduled; both strategies produce identical
//! output for the same input.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::bank::Bank;
use crate::cli::StrategyType;
use crate::core::accounts::Opening;
use crate::io::csv_format::AccountSeed;
use crate::types::{
    Account, AccountKind, BankError, BankResult, CheckingTerms, Contact, NaturalProfile,
    PersonId, SavingsTerms,
};

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Login of the person that owns accounts opened from a seed file
pub const REPLAY_OWNER_EMAIL: &str = "replay@banking-engine.local";

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the operations in `input_path` against `bank`, then write every
    /// account's final state to `output`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened
    /// - The async runtime cannot be started
    /// - Output cannot be written
    ///
    /// Malformed rows and rejected operations are logged and skipped; they
    /// never fail the replay.
    fn process(&self, bank: &Bank, input_path: &Path, output: &mut dyn Write) -> BankResult<()>;
}

/// Create a processing strategy based on the specified strategy type
///
/// `config` is only used by the async strategy; `None` means defaults.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(config.unwrap_or_default())),
    }
}

/// Tally of one replay, logged when it ends
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
}

impl ReplaySummary {
    pub fn log(&self, strategy: &'static str) {
        info!(
            strategy,
            applied = self.applied,
            rejected = self.rejected,
            "replay finished"
        );
    }
}

fn seed_amount(field: &'static str, text: Option<&str>) -> BankResult<Decimal> {
    match text.map(str::trim) {
        None | Some("") => Ok(Decimal::ZERO),
        Some(text) => text
            .parse::<Decimal>()
            .map_err(|_| BankError::validation(field, format!("'{}' is not a decimal amount", text))),
    }
}

fn replay_owner(bank: &Bank) -> BankResult<PersonId> {
    if let Some(id) = bank.persons().find(REPLAY_OWNER_EMAIL) {
        return Ok(id);
    }
    let profile = NaturalProfile {
        national_id: "9999999999".to_string(),
        first_name: "Replay".to_string(),
        last_name: "Owner".to_string(),
        birth_date: DateTime::<Utc>::UNIX_EPOCH.date_naive(),
        gender: None,
        marital_status: None,
        occupation: None,
        nationality: String::new(),
        address: None,
    };
    let contact = Contact {
        phone: "0000000000".to_string(),
        email: REPLAY_OWNER_EMAIL.to_string(),
        net_worth: Decimal::ZERO,
    };
    Ok(bank.persons().register_natural(profile, contact, None)?.id)
}

/// Open one account per seed row, in file order
///
/// Each account is owned by a dedicated replay person. An opening balance is
/// posted as a deposit; an overdraft is only allowed on checking accounts.
pub fn seed_accounts(bank: &Bank, seeds: &[AccountSeed]) -> BankResult<Vec<Account>> {
    let owner = replay_owner(bank)?;
    let mut opened = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let opening = Opening::with_deposit(seed_amount(
            "opening_balance",
            seed.opening_balance.as_deref(),
        )?);
        let overdraft = seed_amount("overdraft", seed.overdraft.as_deref())?;
        let account = match seed.account_kind()? {
            AccountKind::Savings if !overdraft.is_zero() => {
                return Err(BankError::validation(
                    "overdraft",
                    "only checking accounts have an overdraft",
                ))
            }
            AccountKind::Savings => {
                bank.accounts()
                    .open_savings(owner, opening, SavingsTerms::default())?
            }
            AccountKind::Checking => bank.accounts().open_checking(
                owner,
                opening,
                CheckingTerms {
                    authorized_overdraft: overdraft,
                    ..CheckingTerms::default()
                },
            )?,
        };
        opened.push(account);
    }
    Ok(opened)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::EngineConfig;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    pub fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn seed(kind: &str, balance: &str, overdraft: &str) -> AccountSeed {
        AccountSeed {
            kind: kind.to_string(),
            opening_balance: Some(balance.to_string()),
            overdraft: Some(overdraft.to_string()),
        }
    }

    /// Bank with accounts 1 and 2 (savings, 1000.00 and 0.00) and account 3
    /// (checking, 0.00 with 100.00 overdraft)
    pub fn seeded_bank() -> Bank {
        let config = EngineConfig {
            secret_memory_kib: 64,
            secret_iterations: 1,
            ..EngineConfig::default()
        };
        let bank = Bank::in_memory(config).unwrap();
        seed_accounts(
            &bank,
            &[
                seed("savings", "1000.00", ""),
                seed("savings", "0", ""),
                seed("checking", "", "100"),
            ],
        )
        .unwrap();
        bank
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::seeded_bank;
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn test_seed_accounts_in_order() {
        let bank = seeded_bank();
        let accounts = bank.all_accounts();

        assert_eq!(accounts.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(accounts[0].balance, Decimal::new(100000, 2));
        assert_eq!(accounts[2].spendable(), Decimal::new(100, 0));
        assert!(accounts.iter().all(|a| a.owner == accounts[0].owner));
    }

    #[test]
    fn test_seed_reuses_replay_owner() {
        let bank = seeded_bank();
        let more = seed_accounts(
            &bank,
            &[AccountSeed {
                kind: "savings".to_string(),
                opening_balance: None,
                overdraft: None,
            }],
        )
        .unwrap();
        assert_eq!(more[0].owner, bank.all_accounts()[0].owner);
    }

    #[test]
    fn test_seed_rejects_savings_overdraft() {
        let bank = seeded_bank();
        let err = seed_accounts(
            &bank,
            &[AccountSeed {
                kind: "savings".to_string(),
                opening_balance: None,
                overdraft: Some("50".to_string()),
            }],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }
}
