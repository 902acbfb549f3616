use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use crate::strategy::BatchConfig;
use crate::types::{
    AccountId, AccountKind, CardId, CardKind, PaymentId, PersonId, TerminalId, TransactionType,
};

/// Operate a bank stored in a data directory
#[derive(Parser, Debug)]
#[command(name = "banking-engine")]
#[command(about = "Accounts, cards, cardless withdrawals and bill payments", long_about = None)]
pub struct CliArgs {
    /// Directory holding the journals
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        env = "BANKING_DATA_DIR",
        default_value = "bank-data",
        global = true
    )]
    pub data_dir: PathBuf,

    /// JSON file overriding engine defaults
    #[arg(long = "config", value_name = "FILE", env = "BANKING_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register or deactivate customers
    #[command(subcommand)]
    Person(PersonCommand),

    /// Open, inspect and close accounts
    #[command(subcommand)]
    Account(AccountCommand),

    /// Teller deposit
    Deposit {
        account: AccountId,
        amount: Decimal,
    },

    /// Teller withdrawal
    Withdraw {
        account: AccountId,
        amount: Decimal,
    },

    /// Move funds between two accounts
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Issue and operate cards
    #[command(subcommand)]
    Card(CardCommand),

    /// Cardless withdrawal codes
    #[command(subcommand)]
    Code(CodeCommand),

    /// List transactions, newest first
    Transactions(TransactionArgs),

    /// Settle and inspect bill payments
    #[command(subcommand)]
    Pay(PayCommand),

    /// Show the bill-payment catalog
    Catalog {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        provider: Option<String>,
    },

    /// Replay teller operations from a CSV file and print final balances
    Replay(ReplayArgs),
}

#[derive(Subcommand, Debug)]
pub enum PersonCommand {
    RegisterNatural(NaturalArgs),
    RegisterJuridical(JuridicalArgs),
    Show { person: PersonId },
    Deactivate { person: PersonId },
}

#[derive(Args, Debug)]
pub struct ContactArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long, default_value = "0")]
    pub net_worth: Decimal,
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct NaturalArgs {
    #[arg(long)]
    pub national_id: String,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub birth_date: NaiveDate,
    #[arg(long)]
    pub gender: Option<String>,
    #[arg(long)]
    pub marital_status: Option<String>,
    #[arg(long)]
    pub occupation: Option<String>,
    #[arg(long, default_value = "")]
    pub nationality: String,
    #[arg(long)]
    pub address: Option<String>,
    #[command(flatten)]
    pub contact: ContactArgs,
}

#[derive(Args, Debug)]
pub struct JuridicalArgs {
    #[arg(long)]
    pub tax_id: String,
    #[arg(long)]
    pub legal_name: String,
    #[arg(long)]
    pub trade_name: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub incorporated_on: NaiveDate,
    #[arg(long)]
    pub company_type: String,
    #[arg(long)]
    pub legal_representative: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[command(flatten)]
    pub contact: ContactArgs,
}

#[derive(Args, Debug)]
pub struct OpeningArgs {
    #[arg(long)]
    pub owner: PersonId,
    #[arg(long, default_value = "0")]
    pub deposit: Decimal,
    #[arg(long)]
    pub daily_limit: Option<Decimal>,
    #[arg(long, default_value = "0")]
    pub monthly_fee: Decimal,
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    OpenSavings {
        #[command(flatten)]
        opening: OpeningArgs,
        #[arg(long, default_value = "0")]
        minimum_balance: Decimal,
    },
    OpenChecking {
        #[command(flatten)]
        opening: OpeningArgs,
        #[arg(long, default_value = "0")]
        overdraft: Decimal,
    },
    /// Show an account by id, or by number with --number
    Show {
        #[arg(required_unless_present = "number")]
        account: Option<AccountId>,
        #[arg(long, conflicts_with = "account")]
        number: Option<String>,
    },
    Balance { account: AccountId },
    List {
        #[arg(long)]
        owner: PersonId,
        #[arg(long)]
        active_only: bool,
        #[arg(long)]
        kind: Option<KindArg>,
    },
    Close { account: AccountId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Savings,
    Checking,
}

impl From<KindArg> for AccountKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Savings => AccountKind::Savings,
            KindArg::Checking => AccountKind::Checking,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CardKindArg {
    Debit,
    Credit,
}

impl From<CardKindArg> for CardKind {
    fn from(kind: CardKindArg) -> Self {
        match kind {
            CardKindArg::Debit => CardKind::Debit,
            CardKindArg::Credit => CardKind::Credit,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CardCommand {
    IssueDebit {
        #[arg(long)]
        account: AccountId,
        #[arg(long)]
        holder: String,
        #[arg(long)]
        pin: String,
        #[arg(long, requires = "purchase_limit")]
        withdrawal_limit: Option<Decimal>,
        #[arg(long, requires = "withdrawal_limit")]
        purchase_limit: Option<Decimal>,
    },
    IssueCredit {
        #[arg(long)]
        account: AccountId,
        #[arg(long)]
        holder: String,
        #[arg(long)]
        pin: String,
        #[arg(long)]
        credit_line: Decimal,
    },
    List {
        #[arg(long)]
        account: Option<AccountId>,
        #[arg(long)]
        kind: Option<CardKindArg>,
    },
    Block { card: CardId },
    ChangePin {
        #[arg(long)]
        number: String,
        #[arg(long)]
        current: String,
        #[arg(long = "new")]
        new_pin: String,
    },
    /// Cash withdrawal authenticated by card number and PIN
    Withdraw {
        #[arg(long)]
        number: String,
        #[arg(long)]
        pin: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        terminal: TerminalId,
    },
}

#[derive(Subcommand, Debug)]
pub enum CodeCommand {
    Issue {
        #[arg(long)]
        account: AccountId,
        #[arg(long)]
        amount: Decimal,
    },
    Redeem {
        code: String,
        #[arg(long)]
        terminal: TerminalId,
    },
    Cancel { code: String },
    List {
        #[arg(long)]
        account: AccountId,
    },
}

fn parse_transaction_type(text: &str) -> Result<TransactionType, String> {
    TransactionType::parse(text).ok_or_else(|| format!("unknown transaction type '{}'", text))
}

#[derive(Args, Debug)]
pub struct TransactionArgs {
    #[arg(long)]
    pub account: Option<AccountId>,
    #[arg(long = "type", value_parser = parse_transaction_type)]
    pub tx_type: Option<TransactionType>,
    /// RFC 3339 timestamp, inclusive
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,
    /// RFC 3339 timestamp, inclusive
    #[arg(long)]
    pub to: Option<DateTime<Utc>>,
    #[arg(long)]
    pub limit: Option<usize>,
    /// Show a single transaction by reference instead
    #[arg(long, conflicts_with_all = ["account", "tx_type", "from", "to", "limit"])]
    pub reference: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum PayCommand {
    Settle {
        #[arg(long)]
        service: String,
        #[arg(long)]
        reference: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        detail: Option<String>,
        /// Paying account, recorded on the payment
        #[arg(long)]
        account: Option<AccountId>,
        #[arg(long, requires = "account")]
        transaction_reference: Option<String>,
        /// Repeating a key returns the first payment instead of paying twice
        #[arg(long = "idempotency-key")]
        idempotency_key: Option<String>,
    },
    /// Show a payment by receipt, or by id with --id
    Show {
        #[arg(required_unless_present = "id")]
        receipt: Option<String>,
        #[arg(long, conflicts_with = "receipt")]
        id: Option<PaymentId>,
    },
    List {
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        account: Option<AccountId>,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long)]
        limit: Option<usize>,
    },
    Reverse { receipt: String },
}

/// Available replay strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// CSV of teller operations: type,account,counterparty,amount
    #[arg(value_name = "INPUT")]
    pub input_file: PathBuf,

    /// CSV of accounts to open first: kind,opening_balance,overdraft
    #[arg(long, value_name = "FILE")]
    pub accounts: Option<PathBuf>,

    /// Replay against a throwaway in-memory bank instead of the data directory
    #[arg(long)]
    pub ephemeral: bool,

    #[arg(long = "strategy", value_name = "STRATEGY", default_value = "async")]
    pub strategy: StrategyType,

    /// Operations per batch (async only)
    #[arg(long = "batch-size", value_name = "SIZE")]
    pub batch_size: Option<usize>,

    /// Worker threads (async only, default: CPU cores)
    #[arg(long = "max-concurrent", value_name = "COUNT")]
    pub max_concurrent_batches: Option<usize>,
}

impl ReplayArgs {
    /// BatchConfig from the replay options, defaults for anything unset
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn replay(args: &[&str]) -> ReplayArgs {
        let mut argv = vec!["banking-engine", "replay"];
        argv.extend_from_slice(args);
        match CliArgs::try_parse_from(argv).unwrap().command {
            Command::Replay(replay) => replay,
            other => panic!("expected replay, got {:?}", other),
        }
    }

    #[rstest]
    #[case::default_strategy(&["input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        assert_eq!(replay(args).strategy, expected);
    }

    #[rstest]
    #[case::all_defaults(&["input.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["--batch-size", "2000", "input.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["--max-concurrent", "8", "input.csv"], 1000, 8)]
    #[case::zero_batch_falls_back(&["--batch-size", "0", "input.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = replay(args).to_batch_config();
        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[test]
    fn test_replay_options() {
        let args = replay(&["--accounts", "seed.csv", "--ephemeral", "ops.csv"]);
        assert_eq!(args.accounts, Some(PathBuf::from("seed.csv")));
        assert!(args.ephemeral);
        assert_eq!(args.input_file, PathBuf::from("ops.csv"));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "banking-engine",
            "deposit",
            "3",
            "45.50",
            "--data-dir",
            "/tmp/bank",
        ])
        .unwrap();
        assert_eq!(args.data_dir, PathBuf::from("/tmp/bank"));
        match args.command {
            Command::Deposit { account, amount } => {
                assert_eq!(account, 3);
                assert_eq!(amount, Decimal::new(4550, 2));
            }
            other => panic!("expected deposit, got {:?}", other),
        }
    }

    #[rstest]
    #[case::settle(&["pay", "settle", "--service", "EEQ_LUZ", "--reference", "R1", "--amount", "45.50"])]
    #[case::settle_with_key(&["pay", "settle", "--service", "x", "--reference", "R", "--amount", "1", "--idempotency-key", "k"])]
    #[case::transactions_by_type(&["transactions", "--type", "withdrawal", "--limit", "5"])]
    #[case::account_by_number(&["account", "show", "--number", "2212345678"])]
    #[case::card_withdraw(&["card", "withdraw", "--number", "4551", "--pin", "1234", "--amount", "20", "--terminal", "7"])]
    #[case::register(&[
        "person", "register-natural", "--national-id", "1712345678", "--first-name", "Ana",
        "--last-name", "Perez", "--birth-date", "1990-01-31", "--email", "ana@example.com",
        "--phone", "0999999999",
    ])]
    fn test_subcommands_parse(#[case] args: &[&str]) {
        let mut argv = vec!["banking-engine"];
        argv.extend_from_slice(args);
        assert!(CliArgs::try_parse_from(argv).is_ok());
    }

    #[rstest]
    #[case::missing_subcommand(&["banking-engine"])]
    #[case::invalid_strategy(&["banking-engine", "replay", "--strategy", "invalid", "input.csv"])]
    #[case::missing_input(&["banking-engine", "replay"])]
    #[case::bad_amount(&["banking-engine", "deposit", "1", "ten"])]
    #[case::unknown_tx_type(&["banking-engine", "transactions", "--type", "refund"])]
    #[case::show_without_key(&["banking-engine", "account", "show"])]
    #[case::bad_birth_date(&[
        "banking-engine", "person", "register-natural", "--national-id", "1", "--first-name", "A",
        "--last-name", "B", "--birth-date", "31/01/1990", "--email", "a@b.c", "--phone", "1",
    ])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
