//! Command dispatch
//!
//! Every command opens the bank from the data directory, performs one
//! operation and prints the result as pretty JSON. `replay` prints the
//! final balances as CSV instead.

use std::io::Write;

use serde::Serialize;
use serde_json::json;

use super::args::{
    AccountCommand, CardCommand, CliArgs, CodeCommand, Command, ContactArgs, JuridicalArgs,
    NaturalArgs, PayCommand, PersonCommand, ReplayArgs, StrategyType, TransactionArgs,
};
use crate::bank::Bank;
use crate::config::EngineConfig;
use crate::core::{DebitLimits, Opening};
use crate::io::read_account_seeds;
use crate::strategy::{create_strategy, seed_accounts};
use crate::types::{
    Actor, BankError, BankResult, CheckingTerms, Contact, JuridicalProfile, NaturalProfile, PaymentFilter,
    SavingsTerms, SettleRequest, TransactionFilter,
};

fn emit<T: Serialize>(output: &mut dyn Write, value: &T) -> BankResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    writeln!(output, "{}", text)?;
    Ok(())
}

fn contact(args: ContactArgs) -> (Contact, Option<String>) {
    let contact = Contact {
        phone: args.phone,
        email: args.email,
        net_worth: args.net_worth,
    };
    (contact, args.password)
}

/// Run one parsed command
///
/// # Errors
///
/// Any error of the underlying operation, plus `Storage` when the data
/// directory, the configuration or the output cannot be used
pub fn run(args: CliArgs, output: &mut dyn Write) -> BankResult<()> {
    let config = EngineConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Replay(replay_args) => {
            let bank = if replay_args.ephemeral {
                Bank::in_memory(config)?
            } else {
                Bank::open(&args.data_dir, config)?
            };
            replay(&bank, &replay_args, output)
        }
        command => {
            let bank = Bank::open(&args.data_dir, config)?;
            dispatch(&bank, command, output)
        }
    }
}

fn dispatch(bank: &Bank, command: Command, output: &mut dyn Write) -> BankResult<()> {
    match command {
        Command::Person(command) => person(bank, command, output),
        Command::Account(command) => account(bank, command, output),
        Command::Deposit { account, amount } => {
            emit(output, &bank.engine().deposit(account, amount)?)
        }
        Command::Withdraw { account, amount } => {
            emit(output, &bank.engine().withdraw(account, amount, Actor::Teller)?)
        }
        Command::Transfer {
            from,
            to,
            amount,
            description,
        } => emit(
            output,
            &bank.engine().transfer(from, to, amount, &description)?,
        ),
        Command::Card(command) => card(bank, command, output),
        Command::Code(command) => code(bank, command, output),
        Command::Transactions(filter) => transactions(bank, filter, output),
        Command::Pay(command) => pay(bank, command, output),
        Command::Catalog { category, provider } => {
            let payments = bank.payments();
            emit(
                output,
                &json!({
                    "categories": payments.categories(),
                    "providers": payments.providers(category.as_deref()),
                    "services": payments.services(provider.as_deref()),
                }),
            )
        }
        Command::Replay(args) => replay(bank, &args, output),
    }
}

fn replay(bank: &Bank, args: &ReplayArgs, output: &mut dyn Write) -> BankResult<()> {
    if let Some(path) = &args.accounts {
        let seeds = read_account_seeds(path)?;
        seed_accounts(bank, &seeds)?;
    }

    let batch_config = match args.strategy {
        StrategyType::Async => Some(args.to_batch_config()),
        StrategyType::Sync => None,
    };
    let strategy = create_strategy(args.strategy, batch_config);
    strategy.process(bank, &args.input_file, output)
}

fn natural(bank: &Bank, args: NaturalArgs, output: &mut dyn Write) -> BankResult<()> {
    let profile = NaturalProfile {
        national_id: args.national_id,
        first_name: args.first_name,
        last_name: args.last_name,
        birth_date: args.birth_date,
        gender: args.gender,
        marital_status: args.marital_status,
        occupation: args.occupation,
        nationality: args.nationality,
        address: args.address,
    };
    let (contact, password) = contact(args.contact);
    let person = bank
        .persons()
        .register_natural(profile, contact, password.as_deref())?;
    emit(output, &person)
}

fn juridical(bank: &Bank, args: JuridicalArgs, output: &mut dyn Write) -> BankResult<()> {
    let profile = JuridicalProfile {
        tax_id: args.tax_id,
        legal_name: args.legal_name,
        trade_name: args.trade_name,
        incorporated_on: args.incorporated_on,
        company_type: args.company_type,
        legal_representative: args.legal_representative,
        address: args.address,
    };
    let (contact, password) = contact(args.contact);
    let person = bank
        .persons()
        .register_juridical(profile, contact, password.as_deref())?;
    emit(output, &person)
}

fn person(bank: &Bank, command: PersonCommand, output: &mut dyn Write) -> BankResult<()> {
    match command {
        PersonCommand::RegisterNatural(args) => natural(bank, args, output),
        PersonCommand::RegisterJuridical(args) => juridical(bank, args, output),
        PersonCommand::Show { person } => emit(output, &bank.persons().get(person)?),
        PersonCommand::Deactivate { person } => {
            emit(output, &bank.persons().deactivate(person)?)
        }
    }
}

fn account(bank: &Bank, command: AccountCommand, output: &mut dyn Write) -> BankResult<()> {
    let accounts = bank.accounts();
    match command {
        AccountCommand::OpenSavings {
            opening,
            minimum_balance,
        } => {
            let terms = SavingsTerms {
                minimum_balance,
                ..SavingsTerms::default()
            };
            let owner = opening.owner;
            let opening = Opening {
                initial_deposit: opening.deposit,
                daily_limit: opening.daily_limit,
                monthly_fee: opening.monthly_fee,
            };
            emit(output, &accounts.open_savings(owner, opening, terms)?)
        }
        AccountCommand::OpenChecking { opening, overdraft } => {
            let terms = CheckingTerms {
                authorized_overdraft: overdraft,
                ..CheckingTerms::default()
            };
            let owner = opening.owner;
            let opening = Opening {
                initial_deposit: opening.deposit,
                daily_limit: opening.daily_limit,
                monthly_fee: opening.monthly_fee,
            };
            emit(output, &accounts.open_checking(owner, opening, terms)?)
        }
        AccountCommand::Show { account, number } => {
            let found = match (account, number) {
                (_, Some(number)) => accounts.by_number(&number)?,
                (Some(id), None) => accounts.get(id)?,
                (None, None) => {
                    return Err(BankError::validation("account", "an id or a number is required"))
                }
            };
            emit(output, &found)
        }
        AccountCommand::Balance { account } => {
            let balance = bank.engine().query_balance(account)?;
            emit(output, &json!({ "account": account, "balance": balance }))
        }
        AccountCommand::List {
            owner,
            active_only,
            kind,
        } => emit(output, &accounts.list(owner, active_only, kind.map(Into::into))),
        AccountCommand::Close { account } => emit(output, &accounts.close(account)?),
    }
}

fn card(bank: &Bank, command: CardCommand, output: &mut dyn Write) -> BankResult<()> {
    let cards = bank.cards();
    match command {
        CardCommand::IssueDebit {
            account,
            holder,
            pin,
            withdrawal_limit,
            purchase_limit,
        } => {
            let limits = withdrawal_limit
                .zip(purchase_limit)
                .map(|(withdrawal, purchase)| DebitLimits {
                    withdrawal,
                    purchase,
                });
            emit(output, &cards.issue_debit(account, &holder, &pin, limits)?)
        }
        CardCommand::IssueCredit {
            account,
            holder,
            pin,
            credit_line,
        } => emit(
            output,
            &cards.issue_credit(account, &holder, &pin, credit_line)?,
        ),
        CardCommand::List { account, kind } => {
            emit(output, &cards.list(account, kind.map(Into::into)))
        }
        CardCommand::Block { card } => emit(output, &cards.block(card)?),
        CardCommand::ChangePin {
            number,
            current,
            new_pin,
        } => {
            cards.change_pin(&number, &current, &new_pin)?;
            emit(output, &json!({ "pin_changed": true }))
        }
        CardCommand::Withdraw {
            number,
            pin,
            amount,
            terminal,
        } => emit(output, &cards.withdraw(&number, &pin, amount, terminal)?),
    }
}

fn code(bank: &Bank, command: CodeCommand, output: &mut dyn Write) -> BankResult<()> {
    let codes = bank.codes();
    match command {
        CodeCommand::Issue { account, amount } => emit(output, &codes.issue(account, amount)?),
        CodeCommand::Redeem { code, terminal } => emit(output, &codes.redeem(&code, terminal)?),
        CodeCommand::Cancel { code } => emit(output, &codes.cancel(&code)?),
        CodeCommand::List { account } => emit(output, &codes.list(account)),
    }
}

fn transactions(bank: &Bank, args: TransactionArgs, output: &mut dyn Write) -> BankResult<()> {
    let engine = bank.engine();
    if let Some(reference) = args.reference {
        return emit(output, &engine.transaction_by_reference(&reference)?);
    }
    let filter = TransactionFilter {
        account: args.account,
        tx_type: args.tx_type,
        from: args.from,
        to: args.to,
        limit: args.limit,
    };
    emit(output, &engine.list_transactions(&filter))
}

fn pay(bank: &Bank, command: PayCommand, output: &mut dyn Write) -> BankResult<()> {
    let payments = bank.payments();
    match command {
        PayCommand::Settle {
            service,
            reference,
            amount,
            detail,
            account,
            transaction_reference,
            idempotency_key,
        } => {
            let request = SettleRequest {
                service,
                reference,
                amount,
                detail,
                account,
                transaction_reference,
                idempotency_key,
            };
            emit(output, &payments.settle(request)?)
        }
        PayCommand::Show { receipt, id } => {
            let payment = match (receipt, id) {
                (_, Some(id)) => payments.get_payment(id)?,
                (Some(receipt), None) => payments.get_by_receipt(&receipt)?,
                (None, None) => {
                    return Err(BankError::validation("receipt", "a receipt or an id is required"))
                }
            };
            emit(output, &payment)
        }
        PayCommand::List {
            reference,
            account,
            from,
            to,
            limit,
        } => {
            let filter = PaymentFilter {
                reference,
                account,
                from,
                to,
                limit,
            };
            emit(output, &payments.list_payments(&filter))
        }
        PayCommand::Reverse { receipt } => emit(output, &payments.reverse(&receipt)?),
    }
}
