//! Library facade
//!
//! [`Bank`] wires every component of the engine over one account journal, one
//! payment journal and one clock. It is `Send + Sync`; share it through an
//! `Arc` across worker threads.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::EngineConfig;
use crate::core::journal::{read_events, LedgerEvent};
use crate::core::{
    AccountRegistry, BalanceEngine, CardAuthenticator, Clock, FileJournal, Journal, Ledger,
    MemoryJournal, PersonRegistry, SystemClock, WithdrawalCodeManager,
};
use crate::settlement::{BillPayments, Catalog, PaymentEvent};
use crate::types::{Account, BankError, BankResult};

/// Journal of the account engine inside a data directory
pub const LEDGER_JOURNAL: &str = "ledger.jsonl";

/// Journal of the settlement engine inside a data directory
pub const PAYMENTS_JOURNAL: &str = "payments.jsonl";

#[derive(Debug)]
pub struct Bank {
    ledger: Arc<Ledger>,
    persons: PersonRegistry,
    accounts: AccountRegistry,
    engine: BalanceEngine,
    cards: CardAuthenticator,
    codes: WithdrawalCodeManager,
    payments: BillPayments,
}

impl Bank {
    /// Assemble a bank from explicit journals and clock
    pub fn with_parts(
        config: EngineConfig,
        ledger_journal: Arc<dyn Journal<LedgerEvent>>,
        payment_journal: Arc<dyn Journal<PaymentEvent>>,
        clock: Arc<dyn Clock>,
    ) -> BankResult<Self> {
        let config = config.validated();
        let payments = BillPayments::new(
            config.clone(),
            Catalog::default(),
            payment_journal,
            Arc::clone(&clock),
        );
        let ledger = Arc::new(Ledger::new(config, ledger_journal, clock)?);
        Ok(Self {
            persons: PersonRegistry::new(Arc::clone(&ledger)),
            accounts: AccountRegistry::new(Arc::clone(&ledger)),
            engine: BalanceEngine::new(Arc::clone(&ledger)),
            cards: CardAuthenticator::new(Arc::clone(&ledger)),
            codes: WithdrawalCodeManager::new(Arc::clone(&ledger)),
            payments,
            ledger,
        })
    }

    /// Bank whose state lives only as long as the process
    pub fn in_memory(config: EngineConfig) -> BankResult<Self> {
        Self::with_parts(
            config,
            Arc::new(MemoryJournal::new()),
            Arc::new(MemoryJournal::new()),
            Arc::new(SystemClock),
        )
    }

    /// Open the bank stored in `data_dir`, creating the directory if needed
    ///
    /// Both journals are replayed before the bank accepts new work; new
    /// events are appended to the same files.
    pub fn open(data_dir: impl AsRef<Path>, config: EngineConfig) -> BankResult<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).map_err(|e| {
            BankError::storage(format!(
                "failed to create data directory {}: {}",
                data_dir.display(),
                e
            ))
        })?;

        let ledger_path = data_dir.join(LEDGER_JOURNAL);
        let payments_path = data_dir.join(PAYMENTS_JOURNAL);
        let ledger_events: Vec<LedgerEvent> = read_events(&ledger_path)?;
        let payment_events: Vec<PaymentEvent> = read_events(&payments_path)?;

        let sync = config.journal_sync;
        let bank = Self::with_parts(
            config,
            Arc::new(FileJournal::open(&ledger_path, sync)?),
            Arc::new(FileJournal::open(&payments_path, sync)?),
            Arc::new(SystemClock),
        )?;
        bank.ledger.restore(ledger_events);
        bank.payments.restore(payment_events);
        info!(data_dir = %data_dir.display(), "bank opened");
        Ok(bank)
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn persons(&self) -> &PersonRegistry {
        &self.persons
    }

    pub fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    pub fn engine(&self) -> &BalanceEngine {
        &self.engine
    }

    pub fn cards(&self) -> &CardAuthenticator {
        &self.cards
    }

    pub fn codes(&self) -> &WithdrawalCodeManager {
        &self.codes
    }

    pub fn payments(&self) -> &BillPayments {
        &self.payments
    }

    /// Every account, ordered by id
    pub fn all_accounts(&self) -> Vec<Account> {
        self.ledger.store().accounts()
    }
}
