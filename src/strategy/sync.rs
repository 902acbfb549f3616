//! Synchronous processing strategy
//!
//! Applies operations one at a time in file order on the calling thread.
//!
//! # Design
//!
//! The SyncProcessingStrategy only orchestrates, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Balance rules to `BalanceEngine`
//! - CSV output to `csv_format::write_accounts_csv`
//!
//! Records are streamed, so memory use does not grow with the input file.

use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::bank::Bank;
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{ProcessingStrategy, ReplaySummary};
use crate::types::BankResult;

/// Synchronous processing strategy
///
/// ```no_run
/// use rust_banking_engine::bank::Bank;
/// use rust_banking_engine::config::EngineConfig;
/// use rust_banking_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
///
/// let bank = Bank::in_memory(EngineConfig::default()).unwrap();
/// let mut output = std::io::stdout();
/// SyncProcessingStrategy
///     .process(&bank, Path::new("operations.csv"), &mut output)
///     .expect("Replay failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, bank: &Bank, input_path: &Path, output: &mut dyn Write) -> BankResult<()> {
        let engine = bank.engine();
        let reader = SyncReader::new(input_path)?;
        let mut summary = ReplaySummary::default();

        for result in reader {
            match result {
                Ok(operation) => match engine.apply(&operation) {
                    Ok(_) => summary.applied += 1,
                    Err(e) => {
                        summary.rejected += 1;
                        debug!(?operation, error = %e, "operation rejected");
                    }
                },
                Err(e) => {
                    summary.rejected += 1;
                    warn!(error = %e, "skipping invalid row");
                }
            }
        }

        summary.log("sync");
        write_accounts_csv(&bank.all_accounts(), output)
    }
}
