//! Asynchronous batch processing strategy
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (account partitioning + tokio tasks)
//!         └── BalanceEngine (per-account locks)
//! ```
//!
//! Batches are processed one after another. Inside a batch, operations are
//! split into groups that share no account and the groups run as concurrent
//! tokio tasks. Operations on one account therefore keep file order across
//! the whole file, which makes the final balances identical to a sync
//! replay.

use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::bank::Bank;
use crate::core::BatchProcessor;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_accounts_csv;
use crate::strategy::{ProcessingStrategy, ReplaySummary};
use crate::types::{BankError, BankResult};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Worker threads of the tokio runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, bank: &Bank, input_path: &Path, output: &mut dyn Write) -> BankResult<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| BankError::storage(format!("Failed to create tokio runtime: {}", e)))?;

        let summary = runtime.block_on(async {
            let processor = BatchProcessor::new(bank.engine().clone());

            let file = tokio::fs::File::open(input_path).await.map_err(|e| {
                BankError::storage(format!(
                    "Failed to open file '{}': {}",
                    input_path.display(),
                    e
                ))
            })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut summary = ReplaySummary::default();
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Wait for the batch before reading the next one so that an
                // account's operations never overtake each other
                for result in processor.process_batch(batch).await {
                    match result.result {
                        Ok(_) => summary.applied += 1,
                        Err(e) => {
                            summary.rejected += 1;
                            debug!(operation = ?result.operation, error = %e, "operation rejected");
                        }
                    }
                }
            }
            Ok::<_, BankError>(summary)
        })?;

        summary.log("async");
        write_accounts_csv(&bank.all_accounts(), output)
    }
}
