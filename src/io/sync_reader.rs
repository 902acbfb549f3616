//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over teller operations from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record parsing errors are yielded as Err variants in the iterator
//! - Line numbers are included in error messages for debugging
//!
//! ```no_run
//! use rust_banking_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(operation) => println!("Replaying {:?}", operation),
//!         Err(e) => eprintln!("Skipped: {}", e),
//!     }
//! }
//! ```

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::io::csv_format::{convert_csv_record, AccountSeed, CsvRecord};
use crate::types::{BankError, BankResult, TellerOperation};

fn open_csv(path: &Path) -> BankResult<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| {
        BankError::storage(format!("Failed to open file '{}': {}", path.display(), e))
    })?;

    Ok(ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .buffer_capacity(8 * 1024)
        .from_reader(file))
}

/// Prefix a conversion error with the CSV line it came from
pub(crate) fn at_line(line: usize, error: BankError) -> BankError {
    match error {
        BankError::Validation { field, message } => BankError::Validation {
            field,
            message: format!("line {}: {}", line, message),
        },
        other => other,
    }
}

/// Synchronous CSV reader
///
/// Streams one record at a time; memory use does not grow with the file.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Open a CSV file of teller operations
    ///
    /// The CSV reader trims whitespace from all fields and allows rows
    /// without the optional trailing columns.
    pub fn new(path: &Path) -> BankResult<Self> {
        Ok(Self {
            reader: open_csv(path)?,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = BankResult<TellerOperation>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let record = deserializer.next()?;
        self.line_num += 1;
        // +1 for the header row
        let line = self.line_num + 1;
        Some(match record {
            Ok(csv_record) => convert_csv_record(csv_record).map_err(|e| at_line(line, e)),
            Err(e) => Err(e.into()),
        })
    }
}

/// Read every row of an account seed file
pub fn read_account_seeds(path: &Path) -> BankResult<Vec<AccountSeed>> {
    let mut reader = open_csv(path)?;
    let seeds = reader
        .deserialize::<AccountSeed>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(seeds)
}
