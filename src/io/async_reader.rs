//! Asynchronous CSV reader with batch interface
//!
//! Reads teller operations in batches with csv-async. Each batch is handed to
//! the batch processor before the next one is read, so memory stays bounded
//! by the batch size.
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of TellerOperations
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::TellerOperation;

/// Asynchronous CSV reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 0,
        }
    }

    /// Read up to `batch_size` valid operations
    ///
    /// Rows that cannot be parsed or converted are logged and skipped, so a
    /// short batch does not mean the end of the file. An empty batch does.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<TellerOperation> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(record) = records.next().await else {
                break;
            };
            self.line_num += 1;
            let line = self.line_num + 1;
            match record {
                Ok(csv_record) => match convert_csv_record(csv_record) {
                    Ok(operation) => batch.push(operation),
                    Err(e) => warn!(line, error = %e, "skipping invalid operation"),
                },
                Err(e) => warn!(line, error = %e, "skipping unparseable row"),
            }
        }

        batch
    }
}
