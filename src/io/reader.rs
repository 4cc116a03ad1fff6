//! Streaming CSV reader for transaction replay files
//!
//! Provides an iterator over transactions read from a CSV file with the
//! columns `kind,account,receiver,amount`. Delegates format concerns to the
//! csv_format module.
//!
//! ```no_run
//! use concurrent_ledger::io::reader::TransactionReader;
//! use std::path::Path;
//!
//! let reader = TransactionReader::new(Path::new("transactions.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(tx) => println!("Replaying {}", tx),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record errors are yielded as `Err` with the line number, and
//!   iteration continues with the next record

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerError, Transaction};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV transaction reader
///
/// Reads one record at a time, so memory use does not grow with file size.
#[derive(Debug)]
pub struct TransactionReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl TransactionReader {
    /// Open a CSV file for streaming
    ///
    /// Whitespace around fields is trimmed and rows may omit trailing
    /// columns (audits need neither receiver nor amount).
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| LedgerError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for TransactionReader {
    type Item = Result<Transaction, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;

        Some(match next {
            Ok(csv_record) => convert_csv_record(csv_record)
                .map_err(|e| LedgerError::parse_error(Some(self.line_num), e)),
            Err(e) => Err(e.into()),
        })
    }
}
