//! I/O module
//!
//! Handles CSV transaction replay and balance output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, report serialization)
//! - `reader` - Streaming transaction reader with iterator interface

pub mod csv_format;
pub mod reader;

pub use csv_format::{convert_csv_record, write_balances_csv, CsvRecord};
pub use reader::TransactionReader;
