//! Transaction producers
//!
//! Producers feed the engine through a `TransactionSubmitter` from their own
//! thread. Two sources are available and picked at runtime:
//!
//! - `random` - synthetic deposits and transfers
//! - `csv_replay` - transactions replayed from a CSV file

use crate::config::EngineConfig;
use crate::core::TransactionSubmitter;
use crate::types::LedgerError;
use std::path::PathBuf;

pub mod csv_replay;
pub mod random;

pub use csv_replay::CsvProducer;
pub use random::RandomProducer;

/// Source of transactions for one run
///
/// `produce` blocks until the source is exhausted or the submitter is
/// closed by the dispatcher, and returns the number of transactions
/// submitted. Implementations close the submitter when they finish so an
/// unbounded dispatcher knows no more work is coming.
pub trait Producer: Send {
    fn produce(&self, submitter: &TransactionSubmitter) -> Result<usize, LedgerError>;
}

/// Available transaction sources
#[derive(Debug, Clone, PartialEq)]
pub enum ProducerType {
    Random { seed: Option<u64> },
    Csv { path: PathBuf },
}

/// Create a producer for the given source
pub fn create_producer(producer_type: ProducerType, config: &EngineConfig) -> Box<dyn Producer> {
    match producer_type {
        ProducerType::Random { seed } => Box::new(RandomProducer::new(config, seed)),
        ProducerType::Csv { path } => Box::new(CsvProducer::new(path, config.interval)),
    }
}
