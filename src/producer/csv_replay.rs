//! CSV file replay
//!
//! Submits every valid row of a transaction file in order. Rows that fail to
//! parse are logged and skipped; only failing to open the file is fatal.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use super::Producer;
use crate::core::TransactionSubmitter;
use crate::io::TransactionReader;
use crate::types::LedgerError;

/// Producer replaying a CSV transaction file
#[derive(Debug, Clone)]
pub struct CsvProducer {
    path: PathBuf,
    interval: Duration,
}

impl CsvProducer {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
        }
    }
}

impl Producer for CsvProducer {
    fn produce(&self, submitter: &TransactionSubmitter) -> Result<usize, LedgerError> {
        let reader = match TransactionReader::new(&self.path) {
            Ok(reader) => reader,
            Err(e) => {
                submitter.close();
                return Err(e);
            }
        };

        info!("Replaying transactions from {}", self.path.display());
        let mut produced = 0;
        let mut skipped = 0;

        for result in reader {
            if submitter.is_closed() {
                info!("Inbound queue closed, stopping replay");
                break;
            }

            match result {
                Ok(tx) => {
                    submitter.submit_transaction(tx);
                    produced += 1;
                    if !self.interval.is_zero() {
                        thread::sleep(self.interval);
                    }
                }
                Err(e) => {
                    warn!("Skipping record: {}", e);
                    skipped += 1;
                }
            }
        }

        submitter.close();
        info!(produced, skipped, "Replay finished");
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, ProcessingDelay};
    use crate::core::TransactionEngine;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn engine(limit: Option<u64>) -> TransactionEngine {
        TransactionEngine::new(EngineConfig {
            workers: 2,
            max_in_flight: 2,
            accounts: 3,
            delay: ProcessingDelay::NONE,
            transaction_limit: limit,
            audit_interval: 0,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_replay_skips_bad_rows() {
        let file = create_temp_csv(
            "kind,account,receiver,amount\n\
             deposit,0,,100\n\
             refund,1,,5\n\
             transfer,1,2,50\n\
             audit,,,\n",
        );
        let engine = engine(None);
        let submitter = engine.submitter();

        let produced = CsvProducer::new(file.path(), Duration::ZERO)
            .produce(&submitter)
            .unwrap();

        assert_eq!(produced, 3);
        assert_eq!(submitter.pending(), 3);
        assert!(submitter.is_closed());
    }

    #[test]
    fn test_replay_drives_engine_to_expected_balances() {
        let file = create_temp_csv(
            "kind,account,receiver,amount\n\
             deposit,0,,100\n\
             transfer,1,2,50\n",
        );
        let engine = engine(None);

        CsvProducer::new(file.path(), Duration::ZERO)
            .produce(&engine.submitter())
            .unwrap();
        let report = engine.run().unwrap().final_audit.unwrap();

        assert_eq!(report.balance_of(0), Some(1100.0));
        assert_eq!(report.balance_of(1), Some(950.0));
        assert_eq!(report.balance_of(2), Some(1050.0));
        assert_eq!(report.total, 3100.0);
    }
}
