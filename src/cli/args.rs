use crate::config::{EngineConfig, ProcessingDelay};
use crate::producer::ProducerType;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Run concurrent deposits, transfers and balance audits over an in-memory ledger
#[derive(Parser, Debug)]
#[command(name = "concurrent-ledger")]
#[command(
    about = "Run concurrent deposits, transfers and balance audits over an in-memory ledger",
    long_about = None
)]
pub struct CliArgs {
    /// Number of worker threads
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Maximum number of transactions in flight
    #[arg(
        long = "max-in-flight",
        value_name = "COUNT",
        help = "Maximum number of transactions executing or queued for workers (default: worker count)"
    )]
    pub max_in_flight: Option<usize>,

    /// Number of accounts
    #[arg(long = "accounts", value_name = "COUNT", default_value_t = 10)]
    pub accounts: u32,

    /// Lower bound of the simulated processing delay
    #[arg(long = "min-delay-ms", value_name = "MS", default_value_t = 0)]
    pub min_delay_ms: u64,

    /// Upper bound of the simulated processing delay
    #[arg(long = "max-delay-ms", value_name = "MS", default_value_t = 5)]
    pub max_delay_ms: u64,

    /// Number of deposits and transfers to process
    #[arg(
        long = "limit",
        value_name = "COUNT",
        default_value_t = 100,
        help = "Number of deposits and transfers to process; 0 runs until the input is exhausted"
    )]
    pub limit: u64,

    /// Pause between submitted transactions
    #[arg(long = "interval-ms", value_name = "MS", default_value_t = 1)]
    pub interval_ms: u64,

    /// Balance every account starts with
    #[arg(long = "starting-balance", value_name = "AMOUNT", default_value_t = 1000.0)]
    pub starting_balance: f64,

    /// Largest absolute amount of a generated transaction
    #[arg(long = "max-amount", value_name = "AMOUNT", default_value_t = 500.0)]
    pub max_amount: f64,

    /// Decimal places of generated amounts
    #[arg(long = "precision", value_name = "DIGITS", default_value_t = 2)]
    pub precision: u32,

    /// Transactions between balance audits
    #[arg(
        long = "audit-interval",
        value_name = "COUNT",
        default_value_t = 10,
        help = "Deposits and transfers between balance audits; 0 disables periodic audits"
    )]
    pub audit_interval: u64,

    /// Seed for the random generator
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Replay transactions from a CSV file instead of generating them
    #[arg(
        long = "input",
        value_name = "FILE",
        help = "CSV file with columns kind,account,receiver,amount to replay instead of random generation"
    )]
    pub input: Option<PathBuf>,
}

impl CliArgs {
    /// Build the engine configuration from the parsed arguments
    ///
    /// Values the engine cannot use fall back to defaults with a warning
    /// (see `EngineConfig::sanitized`).
    pub fn to_engine_config(&self) -> EngineConfig {
        let workers = self.workers.unwrap_or_else(num_cpus::get);
        EngineConfig {
            workers,
            max_in_flight: self.max_in_flight.unwrap_or(workers),
            accounts: self.accounts,
            delay: ProcessingDelay::from_millis(self.min_delay_ms, self.max_delay_ms),
            transaction_limit: (self.limit > 0).then_some(self.limit),
            interval: Duration::from_millis(self.interval_ms),
            starting_balance: self.starting_balance,
            max_amount: self.max_amount,
            precision: self.precision,
            audit_interval: self.audit_interval,
        }
        .sanitized()
    }

    /// Which transaction source the arguments select
    pub fn producer_type(&self) -> ProducerType {
        match &self.input {
            Some(path) => ProducerType::Csv { path: path.clone() },
            None => ProducerType::Random { seed: self.seed },
        }
    }
}
