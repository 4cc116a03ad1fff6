//! Concurrent Ledger CLI
//!
//! Runs deposits, transfers and periodic balance audits against an in-memory
//! ledger using a pool of worker threads.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- > balances.csv
//! cargo run -- --workers 8 --accounts 20 --limit 1000 --seed 7 > balances.csv
//! cargo run -- --input transactions.csv --limit 0 > balances.csv
//! RUST_LOG=debug cargo run -- --limit 20
//! ```
//!
//! Handler actions, audit lines and shutdown milestones are logged to stderr.
//! The balances seen by the final audit are written to stdout as CSV.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (invalid configuration, input file not readable, output failure)

use concurrent_ledger::cli;
use concurrent_ledger::core::TransactionEngine;
use concurrent_ledger::io::write_balances_csv;
use concurrent_ledger::producer::create_producer;
use std::io;
use std::process;
use std::thread;
use tracing::info;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = cli::parse_args();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs) -> Result<(), String> {
    let config = args.to_engine_config();
    let engine = TransactionEngine::new(config.clone()).map_err(|e| e.to_string())?;

    let producer = create_producer(args.producer_type(), &config);
    let submitter = engine.submitter();
    let producer_handle = thread::Builder::new()
        .name("ledger-producer".to_string())
        .spawn(move || producer.produce(&submitter))
        .map_err(|e| format!("Failed to spawn producer: {}", e))?;

    let summary = engine.run().map_err(|e| e.to_string())?;

    let produced = producer_handle
        .join()
        .map_err(|_| "Producer thread panicked".to_string())?
        .map_err(|e| e.to_string())?;

    info!(
        produced,
        dispatched = summary.dispatched,
        audits = summary.audits_dispatched,
        completed = summary.pool.completed,
        failed = summary.pool.failed,
        peak_executing = summary.pool.peak_executing,
        admission_waits = summary.pool.admission_waits,
        "Run complete"
    );

    let report = summary
        .final_audit
        .ok_or_else(|| "Final audit did not complete".to_string())?;
    let mut output = io::stdout();
    write_balances_csv(&report, &mut output)
}
