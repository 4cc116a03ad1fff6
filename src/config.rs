//! Engine configuration
//!
//! Read once at startup and immutable afterwards. Invalid values fall back to
//! their defaults with a warning rather than aborting the run.

use rand::Rng;
use std::time::Duration;
use tracing::warn;

use crate::types::LedgerError;

/// Largest supported decimal precision for generated amounts
pub const MAX_PRECISION: u32 = 6;

/// Simulated per-transaction processing time
///
/// Each deposit or transfer sleeps for a duration drawn uniformly from
/// `min..=max` while it holds its operation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessingDelay {
    pub min: Duration,
    pub max: Duration,
}

impl ProcessingDelay {
    /// No simulated delay
    pub const NONE: Self = Self {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Build a delay range from milliseconds, swapping the bounds if reversed
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        let (min_ms, max_ms) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    /// Draw one delay from the range
    pub fn sample(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    /// Sleep the current thread for one sampled delay
    pub fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Configuration for a ledger run
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of worker threads
    pub workers: usize,

    /// Maximum number of work items in flight at once
    ///
    /// Defaults to the worker count.
    pub max_in_flight: usize,

    /// Number of accounts created at startup, with ids `0..accounts`
    pub accounts: u32,

    /// Simulated processing delay range
    pub delay: ProcessingDelay,

    /// Number of non-audit transactions to dispatch before shutting down
    ///
    /// `None` runs until every producer has closed the inbound queue.
    pub transaction_limit: Option<u64>,

    /// Pause between generated transactions
    pub interval: Duration,

    /// Balance every account starts with
    pub starting_balance: f64,

    /// Largest absolute amount a generated transaction may carry
    pub max_amount: f64,

    /// Decimal places kept on generated amounts
    pub precision: u32,

    /// Number of non-audit transactions between injected audits; zero disables them
    pub audit_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let workers = num_cpus::get();
        Self {
            workers,
            max_in_flight: workers,
            accounts: 10,
            delay: ProcessingDelay::from_millis(0, 5),
            transaction_limit: Some(100),
            interval: Duration::from_millis(1),
            starting_balance: 1000.0,
            max_amount: 500.0,
            precision: 2,
            audit_interval: 10,
        }
    }
}

impl EngineConfig {
    /// Replace unusable values with defaults, logging a warning for each
    pub fn sanitized(mut self) -> Self {
        let default = Self::default();

        if self.workers == 0 {
            warn!(
                "Invalid workers ({}), using default ({})",
                self.workers, default.workers
            );
            self.workers = default.workers;
        }

        if self.max_in_flight == 0 {
            warn!(
                "Invalid max_in_flight ({}), using worker count ({})",
                self.max_in_flight, self.workers
            );
            self.max_in_flight = self.workers;
        }

        if self.accounts == 0 {
            warn!(
                "Invalid accounts ({}), using default ({})",
                self.accounts, default.accounts
            );
            self.accounts = default.accounts;
        }

        if self.precision > MAX_PRECISION {
            warn!(
                "Invalid precision ({}), using maximum ({})",
                self.precision, MAX_PRECISION
            );
            self.precision = MAX_PRECISION;
        }

        if !self.max_amount.is_finite() || self.max_amount <= 0.0 {
            warn!(
                "Invalid max_amount ({}), using default ({})",
                self.max_amount, default.max_amount
            );
            self.max_amount = default.max_amount;
        }

        self
    }

    /// Check the values that cannot be repaired
    pub fn validate(&self) -> Result<(), LedgerError> {
        if !self.starting_balance.is_finite() {
            return Err(LedgerError::invalid_config(
                "starting_balance",
                format!("{} is not a finite number", self.starting_balance),
            ));
        }
        if self.workers == 0 {
            return Err(LedgerError::invalid_config("workers", "must be positive"));
        }
        if self.max_in_flight == 0 {
            return Err(LedgerError::invalid_config(
                "max_in_flight",
                "must be positive",
            ));
        }
        Ok(())
    }
}
