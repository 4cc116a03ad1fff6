//! Synthetic transaction generation
//!
//! Generates an even mix of deposits and transfers over the configured
//! accounts. Amounts are drawn uniformly from `-max_amount..=max_amount` and
//! rounded to the configured precision, so roughly half the deposits are
//! withdrawals and half the transfers run in reverse.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use super::Producer;
use crate::config::EngineConfig;
use crate::core::TransactionSubmitter;
use crate::types::{AccountId, LedgerError, Transaction};

/// Round `amount` to `precision` decimal places
pub fn round_amount(amount: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (amount * factor).round() / factor
}

/// Producer of random deposits and transfers
#[derive(Debug, Clone)]
pub struct RandomProducer {
    accounts: u32,
    max_amount: f64,
    precision: u32,
    interval: Duration,
    quota: Option<u64>,
    seed: Option<u64>,
}

impl RandomProducer {
    /// Build a producer from the run configuration
    ///
    /// The producer stops after `transaction_limit` transactions. Without a
    /// limit it runs until the dispatcher closes the inbound queue.
    pub fn new(config: &EngineConfig, seed: Option<u64>) -> Self {
        Self {
            accounts: config.accounts,
            max_amount: config.max_amount,
            precision: config.precision,
            interval: config.interval,
            quota: config.transaction_limit,
            seed,
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn generate(&self, rng: &mut impl Rng) -> Transaction {
        let amount = round_amount(
            rng.gen_range(-self.max_amount..=self.max_amount),
            self.precision,
        );
        let account = rng.gen_range(0..self.accounts);

        if self.accounts > 1 && rng.gen_bool(0.5) {
            Transaction::transfer(account, self.pick_receiver(rng, account), amount)
        } else {
            Transaction::deposit(account, amount)
        }
    }

    /// Uniform over every account except `sender`
    fn pick_receiver(&self, rng: &mut impl Rng, sender: AccountId) -> AccountId {
        let receiver = rng.gen_range(0..self.accounts - 1);
        if receiver >= sender {
            receiver + 1
        } else {
            receiver
        }
    }

    fn quota_reached(&self, produced: u64) -> bool {
        self.quota.is_some_and(|quota| produced >= quota)
    }
}

impl Producer for RandomProducer {
    fn produce(&self, submitter: &TransactionSubmitter) -> Result<usize, LedgerError> {
        if self.accounts == 0 {
            submitter.close();
            return Err(LedgerError::invalid_config(
                "accounts",
                "cannot generate transactions without accounts",
            ));
        }

        info!(seed = ?self.seed, quota = ?self.quota, "Random producer started");
        let mut rng = self.rng();
        let mut produced = 0u64;

        while !self.quota_reached(produced) && !submitter.is_closed() {
            let tx = self.generate(&mut rng);
            debug!("Generated {}", tx);
            submitter.submit_transaction(tx);
            produced += 1;

            if !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
        }

        submitter.close();
        info!(produced, "Random producer finished");
        Ok(produced as usize)
    }
}
