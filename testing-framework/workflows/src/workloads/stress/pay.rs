use rand::{
    seq::{IteratorRandom as _, SliceRandom as _},
    thread_rng,
};
use stress_config::constants::MIN_POOL_SIZE;
use stress_core::{Payment, StressError, WalletId};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    StressCycle,
    metrics::{Op, PAID, UNPUSHED},
};

impl StressCycle {
    /// Sends one payment of `amount` between two random pool wallets.
    ///
    /// Senders are tried in random order and skipped while they hold less
    /// than `amount`. The payment carries a fresh token in its details; the
    /// token stays pending until [`StressCycle::match_arrivals`] sees it.
    pub async fn pay(&mut self) -> Result<(), StressError> {
        let pool: Vec<WalletId> = self.pool().await?.into_iter().collect();
        if pool.len() < MIN_POOL_SIZE {
            return Err(StressError::TooFewWallets {
                available: pool.len(),
                required: MIN_POOL_SIZE,
            });
        }

        let mut senders = pool.clone();
        senders.shuffle(&mut thread_rng());

        for (tried, source) in senders.into_iter().enumerate() {
            let balance = self.balance(&source).await?;
            if balance < self.config.amount {
                debug!(wallet = %source, %balance, "sender cannot cover the payment");
                continue;
            }
            let Some(target) = pool
                .iter()
                .filter(|id| **id != source)
                .choose(&mut thread_rng())
                .cloned()
            else {
                continue;
            };

            let token = Uuid::new_v4().to_string();
            let payment = Payment {
                source,
                target,
                amount: self.config.amount,
                details: token.clone(),
            };
            let dispatched_at = Instant::now();
            let sent = self
                .exec(
                    Op::Pay,
                    &payment.source,
                    self.network
                        .pay(&payment, &self.config.remotes, &self.config.private_key),
                )
                .await;
            if !sent {
                return Ok(());
            }

            let pushed = self.push(&payment.source).await;
            self.tracker.record(token.as_str(), dispatched_at)?;
            self.stats.put(PAID, payment.amount.as_units_f64());
            self.state.set_waiting(self.tracker.len());
            if !pushed {
                self.stats.put(UNPUSHED, 1.0);
                warn!(
                    source = %payment.source,
                    token = %token,
                    waiting = self.tracker.len(),
                    "payment not pushed, it may never arrive"
                );
            }
            info!(
                source = %payment.source,
                target = %payment.target,
                amount = %payment.amount,
                token = %token,
                senders_tried = tried + 1,
                "payment dispatched"
            );
            return Ok(());
        }

        Err(StressError::NoFundedSender {
            amount: self.config.amount,
            tried: pool.len(),
        })
    }
}
