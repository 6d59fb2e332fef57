use std::collections::BTreeSet;

use rand::{seq::SliceRandom as _, thread_rng};
use stress_core::{StressError, WalletId};
use tracing::{debug, info};

use super::{
    StressCycle,
    metrics::{CREATED, REMOVED},
};

impl StressCycle {
    /// Brings the pool back to exactly `pool_size` wallets.
    ///
    /// Pulls the root, then every beneficiary the pool has paid that is not
    /// held locally, retires drained wallets, creates fresh ones and finally
    /// drops random extras. The root wallet is never retired or dropped.
    pub async fn reload(&mut self) -> Result<(), StressError> {
        self.pull(&self.config.root).await;
        self.pull_beneficiaries().await?;
        self.retire_drained().await?;
        self.create_missing().await?;
        self.trim_overshoot().await?;

        let size = self.pool().await?.len();
        info!(wallets = size, "stress pool reloaded");
        Ok(())
    }

    /// Rescans until a full pass pulls nothing new. Each beneficiary is tried
    /// at most once per reload.
    async fn pull_beneficiaries(&self) -> Result<(), StressError> {
        let mut attempted = BTreeSet::new();
        loop {
            let pool = self.pool().await?;
            let mut size = pool.len();
            let mut pulled_any = false;

            for id in &pool {
                let Some(wallet) = self.wallet(id).await? else {
                    continue;
                };
                for txn in wallet.outgoing() {
                    if size > self.config.pool_size {
                        break;
                    }
                    let beneficiary = &txn.beneficiary;
                    if pool.contains(beneficiary) || !attempted.insert(beneficiary.clone()) {
                        continue;
                    }
                    if self.pull(beneficiary).await {
                        debug!(wallet = %beneficiary, payer = %id, "pulled beneficiary");
                        size += 1;
                        pulled_any = true;
                    }
                }
            }

            if !pulled_any {
                return Ok(());
            }
        }
    }

    /// Removes every non-root wallet holding no more than one payment.
    async fn retire_drained(&self) -> Result<(), StressError> {
        for id in self.pool().await? {
            if id == self.config.root {
                continue;
            }
            let balance = self.balance(&id).await?;
            if balance <= self.config.amount {
                self.remove(&id).await?;
                self.stats.put(REMOVED, 1.0);
                debug!(wallet = %id, %balance, "retired drained wallet");
            }
        }
        Ok(())
    }

    async fn create_missing(&self) -> Result<(), StressError> {
        let size = self.pool().await?.len();
        for _ in size..self.config.pool_size {
            let id = self
                .store
                .create(&self.config.public_key, &self.config.remotes)
                .await
                .map_err(StressError::store("create"))?;
            self.stats.put(CREATED, 1.0);
            debug!(wallet = %id, "created pool wallet");
        }
        Ok(())
    }

    async fn trim_overshoot(&self) -> Result<(), StressError> {
        let pool = self.pool().await?;
        let Some(excess) = pool.len().checked_sub(self.config.pool_size) else {
            return Ok(());
        };

        let mut candidates: Vec<WalletId> = pool
            .into_iter()
            .filter(|id| *id != self.config.root)
            .collect();
        candidates.shuffle(&mut thread_rng());

        for id in candidates.into_iter().take(excess) {
            self.remove(&id).await?;
            self.stats.put(REMOVED, 1.0);
            debug!(wallet = %id, "dropped extra pool wallet");
        }
        Ok(())
    }
}
