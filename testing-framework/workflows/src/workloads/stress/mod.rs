//! The reload → pay → refetch → match cycle.
//!
//! One [`StressCycle`] owns the pending payments and is driven by a single
//! task, so its steps never overlap. Network calls are timed one by one; a
//! failed pull, push or pay is logged and counted, never fatal. Store failures
//! and an unusable pool end the current cycle instead.

use std::{collections::BTreeSet, future::Future, sync::Arc};

use stress_config::StressConfig;
use stress_core::{
    Amount, DynError, Network, PaymentTracker, StatsRecorder, StressError, Wallet, WalletId,
    WalletStore,
};
use tokio::time::Instant;
use tracing::{debug, error};

use crate::status::{CycleState, StatusMonitor, ThreadState};

#[cfg(test)]
pub(crate) mod fixtures;
pub mod metrics;
mod observe;
mod pay;
mod reload;

use metrics::{CYCLE, CYCLE_ERROR, Op};

pub struct StressCycle {
    config: StressConfig,
    store: Arc<dyn WalletStore>,
    network: Arc<dyn Network>,
    stats: Arc<StatsRecorder>,
    tracker: PaymentTracker,
    state: Arc<CycleState>,
}

impl StressCycle {
    /// Validates `config`; an invalid one never produces a cycle.
    pub fn new(
        config: StressConfig,
        store: Arc<dyn WalletStore>,
        network: Arc<dyn Network>,
    ) -> Result<Self, StressError> {
        config
            .validate()
            .map_err(|err| StressError::Config(err.to_string()))?;

        Ok(Self {
            stats: Arc::new(StatsRecorder::new(config.stats_window)),
            config,
            store,
            network,
            tracker: PaymentTracker::new(),
            state: Arc::new(CycleState::new()),
        })
    }

    /// Records into a shared recorder instead of a private one.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<StatsRecorder>) -> Self {
        self.stats = stats;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &StressConfig {
        &self.config
    }

    #[must_use]
    pub const fn stats(&self) -> &Arc<StatsRecorder> {
        &self.stats
    }

    #[must_use]
    pub const fn state(&self) -> &Arc<CycleState> {
        &self.state
    }

    #[must_use]
    pub fn monitor(&self) -> StatusMonitor {
        StatusMonitor::new(Arc::clone(&self.state), Arc::clone(&self.stats))
    }

    /// Payments dispatched but not yet observed as arrived.
    #[must_use]
    pub fn pending_payments(&self) -> usize {
        self.tracker.len()
    }

    /// Runs every step once and records the cycle duration, or one
    /// `cycle-error` sample when a step fails.
    pub async fn run_once(&mut self) -> Result<(), StressError> {
        let started = Instant::now();
        let result = self.steps().await;
        match &result {
            Ok(()) => {
                let elapsed = started.elapsed();
                self.stats.put(CYCLE, elapsed.as_secs_f64());
                debug!(
                    elapsed_ms = elapsed.as_millis(),
                    wallets = self.state.wallets(),
                    waiting = self.tracker.len(),
                    "stress cycle finished"
                );
            }
            Err(err) => {
                error!(%err, "stress cycle failed");
                self.stats.put(CYCLE_ERROR, 1.0);
            }
        }
        result
    }

    async fn steps(&mut self) -> Result<(), StressError> {
        self.state.set_thread(ThreadState::Reloading);
        self.reload().await?;
        self.state.set_thread(ThreadState::Paying);
        self.pay().await?;
        self.state.set_thread(ThreadState::Refetching);
        self.refetch().await?;
        self.state.set_thread(ThreadState::Matching);
        self.match_arrivals().await
    }

    /// Current pool membership; also publishes its size.
    async fn pool(&self) -> Result<BTreeSet<WalletId>, StressError> {
        let pool = self.store.all().await.map_err(StressError::store("all"))?;
        self.state.set_wallets(pool.len());
        Ok(pool)
    }

    async fn wallet(&self, id: &WalletId) -> Result<Option<Wallet>, StressError> {
        self.store
            .find(id)
            .await
            .map_err(StressError::store("find"))
    }

    /// Balance of a local wallet; a wallet missing locally holds nothing.
    async fn balance(&self, id: &WalletId) -> Result<Amount, StressError> {
        Ok(self
            .wallet(id)
            .await?
            .map_or(Amount::ZERO, |wallet| wallet.balance()))
    }

    async fn remove(&self, id: &WalletId) -> Result<(), StressError> {
        self.store
            .remove(id)
            .await
            .map_err(StressError::store("remove"))
    }

    async fn pull(&self, id: &WalletId) -> bool {
        self.exec(Op::Pull, id, self.network.pull(id, &self.config.remotes))
            .await
    }

    async fn push(&self, id: &WalletId) -> bool {
        self.exec(Op::Push, id, self.network.push(id, &self.config.remotes))
            .await
    }

    /// Awaits one network call, recording its duration on success and a
    /// single error sample on failure. Returns whether it succeeded.
    async fn exec<F>(&self, op: Op, id: &WalletId, call: F) -> bool
    where
        F: Future<Output = Result<(), DynError>>,
    {
        let started = Instant::now();
        match call.await {
            Ok(()) => {
                self.stats.put(op.metric(), started.elapsed().as_secs_f64());
                true
            }
            Err(err) => {
                error!(op = op.metric(), wallet = %id, %err, "ledger call failed");
                self.stats.put(op.error_metric(), 1.0);
                false
            }
        }
    }
}
