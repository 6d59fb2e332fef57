use stress_core::StressError;
use tokio::time::Instant;
use tracing::info;

use super::{StressCycle, metrics::ARRIVED};

impl StressCycle {
    /// Drops every local copy and pulls it again from the network.
    pub async fn refetch(&mut self) -> Result<(), StressError> {
        for id in self.pool().await? {
            self.remove(&id).await?;
            self.pull(&id).await;
        }
        Ok(())
    }

    /// Resolves pending tokens found in incoming transactions and records
    /// their latency under `arrived`.
    pub async fn match_arrivals(&mut self) -> Result<(), StressError> {
        for id in self.pool().await? {
            let Some(wallet) = self.wallet(&id).await? else {
                continue;
            };
            let observed_at = Instant::now();
            for txn in wallet.incoming() {
                if let Some(latency) = self.tracker.resolve(&txn.details, observed_at) {
                    self.stats.put(ARRIVED, latency.as_secs_f64());
                    info!(
                        wallet = %id,
                        token = %txn.details,
                        latency_ms = latency.as_millis(),
                        "payment arrived"
                    );
                }
            }
        }
        self.state.set_waiting(self.tracker.len());
        Ok(())
    }
}
