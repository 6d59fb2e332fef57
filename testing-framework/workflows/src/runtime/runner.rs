use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt as _;
use stress_core::{StatsRecorder, panic_message};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{error, info};

use crate::{
    status::{StatusMonitor, StressStatus, ThreadState},
    workloads::stress::{StressCycle, metrics::CYCLE_ERROR},
};

/// Drives a [`StressCycle`] forever on a background task.
pub struct StressRunner;

impl StressRunner {
    /// Spawns the cycle loop; must be called from within a tokio runtime.
    ///
    /// Each cycle runs behind `catch_unwind`, so a panicking collaborator
    /// costs one `cycle-error` sample and the loop carries on after `delay`.
    #[must_use]
    pub fn spawn(cycle: StressCycle) -> StressHandle {
        let monitor = cycle.monitor();
        let task = tokio::spawn(run_cycles(cycle));
        StressHandle { monitor, task }
    }
}

async fn run_cycles(mut cycle: StressCycle) {
    let delay = cycle.config().delay;
    let state = Arc::clone(cycle.state());
    let stats = Arc::clone(cycle.stats());
    info!(
        pool_size = cycle.config().pool_size,
        amount = %cycle.config().amount,
        delay_secs = delay.as_secs(),
        "starting stress loop"
    );

    loop {
        // Errors are already logged and counted by `run_once`.
        if let Err(panic) = AssertUnwindSafe(cycle.run_once()).catch_unwind().await {
            error!(panic = %panic_message(panic), "stress cycle panicked");
            stats.put(CYCLE_ERROR, 1.0);
        }

        state.set_thread(ThreadState::Sleeping);
        sleep(delay).await;
    }
}

/// Owner of a running stress loop. Dropping it stops the loop.
pub struct StressHandle {
    monitor: StatusMonitor,
    task: JoinHandle<()>,
}

impl StressHandle {
    #[must_use]
    pub fn status(&self) -> StressStatus {
        self.monitor.snapshot()
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<StatsRecorder> {
        self.monitor.stats()
    }

    /// Cloneable view for readers that outlive a borrow of the handle.
    #[must_use]
    pub fn monitor(&self) -> StatusMonitor {
        self.monitor.clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Aborts the loop and publishes `stopped`.
    pub fn stop(&self) {
        self.task.abort();
        self.monitor.state().set_thread(ThreadState::Stopped);
        info!("stress loop stopped");
    }
}

impl Drop for StressHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
