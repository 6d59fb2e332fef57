use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicUsize, Ordering},
    },
};

use serde::{Deserialize, Serialize};
use stress_core::{MetricSummary, StatsRecorder};

/// What the cycle loop is doing right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ThreadState {
    #[default]
    Idle = 0,
    Reloading = 1,
    Paying = 2,
    Refetching = 3,
    Matching = 4,
    Sleeping = 5,
    Stopped = 6,
}

impl ThreadState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Reloading,
            2 => Self::Paying,
            3 => Self::Refetching,
            4 => Self::Matching,
            5 => Self::Sleeping,
            6 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

/// Values the cycle task publishes for status readers.
///
/// `Stopped` is terminal: once set, later thread updates are ignored.
#[derive(Debug, Default)]
pub struct CycleState {
    wallets: AtomicUsize,
    waiting: AtomicUsize,
    thread: AtomicU8,
}

impl CycleState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_wallets(&self, wallets: usize) {
        self.wallets.store(wallets, Ordering::Relaxed);
    }

    #[must_use]
    pub fn wallets(&self) -> usize {
        self.wallets.load(Ordering::Relaxed)
    }

    pub fn set_waiting(&self, waiting: usize) {
        self.waiting.store(waiting, Ordering::Relaxed);
    }

    #[must_use]
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    pub fn set_thread(&self, next: ThreadState) {
        let stopped = ThreadState::Stopped as u8;
        let _ = self
            .thread
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != stopped).then_some(next as u8)
            });
    }

    #[must_use]
    pub fn thread(&self) -> ThreadState {
        ThreadState::from_u8(self.thread.load(Ordering::Acquire))
    }
}

/// Point-in-time status of a stress run, serialized flat:
/// `{"wallets": .., "thread": .., "waiting": .., "<metric>": {..}, ..}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StressStatus {
    pub wallets: usize,
    pub thread: ThreadState,
    pub waiting: usize,
    #[serde(flatten)]
    pub stats: BTreeMap<String, MetricSummary>,
}

/// Cloneable read side of a running cycle.
#[derive(Clone, Debug)]
pub struct StatusMonitor {
    state: Arc<CycleState>,
    stats: Arc<StatsRecorder>,
}

impl StatusMonitor {
    #[must_use]
    pub const fn new(state: Arc<CycleState>, stats: Arc<StatsRecorder>) -> Self {
        Self { state, stats }
    }

    #[must_use]
    pub fn snapshot(&self) -> StressStatus {
        StressStatus {
            wallets: self.state.wallets(),
            thread: self.state.thread(),
            waiting: self.state.waiting(),
            stats: self.stats.snapshot(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &Arc<StatsRecorder> {
        &self.stats
    }

    #[must_use]
    pub const fn state(&self) -> &Arc<CycleState> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_is_terminal() {
        let state = CycleState::new();
        assert_eq!(state.thread(), ThreadState::Idle);

        state.set_thread(ThreadState::Paying);
        assert_eq!(state.thread(), ThreadState::Paying);

        state.set_thread(ThreadState::Stopped);
        state.set_thread(ThreadState::Reloading);
        assert_eq!(state.thread(), ThreadState::Stopped);
    }

    #[test]
    fn status_serializes_flat() {
        let state = Arc::new(CycleState::new());
        let stats = Arc::new(StatsRecorder::default());
        state.set_wallets(8);
        state.set_waiting(2);
        state.set_thread(ThreadState::Sleeping);
        stats.put("pull", 0.25);

        let monitor = StatusMonitor::new(state, stats);
        let json = serde_json::to_value(monitor.snapshot()).unwrap();
        assert_eq!(json["wallets"], 8);
        assert_eq!(json["waiting"], 2);
        assert_eq!(json["thread"], "sleeping");
        assert_eq!(json["pull"]["total"], 1);

        let back: StressStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back.stats["pull"].last, 0.25);
    }
}
