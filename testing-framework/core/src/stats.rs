use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Samples kept per metric when no explicit window is configured.
pub const DEFAULT_WINDOW: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatSample {
    pub value: f64,
    pub observed_at: Instant,
}

/// Aggregate view of one metric's retained samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Samples ever recorded, including evicted ones.
    pub total: u64,
    /// Samples currently retained in the window.
    pub count: usize,
    pub sum: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
    /// Seconds since the most recent sample.
    pub age: f64,
}

#[derive(Debug, Default)]
struct Series {
    total: u64,
    samples: VecDeque<StatSample>,
}

/// Append-only, per-metric ring buffers of timestamped samples.
///
/// Shared between the cycle loop (single writer) and status readers.
#[derive(Debug)]
pub struct StatsRecorder {
    window: usize,
    metrics: Mutex<BTreeMap<String, Series>>,
}

impl Default for StatsRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl StatsRecorder {
    /// `window` is clamped to at least one sample.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            metrics: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn put(&self, metric: &str, value: f64) {
        self.put_at(metric, value, Instant::now());
    }

    pub fn put_at(&self, metric: &str, value: f64, observed_at: Instant) {
        let mut metrics = self
            .metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let series = metrics.entry(metric.to_owned()).or_default();
        if series.samples.len() == self.window {
            series.samples.pop_front();
        }
        series.samples.push_back(StatSample { value, observed_at });
        series.total += 1;
    }

    /// All-time number of samples recorded under `metric`.
    #[must_use]
    pub fn total(&self, metric: &str) -> u64 {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(metric)
            .map_or(0, |series| series.total)
    }

    /// Retained samples for `metric`, oldest first.
    #[must_use]
    pub fn samples(&self, metric: &str) -> Vec<StatSample> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(metric)
            .map(|series| series.samples.iter().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, MetricSummary> {
        let now = Instant::now();
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter_map(|(name, series)| summarize(series, now).map(|s| (name.clone(), s)))
            .collect()
    }
}

fn summarize(series: &Series, now: Instant) -> Option<MetricSummary> {
    let last = series.samples.back()?;
    let count = series.samples.len();
    let (sum, min, max) = series.samples.iter().fold(
        (0.0, f64::INFINITY, f64::NEG_INFINITY),
        |(sum, min, max), sample| (sum + sample.value, min.min(sample.value), max.max(sample.value)),
    );

    Some(MetricSummary {
        total: series.total,
        count,
        sum,
        avg: sum / count as f64,
        min,
        max,
        last: last.value,
        age: now.saturating_duration_since(last.observed_at).as_secs_f64(),
    })
}
