use std::time::Duration;

use stress_core::Amount;

/// Wallets the pool is driven towards when no size is configured.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// A payment needs a sender and a distinct receiver.
pub const MIN_POOL_SIZE: usize = 2;

/// Amount sent by every payment (0.01 units).
pub const DEFAULT_AMOUNT: Amount = Amount::from_minor(Amount::MINOR_PER_UNIT / 100);

/// Pause between two stress cycles.
pub const DEFAULT_CYCLE_DELAY: Duration = Duration::from_secs(10);

/// Samples retained per metric.
pub const DEFAULT_STATS_WINDOW: usize = stress_core::stats::DEFAULT_WINDOW;

/// Size of the shared single-flight worker pool.
pub const DEFAULT_WORKERS: usize = 8;

/// Directory holding per-wallet single-flight lock files.
pub const DEFAULT_LOCK_DIR: &str = ".stress-locks";

/// Default port of the status endpoint.
pub const DEFAULT_STATUS_PORT: u16 = 4100;
