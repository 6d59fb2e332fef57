use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, DurationSeconds, PickFirst, TryFromInto, serde_as};
use stress_core::{Amount, PrivateKey, PublicKey, RemoteSet, WalletId};
use stress_env as env;
use thiserror::Error;
use tracing::debug;

use crate::constants::{
    DEFAULT_AMOUNT, DEFAULT_CYCLE_DELAY, DEFAULT_LOCK_DIR, DEFAULT_POOL_SIZE,
    DEFAULT_STATS_WINDOW, DEFAULT_STATUS_PORT, DEFAULT_WORKERS, MIN_POOL_SIZE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{field} must not be empty")]
    Missing { field: &'static str },
    #[error("pool_size {pool_size} is below the minimum of {}", MIN_POOL_SIZE)]
    PoolTooSmall { pool_size: usize },
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Amount),
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

/// Everything the stress workload needs to run.
#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StressConfig {
    /// The operator's own wallet; pulled at the start of every cycle.
    pub root: WalletId,
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
    #[serde(default)]
    pub remotes: RemoteSet,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Quoted decimal string or plain YAML number.
    #[serde_as(as = "PickFirst<(DisplayFromStr, TryFromInto<f64>)>")]
    #[serde(default = "default_amount")]
    pub amount: Amount,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_delay")]
    pub delay: Duration,
    #[serde(default = "default_stats_window")]
    pub stats_window: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,
    #[serde(default = "default_status_port")]
    pub status_port: u16,
}

const fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

const fn default_amount() -> Amount {
    DEFAULT_AMOUNT
}

const fn default_delay() -> Duration {
    DEFAULT_CYCLE_DELAY
}

const fn default_stats_window() -> usize {
    DEFAULT_STATS_WINDOW
}

const fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOCK_DIR)
}

const fn default_status_port() -> u16 {
    DEFAULT_STATUS_PORT
}

impl StressConfig {
    /// Creates a config with defaults for everything but the operator identity.
    #[must_use]
    pub fn new(root: WalletId, public_key: PublicKey, private_key: PrivateKey) -> Self {
        Self {
            root,
            public_key,
            private_key,
            remotes: RemoteSet::default(),
            pool_size: DEFAULT_POOL_SIZE,
            amount: DEFAULT_AMOUNT,
            delay: DEFAULT_CYCLE_DELAY,
            stats_window: DEFAULT_STATS_WINDOW,
            workers: DEFAULT_WORKERS,
            lock_dir: default_lock_dir(),
            status_port: DEFAULT_STATUS_PORT,
        }
    }

    /// Reads a YAML config file. The result is not validated yet.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlays `LEDGER_STRESS_*` environment variables onto the config.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(pool_size) = env::stress_pool_size() {
            debug!(pool_size, "pool size overridden from environment");
            self.pool_size = pool_size;
        }
        if let Some(secs) = env::stress_delay_secs() {
            debug!(secs, "cycle delay overridden from environment");
            self.delay = Duration::from_secs(secs);
        }
        if let Some(workers) = env::stress_workers() {
            self.workers = workers;
        }
        if let Some(window) = env::stress_stats_window() {
            self.stats_window = window;
        }
        if let Some(dir) = env::stress_lock_dir() {
            self.lock_dir = dir;
        }
        if let Some(port) = env::stress_status_port() {
            self.status_port = port;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_str().trim().is_empty() {
            return Err(ConfigError::Missing { field: "root" });
        }
        if self.public_key.as_str().trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "public_key",
            });
        }
        if self.private_key.expose().trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "private_key",
            });
        }
        if self.pool_size < MIN_POOL_SIZE {
            return Err(ConfigError::PoolTooSmall {
                pool_size: self.pool_size,
            });
        }
        if self.amount <= Amount::ZERO {
            return Err(ConfigError::NonPositiveAmount(self.amount));
        }
        if self.workers == 0 {
            return Err(ConfigError::Zero { field: "workers" });
        }
        if self.stats_window == 0 {
            return Err(ConfigError::Zero {
                field: "stats_window",
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    #[must_use]
    pub const fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = amount;
        self
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_remotes(mut self, remotes: RemoteSet) -> Self {
        self.remotes = remotes;
        self
    }

    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub const fn with_stats_window(mut self, stats_window: usize) -> Self {
        self.stats_window = stats_window;
        self
    }

    #[must_use]
    pub fn with_lock_dir(mut self, lock_dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = lock_dir.into();
        self
    }

    #[must_use]
    pub const fn with_status_port(mut self, status_port: u16) -> Self {
        self.status_port = status_port;
        self
    }
}
