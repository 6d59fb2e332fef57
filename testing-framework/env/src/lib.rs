use std::{env, path::PathBuf};

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[must_use]
pub fn slow_test_env() -> bool {
    env::var("SLOW_TEST_ENV").is_ok_and(|s| s == "true")
}

#[must_use]
pub fn stress_config_path() -> Option<PathBuf> {
    env::var("LEDGER_STRESS_CONFIG").ok().map(PathBuf::from)
}

#[must_use]
pub fn stress_pool_size() -> Option<usize> {
    parsed("LEDGER_STRESS_POOL_SIZE")
}

#[must_use]
pub fn stress_delay_secs() -> Option<u64> {
    parsed("LEDGER_STRESS_DELAY_SECS")
}

#[must_use]
pub fn stress_workers() -> Option<usize> {
    parsed("LEDGER_STRESS_WORKERS")
}

#[must_use]
pub fn stress_stats_window() -> Option<usize> {
    parsed("LEDGER_STRESS_STATS_WINDOW")
}

#[must_use]
pub fn stress_lock_dir() -> Option<PathBuf> {
    env::var("LEDGER_STRESS_LOCK_DIR").ok().map(PathBuf::from)
}

#[must_use]
pub fn stress_status_port() -> Option<u16> {
    parsed("LEDGER_STRESS_STATUS_PORT")
}

#[must_use]
pub fn stress_log_filter() -> Option<String> {
    env::var("LEDGER_STRESS_LOG").ok()
}

#[must_use]
pub fn rust_log() -> Option<String> {
    env::var("RUST_LOG").ok()
}
