use std::{io::Write as _, time::Duration};

use serial_test::serial;
use stress_config::{ConfigError, StressConfig};

const OVERRIDES: [&str; 3] = [
    "LEDGER_STRESS_POOL_SIZE",
    "LEDGER_STRESS_DELAY_SECS",
    "LEDGER_STRESS_WORKERS",
];

fn write_config(contents: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

fn clear_overrides() {
    for key in OVERRIDES {
        // SAFETY: tests touching the environment run serially.
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
#[serial]
fn environment_overrides_file_values() -> anyhow::Result<()> {
    let file = write_config(
        "root: \"0000000000000000\"\n\
         public_key: pub\n\
         private_key: priv\n\
         pool_size: 4\n\
         delay: 30\n",
    )?;
    // SAFETY: tests touching the environment run serially.
    unsafe {
        std::env::set_var("LEDGER_STRESS_POOL_SIZE", "6");
        std::env::set_var("LEDGER_STRESS_DELAY_SECS", "2");
        std::env::set_var("LEDGER_STRESS_WORKERS", "not-a-number");
    }

    let config = StressConfig::load_from_file(file.path())?.with_env_overrides();
    clear_overrides();

    assert_eq!(config.pool_size, 6);
    assert_eq!(config.delay, Duration::from_secs(2));
    assert_eq!(config.workers, stress_config::constants::DEFAULT_WORKERS);
    config.validate()?;
    Ok(())
}

#[test]
#[serial]
fn override_below_minimum_fails_validation() -> anyhow::Result<()> {
    let file = write_config("root: r\npublic_key: pub\nprivate_key: priv\n")?;
    // SAFETY: tests touching the environment run serially.
    unsafe { std::env::set_var("LEDGER_STRESS_POOL_SIZE", "1") };

    let config = StressConfig::load_from_file(file.path())?.with_env_overrides();
    clear_overrides();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::PoolTooSmall { pool_size: 1 })
    ));
    Ok(())
}

#[test]
fn missing_file_is_a_read_error() {
    let result = StressConfig::load_from_file(std::path::Path::new("/nonexistent/stress.yaml"));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}
