use std::sync::Arc;

use stress_config::StressConfig;
use stress_core::{Amount, PrivateKey, PublicKey, WalletId};
use stress_runner_local::MemoryLedger;

use super::StressCycle;

pub const ROOT: &str = "root";

pub fn config(pool_size: usize) -> StressConfig {
    StressConfig::new(
        WalletId::from(ROOT),
        PublicKey::new("operator-pub"),
        PrivateKey::new("operator-priv"),
    )
    .with_pool_size(pool_size)
    .with_amount(Amount::from_units(1))
}

pub fn cycle(ledger: &Arc<MemoryLedger>, pool_size: usize) -> StressCycle {
    StressCycle::new(config(pool_size), ledger.clone(), ledger.clone()).unwrap()
}

/// Seeds the root plus `others` wallets, each holding `units`.
pub fn funded_ledger(others: usize, units: i64) -> Arc<MemoryLedger> {
    let ledger = Arc::new(MemoryLedger::new());
    ledger.seed_wallet(&WalletId::from(ROOT), Amount::from_units(units));
    for index in 0..others {
        ledger.seed_wallet(
            &WalletId::new(format!("w{index}")),
            Amount::from_units(units),
        );
    }
    ledger
}
