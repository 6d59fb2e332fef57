use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
    time::Duration,
};

use stress_config::StressConfig;
use stress_core::{Amount, PrivateKey, PublicKey, StatsRecorder, StressError, WalletId};
use stress_runner_local::MemoryLedger;
use stress_workflows::{
    StressCycle, StressRunner, ThreadState,
    metrics::{ARRIVED, CYCLE, CYCLE_ERROR, PAID},
};

const ROOT: &str = "0000000000000000";

fn config(pool_size: usize) -> StressConfig {
    StressConfig::new(
        WalletId::from(ROOT),
        PublicKey::new("operator-pub"),
        PrivateKey::new("operator-priv"),
    )
    .with_pool_size(pool_size)
    .with_amount(Amount::from_units(1))
    .with_delay(Duration::from_secs(1))
}

/// Root plus `others` wallets, all holding `units` locally and remotely.
fn seeded(others: usize, units: i64) -> (Arc<MemoryLedger>, Vec<WalletId>) {
    let ledger = Arc::new(MemoryLedger::new());
    let ids: Vec<WalletId> = std::iter::once(WalletId::from(ROOT))
        .chain((0..others).map(|index| WalletId::new(format!("{index:016x}"))))
        .collect();
    for id in &ids {
        ledger.seed_wallet(id, Amount::from_units(units));
    }
    (ledger, ids)
}

fn cycle(ledger: &Arc<MemoryLedger>, config: StressConfig) -> anyhow::Result<StressCycle> {
    Ok(StressCycle::new(config, ledger.clone(), ledger.clone())?)
}

#[tokio::test]
async fn reload_converges_on_pool_size_from_both_sides() -> anyhow::Result<()> {
    let (small, _) = seeded(1, 50);
    let mut grow = cycle(&small, config(8))?;
    grow.reload().await?;
    assert_eq!(small.local_ids().len(), 8);

    let (large, _) = seeded(11, 50);
    let mut shrink = cycle(&large, config(8))?;
    shrink.reload().await?;
    assert_eq!(large.local_ids().len(), 8);
    assert!(large.local_ids().contains(&WalletId::from(ROOT)));
    Ok(())
}

#[tokio::test]
async fn reload_is_idempotent_on_a_funded_saturated_pool() -> anyhow::Result<()> {
    let (ledger, ids) = seeded(7, 50);
    let mut cycle = cycle(&ledger, config(8))?;

    cycle.reload().await?;
    cycle.reload().await?;

    assert_eq!(ledger.calls().create, 0);
    assert_eq!(ledger.calls().remove, 0);
    assert_eq!(ledger.local_ids(), ids.into_iter().collect::<BTreeSet<_>>());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn synthetic_arrival_resolves_the_pending_payment() -> anyhow::Result<()> {
    let (ledger, ids) = seeded(7, 50);
    // Keep the real credit off the network so only the synthetic one arrives.
    for id in &ids {
        ledger.fail_pushes_of(id);
    }
    let mut cycle = cycle(&ledger, config(8))?;

    cycle.pay().await?;
    assert_eq!(cycle.pending_payments(), 1);
    assert_eq!(cycle.stats().total("push-error"), 1);

    let (source, txn) = ids
        .iter()
        .filter_map(|id| ledger.local_wallet(id))
        .find_map(|wallet| {
            let txn = wallet.outgoing().next().cloned()?;
            Some((wallet.id, txn))
        })
        .ok_or_else(|| anyhow::anyhow!("no outgoing payment recorded"))?;
    tokio::time::advance(Duration::from_millis(2_500)).await;
    ledger.deliver(&txn.beneficiary, &source, txn.amount.abs(), &txn.details);

    cycle.refetch().await?;
    cycle.match_arrivals().await?;

    assert_eq!(cycle.pending_payments(), 0);
    let arrived = cycle.stats().samples(ARRIVED);
    assert_eq!(arrived.len(), 1);
    assert!((arrived[0].value - 2.5).abs() < 1e-6);
    Ok(())
}

#[tokio::test]
async fn failed_pull_counts_exactly_one_error() -> anyhow::Result<()> {
    let (ledger, ids) = seeded(7, 50);
    ledger.fail_pulls_of(&ids[3]);
    let mut cycle = cycle(&ledger, config(8))?;

    cycle.refetch().await?;

    assert_eq!(cycle.stats().total("pull-error"), 1);
    assert_eq!(cycle.stats().total("pull"), 7);
    Ok(())
}

#[tokio::test]
async fn failed_pull_does_not_abort_the_cycle() -> anyhow::Result<()> {
    let (ledger, ids) = seeded(7, 50);
    ledger.fail_pulls_of(&ids[3]);
    let mut cycle = cycle(&ledger, config(8))?;

    cycle.run_once().await?;

    let stats = cycle.stats();
    assert_eq!(stats.total(CYCLE), 1);
    assert_eq!(stats.total("pull-error"), 1);
    assert_eq!(stats.total(CYCLE_ERROR), 0);
    assert_eq!(stats.total(PAID), 1);
    Ok(())
}

#[tokio::test]
async fn lone_wallet_fails_fast_without_paying() -> anyhow::Result<()> {
    let (ledger, _) = seeded(0, 50);
    let mut cycle = cycle(&ledger, config(8))?;

    let err = cycle.pay().await.unwrap_err();

    assert!(matches!(err, StressError::TooFewWallets { available: 1, .. }));
    assert!(err.to_string().contains("too few wallets"));
    assert_eq!(ledger.calls().pay, 0);
    Ok(())
}

#[tokio::test]
async fn every_cycle_pays_once_and_sees_its_arrival() -> anyhow::Result<()> {
    let cycles: u64 = if stress_env::slow_test_env() { 300 } else { 12 };
    let (ledger, ids) = seeded(7, 1_000);
    let mut cycle = cycle(&ledger, config(8))?;

    for _ in 0..cycles {
        cycle.run_once().await?;
    }

    let stats = cycle.stats();
    assert_eq!(stats.total(CYCLE), cycles);
    assert_eq!(stats.total(PAID), cycles);
    assert_eq!(stats.total(ARRIVED), cycles);
    assert_eq!(cycle.pending_payments(), 0);

    let tokens: HashSet<String> = ids
        .iter()
        .filter_map(|id| ledger.remote_wallet(id))
        .flat_map(|wallet| {
            wallet
                .outgoing()
                .map(|txn| txn.details.clone())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(tokens.len() as u64, cycles);
    Ok(())
}

#[tokio::test]
async fn invalid_config_never_builds_a_cycle() {
    let (ledger, _) = seeded(0, 50);
    let result = StressCycle::new(config(1), ledger.clone(), ledger);

    assert!(matches!(result, Err(StressError::Config(message)) if message.contains("pool_size")));
}

#[tokio::test(start_paused = true)]
async fn runner_publishes_status_until_stopped() -> anyhow::Result<()> {
    let (ledger, _) = seeded(7, 50);
    ledger.fail_pays(true);
    let shared = Arc::new(StatsRecorder::new(64));
    let cycle = cycle(&ledger, config(8))?.with_stats(Arc::clone(&shared));
    let handle = StressRunner::spawn(cycle);

    while handle.stats().total(CYCLE) < 3 {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let json = serde_json::to_value(handle.status())?;
    assert_eq!(json["wallets"], 8);
    assert_eq!(json["waiting"], 0);
    assert!(json["thread"].is_string());
    assert!(json["pay-error"]["total"].as_u64() >= Some(3));
    assert_eq!(handle.stats().total(CYCLE_ERROR), 0);
    assert!(Arc::ptr_eq(handle.stats(), &shared));

    handle.stop();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!handle.is_running());
    assert_eq!(handle.status().thread, ThreadState::Stopped);
    Ok(())
}
