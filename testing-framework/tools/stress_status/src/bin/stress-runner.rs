use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use stress_config::StressConfig;
use stress_core::{Amount, SingleFlightGuard, WalletId};
use stress_runner_local::MemoryLedger;
use stress_status::{AppState, status_app};
use stress_workflows::{StressCycle, StressRunner};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(about = "Runs the ledger stress loop against an in-memory ledger")]
struct Args {
    /// YAML stress config. Falls back to `LEDGER_STRESS_CONFIG`.
    config: Option<PathBuf>,
    /// Overrides the configured status port.
    #[arg(long)]
    port: Option<u16>,
    /// Units seeded into every initial pool wallet.
    #[arg(long, default_value_t = 1_000)]
    seed_units: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Args::parse();

    let path = cli
        .config
        .or_else(stress_env::stress_config_path)
        .context("no config file given and LEDGER_STRESS_CONFIG is not set")?;
    let mut config = StressConfig::load_from_file(&path)
        .with_context(|| format!("failed to load stress config from {}", path.display()))?
        .with_env_overrides();
    if let Some(port) = cli.port {
        config = config.with_status_port(port);
    }
    config.validate().context("invalid stress config")?;

    let ledger = Arc::new(MemoryLedger::new());
    seed_ledger(&ledger, &config, Amount::from_units(cli.seed_units));

    let guard = SingleFlightGuard::new(config.lock_dir.clone(), config.workers)
        .context("failed to prepare the lock directory")?;
    let port = config.status_port;
    let remotes = config.remotes.clone();
    let cycle = StressCycle::new(config, ledger.clone(), ledger.clone())
        .context("failed to build the stress cycle")?;
    let handle = StressRunner::spawn(cycle);
    let app = status_app(AppState::new(handle.monitor(), guard, ledger, remotes));

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind status endpoint on 0.0.0.0:{port}"))?;
    info!(port, "status endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("status endpoint terminated unexpectedly")?;

    handle.stop();
    Ok(())
}

fn init_tracing() {
    let filter = stress_env::stress_log_filter()
        .or_else(stress_env::rust_log)
        .map_or_else(|| EnvFilter::new("info"), EnvFilter::new);
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

/// Funds the root and enough extra wallets to fill the pool.
fn seed_ledger(ledger: &MemoryLedger, config: &StressConfig, funds: Amount) {
    ledger.seed_wallet(&config.root, funds);
    for index in 1..config.pool_size {
        ledger.seed_wallet(&WalletId::new(format!("seed-{index:04}")), funds);
    }
    info!(
        wallets = config.pool_size,
        %funds,
        "seeded in-memory ledger"
    );
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}
