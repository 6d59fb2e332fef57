use std::{
    collections::BTreeSet,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use stress_core::{
    Amount, DynError, Network, Payment, PrivateKey, PublicKey, RemoteSet, Wallet, WalletId,
    WalletStore,
};
use thiserror::Error;
use tracing::debug;

mod state;

pub use state::CallCounts;
use state::LedgerState;

/// Payer recorded on the funding transactions of seeded wallets.
pub const GENESIS: &str = "genesis";

#[derive(Debug, Error)]
pub enum MemoryLedgerError {
    #[error("wallet {id} is not known to the network")]
    UnknownRemote { id: WalletId },
    #[error("wallet {id} is not in the local store")]
    UnknownLocal { id: WalletId },
    #[error("wallet {id} holds {balance}, cannot send {amount}")]
    InsufficientFunds {
        id: WalletId,
        balance: Amount,
        amount: Amount,
    },
    #[error("{op} of wallet {id} refused by injected fault")]
    Injected { op: &'static str, id: WalletId },
}

/// In-process ledger that plays both the local wallet store and the remote
/// network.
///
/// Payments debit the sender's local copy; the beneficiary is credited on the
/// network only once the sender is pushed, so arrivals become visible after a
/// pull, the way they would against real nodes.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Funds `id` on the network only; it shows up locally after a pull.
    pub fn fund_remote(&self, id: &WalletId, amount: Amount) {
        self.state()
            .credit_remote(id, &WalletId::from(GENESIS), amount, "");
    }

    /// Funds `id` on the network and mirrors it into the local store.
    pub fn seed_wallet(&self, id: &WalletId, amount: Amount) {
        let mut state = self.state();
        state.credit_remote(id, &WalletId::from(GENESIS), amount, "");
        if let Err(err) = state.pull(id) {
            debug!(%err, "seeded wallet could not be mirrored locally");
        }
    }

    /// Adds an incoming transaction to the network copy of `target`.
    pub fn deliver(&self, target: &WalletId, from: &WalletId, amount: Amount, details: &str) {
        self.state().credit_remote(target, from, amount, details);
    }

    /// Adds a wallet to the local store behind the workload's back.
    pub fn inject_local(&self, id: &WalletId) {
        self.state().local.entry(id.clone()).or_default();
    }

    pub fn fail_pulls_of(&self, id: &WalletId) {
        self.state().failing_pulls.insert(id.clone());
    }

    pub fn fail_pushes_of(&self, id: &WalletId) {
        self.state().failing_pushes.insert(id.clone());
    }

    pub fn fail_pays(&self, failing: bool) {
        self.state().failing_pays = failing;
    }

    pub fn heal(&self) {
        let mut state = self.state();
        state.failing_pulls.clear();
        state.failing_pushes.clear();
        state.failing_pays = false;
    }

    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.state().calls
    }

    #[must_use]
    pub fn local_wallet(&self, id: &WalletId) -> Option<Wallet> {
        self.state().local_wallet(id)
    }

    #[must_use]
    pub fn remote_wallet(&self, id: &WalletId) -> Option<Wallet> {
        self.state().remote_wallet(id)
    }

    #[must_use]
    pub fn local_ids(&self) -> BTreeSet<WalletId> {
        self.state().local_ids()
    }
}

#[async_trait]
impl WalletStore for MemoryLedger {
    async fn all(&self) -> Result<BTreeSet<WalletId>, DynError> {
        Ok(self.state().local_ids())
    }

    async fn find(&self, id: &WalletId) -> Result<Option<Wallet>, DynError> {
        Ok(self.state().local_wallet(id))
    }

    async fn create(&self, owner: &PublicKey, _remotes: &RemoteSet) -> Result<WalletId, DynError> {
        let mut state = self.state();
        state.calls.create += 1;
        let id = state.fresh_wallet_id();
        state.local.insert(id.clone(), Vec::new());
        state.remote.insert(id.clone(), Vec::new());
        debug!(wallet = %id, owner = owner.as_str(), "memory ledger created wallet");
        Ok(id)
    }

    async fn remove(&self, id: &WalletId) -> Result<(), DynError> {
        let mut state = self.state();
        state.calls.remove += 1;
        state.local.remove(id);
        Ok(())
    }
}

#[async_trait]
impl Network for MemoryLedger {
    async fn pull(&self, id: &WalletId, _remotes: &RemoteSet) -> Result<(), DynError> {
        let mut state = self.state();
        state.calls.pull += 1;
        if state.failing_pulls.contains(id) {
            return Err(Box::new(MemoryLedgerError::Injected {
                op: "pull",
                id: id.clone(),
            }));
        }
        state.pull(id).map_err(Into::into)
    }

    async fn push(&self, id: &WalletId, _remotes: &RemoteSet) -> Result<(), DynError> {
        let mut state = self.state();
        state.calls.push += 1;
        if state.failing_pushes.contains(id) {
            return Err(Box::new(MemoryLedgerError::Injected {
                op: "push",
                id: id.clone(),
            }));
        }
        state.push(id).map_err(Into::into)
    }

    async fn pay(
        &self,
        payment: &Payment,
        _remotes: &RemoteSet,
        _key: &PrivateKey,
    ) -> Result<(), DynError> {
        let mut state = self.state();
        state.calls.pay += 1;
        if state.failing_pays {
            return Err(Box::new(MemoryLedgerError::Injected {
                op: "pay",
                id: payment.source.clone(),
            }));
        }
        state
            .debit_local(
                &payment.source,
                &payment.target,
                payment.amount,
                &payment.details,
            )
            .map_err(Into::into)
    }
}
