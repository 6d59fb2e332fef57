//! Collaborator contracts the stress workload drives.
//!
//! Wallet storage, key handling and the pull/push wire protocol live behind
//! these traits. The workload only needs a point-in-time view of a wallet and
//! a way to synchronise it with the network.

use std::{collections::BTreeSet, fmt};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::DynError,
    primitives::{Amount, PrivateKey, PublicKey, WalletId},
};

/// One transaction line of a wallet. Negative amounts leave the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Txn {
    pub id: u64,
    pub amount: Amount,
    pub beneficiary: WalletId,
    pub details: String,
}

impl Txn {
    #[must_use]
    pub const fn is_outgoing(&self) -> bool {
        self.amount.is_negative()
    }

    #[must_use]
    pub const fn is_incoming(&self) -> bool {
        !self.is_outgoing()
    }
}

/// Snapshot of a locally stored wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub txns: Vec<Txn>,
}

impl Wallet {
    #[must_use]
    pub fn balance(&self) -> Amount {
        self.txns.iter().map(|txn| txn.amount).sum()
    }

    pub fn outgoing(&self) -> impl Iterator<Item = &Txn> {
        self.txns.iter().filter(|txn| txn.is_outgoing())
    }

    pub fn incoming(&self) -> impl Iterator<Item = &Txn> {
        self.txns.iter().filter(|txn| txn.is_incoming())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub source: WalletId,
    pub target: WalletId,
    pub amount: Amount,
    /// Free-form details; the workload stores its correlation token here.
    pub details: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Remote {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Network peers handed through to pull/push/pay untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteSet(Vec<Remote>);

impl RemoteSet {
    #[must_use]
    pub const fn new(remotes: Vec<Remote>) -> Self {
        Self(remotes)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Remote> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Local wallet storage.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn all(&self) -> Result<BTreeSet<WalletId>, DynError>;

    /// Returns `None` when the wallet is not stored locally.
    async fn find(&self, id: &WalletId) -> Result<Option<Wallet>, DynError>;

    async fn create(&self, owner: &PublicKey, remotes: &RemoteSet) -> Result<WalletId, DynError>;

    async fn remove(&self, id: &WalletId) -> Result<(), DynError>;

    async fn balance(&self, id: &WalletId) -> Result<Option<Amount>, DynError> {
        Ok(self.find(id).await?.map(|wallet| wallet.balance()))
    }
}

/// Synchronisation of local wallets with remote nodes.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetches the remote copy of `id` and merges it into the local store.
    async fn pull(&self, id: &WalletId, remotes: &RemoteSet) -> Result<(), DynError>;

    /// Publishes the local copy of `id` to the network.
    async fn push(&self, id: &WalletId, remotes: &RemoteSet) -> Result<(), DynError>;

    async fn pay(
        &self,
        payment: &Payment,
        remotes: &RemoteSet,
        key: &PrivateKey,
    ) -> Result<(), DynError>;
}
