use std::collections::{BTreeMap, BTreeSet, HashSet};

use stress_core::{Amount, Txn, Wallet, WalletId};

use super::MemoryLedgerError;

/// Number of calls each collaborator operation has received.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create: usize,
    pub remove: usize,
    pub pull: usize,
    pub push: usize,
    pub pay: usize,
}

#[derive(Default)]
pub(crate) struct LedgerState {
    /// Authoritative copies as the network sees them.
    pub(crate) remote: BTreeMap<WalletId, Vec<Txn>>,
    /// Copies held by the local wallet store.
    pub(crate) local: BTreeMap<WalletId, Vec<Txn>>,
    /// Outgoing `(source, txn id)` pairs already credited to their beneficiary.
    pub(crate) credited: HashSet<(WalletId, u64)>,
    pub(crate) failing_pulls: HashSet<WalletId>,
    pub(crate) failing_pushes: HashSet<WalletId>,
    pub(crate) failing_pays: bool,
    pub(crate) calls: CallCounts,
    next_txn: u64,
}

impl LedgerState {
    pub(crate) fn next_txn_id(&mut self) -> u64 {
        self.next_txn += 1;
        self.next_txn
    }

    pub(crate) fn fresh_wallet_id(&self) -> WalletId {
        loop {
            let id = WalletId::new(format!("{:016x}", rand::random::<u64>()));
            if !self.remote.contains_key(&id) && !self.local.contains_key(&id) {
                return id;
            }
        }
    }

    pub(crate) fn local_ids(&self) -> BTreeSet<WalletId> {
        self.local.keys().cloned().collect()
    }

    pub(crate) fn local_wallet(&self, id: &WalletId) -> Option<Wallet> {
        self.local.get(id).map(|txns| Wallet {
            id: id.clone(),
            txns: txns.clone(),
        })
    }

    pub(crate) fn remote_wallet(&self, id: &WalletId) -> Option<Wallet> {
        self.remote.get(id).map(|txns| Wallet {
            id: id.clone(),
            txns: txns.clone(),
        })
    }

    /// Appends an incoming transaction to the remote copy of `target`.
    pub(crate) fn credit_remote(
        &mut self,
        target: &WalletId,
        from: &WalletId,
        amount: Amount,
        details: &str,
    ) {
        let id = self.next_txn_id();
        self.remote.entry(target.clone()).or_default().push(Txn {
            id,
            amount,
            beneficiary: from.clone(),
            details: details.to_owned(),
        });
    }

    pub(crate) fn pull(&mut self, id: &WalletId) -> Result<(), MemoryLedgerError> {
        let remote = self
            .remote
            .get(id)
            .ok_or_else(|| MemoryLedgerError::UnknownRemote { id: id.clone() })?
            .clone();
        merge_txns(self.local.entry(id.clone()).or_default(), &remote);
        Ok(())
    }

    /// Publishes the local copy and credits beneficiaries of newly seen
    /// outgoing transactions.
    pub(crate) fn push(&mut self, id: &WalletId) -> Result<(), MemoryLedgerError> {
        let local = self
            .local
            .get(id)
            .ok_or_else(|| MemoryLedgerError::UnknownLocal { id: id.clone() })?
            .clone();
        merge_txns(self.remote.entry(id.clone()).or_default(), &local);

        for txn in local.iter().filter(|txn| txn.is_outgoing()) {
            if self.credited.insert((id.clone(), txn.id)) {
                self.credit_remote(&txn.beneficiary, id, txn.amount.abs(), &txn.details);
            }
        }
        Ok(())
    }

    pub(crate) fn debit_local(
        &mut self,
        source: &WalletId,
        target: &WalletId,
        amount: Amount,
        details: &str,
    ) -> Result<(), MemoryLedgerError> {
        let balance = self
            .local_wallet(source)
            .ok_or_else(|| MemoryLedgerError::UnknownLocal { id: source.clone() })?
            .balance();
        if balance < amount {
            return Err(MemoryLedgerError::InsufficientFunds {
                id: source.clone(),
                balance,
                amount,
            });
        }

        let id = self.next_txn_id();
        self.local.entry(source.clone()).or_default().push(Txn {
            id,
            amount: -amount,
            beneficiary: target.clone(),
            details: details.to_owned(),
        });
        Ok(())
    }
}

/// Adds every transaction of `from` that `into` does not hold yet.
fn merge_txns(into: &mut Vec<Txn>, from: &[Txn]) {
    let known: HashSet<u64> = into.iter().map(|txn| txn.id).collect();
    into.extend(from.iter().filter(|txn| !known.contains(&txn.id)).cloned());
}
