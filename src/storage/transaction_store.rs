//! In-memory index of every transaction the wallet knows about
//!
//! Transactions are partitioned by lifecycle state. All four partitions sit
//! behind a single mutex, so a transaction id is observed in at most one of
//! them and listers always see either the pre- or the post-mutation state.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::data_structures::{
    Balance, CompletedTransaction, PendingInboundTransaction, PendingOutboundTransaction,
    Transaction, TransactionDirection, TransactionKind, TxId,
};
use crate::errors::{WalletError, WalletResult};

/// The four lifecycle partitions plus the chain tip used for timelock checks
#[derive(Debug, Default)]
pub struct Partitions {
    pending_inbound: HashMap<TxId, PendingInboundTransaction>,
    pending_outbound: HashMap<TxId, PendingOutboundTransaction>,
    completed: HashMap<TxId, CompletedTransaction>,
    cancelled: HashMap<TxId, CompletedTransaction>,
    chain_tip: u64,
    balance_version: u64,
}

impl Partitions {
    /// Partition currently holding `tx_id`, if any
    pub fn locate(&self, tx_id: TxId) -> Option<TransactionKind> {
        if self.pending_inbound.contains_key(&tx_id) {
            Some(TransactionKind::PendingInbound)
        } else if self.pending_outbound.contains_key(&tx_id) {
            Some(TransactionKind::PendingOutbound)
        } else if self.completed.contains_key(&tx_id) {
            Some(TransactionKind::Completed)
        } else if self.cancelled.contains_key(&tx_id) {
            Some(TransactionKind::Cancelled)
        } else {
            None
        }
    }

    pub fn lookup(&self, tx_id: TxId, kind: TransactionKind) -> WalletResult<Transaction> {
        let found = match kind {
            TransactionKind::PendingInbound => self
                .pending_inbound
                .get(&tx_id)
                .cloned()
                .map(Transaction::PendingInbound),
            TransactionKind::PendingOutbound => self
                .pending_outbound
                .get(&tx_id)
                .cloned()
                .map(Transaction::PendingOutbound),
            TransactionKind::Completed => self
                .completed
                .get(&tx_id)
                .cloned()
                .map(Transaction::Completed),
            TransactionKind::Cancelled => self
                .cancelled
                .get(&tx_id)
                .cloned()
                .map(Transaction::Completed),
        };
        found.ok_or_else(|| WalletError::NotFound(format!("{kind} transaction {tx_id}")))
    }

    pub fn list(&self, kind: TransactionKind) -> Vec<Transaction> {
        match kind {
            TransactionKind::PendingInbound => self
                .pending_inbound
                .values()
                .cloned()
                .map(Transaction::PendingInbound)
                .collect(),
            TransactionKind::PendingOutbound => self
                .pending_outbound
                .values()
                .cloned()
                .map(Transaction::PendingOutbound)
                .collect(),
            TransactionKind::Completed => self
                .completed
                .values()
                .cloned()
                .map(Transaction::Completed)
                .collect(),
            TransactionKind::Cancelled => self
                .cancelled
                .values()
                .cloned()
                .map(Transaction::Completed)
                .collect(),
        }
    }

    /// Insert a new transaction; the id must not exist in any partition
    pub fn insert(&mut self, kind: TransactionKind, tx: Transaction) -> WalletResult<()> {
        let tx_id = tx.tx_id();
        if let Some(existing) = self.locate(tx_id) {
            return Err(WalletError::invalid_state(
                tx_id,
                format!("already present in {existing}"),
            ));
        }
        self.put(kind, tx)
    }

    pub fn remove(&mut self, tx_id: TxId, kind: TransactionKind) -> WalletResult<Transaction> {
        let removed = match kind {
            TransactionKind::PendingInbound => self
                .pending_inbound
                .remove(&tx_id)
                .map(Transaction::PendingInbound),
            TransactionKind::PendingOutbound => self
                .pending_outbound
                .remove(&tx_id)
                .map(Transaction::PendingOutbound),
            TransactionKind::Completed => self.completed.remove(&tx_id).map(Transaction::Completed),
            TransactionKind::Cancelled => self.cancelled.remove(&tx_id).map(Transaction::Completed),
        };
        removed.ok_or_else(|| WalletError::NotFound(format!("{kind} transaction {tx_id}")))
    }

    /// Move `tx_id` between partitions, reshaping it with `transform` on the way
    ///
    /// Fails with `InvalidState` if the id is not in `from`. If `transform`
    /// fails, or yields a record that does not fit `to`, nothing changes.
    pub fn move_transaction<F>(
        &mut self,
        tx_id: TxId,
        from: TransactionKind,
        to: TransactionKind,
        transform: F,
    ) -> WalletResult<Transaction>
    where
        F: FnOnce(Transaction) -> WalletResult<Transaction>,
    {
        let current = self.lookup(tx_id, from).map_err(|_| {
            WalletError::invalid_state(tx_id, format!("not present in {from}"))
        })?;
        let moved = transform(current)?;
        if moved.tx_id() != tx_id || !moved.fits(to) {
            return Err(WalletError::Internal(format!(
                "transaction {tx_id} cannot be stored as {to}"
            )));
        }
        self.remove(tx_id, from)?;
        self.put(to, moved.clone())?;
        debug!(tx_id = %tx_id, %from, %to, "Moved transaction");
        Ok(moved)
    }

    pub fn completed_mut(&mut self, tx_id: TxId) -> Option<&mut CompletedTransaction> {
        self.completed.get_mut(&tx_id)
    }

    pub fn completed(&self) -> impl Iterator<Item = &CompletedTransaction> {
        self.completed.values()
    }

    pub fn chain_tip(&self) -> u64 {
        self.chain_tip
    }

    pub fn set_chain_tip(&mut self, height: u64) {
        self.chain_tip = height;
    }

    /// Recompute the aggregate balance and stamp it with a fresh version
    pub fn next_balance(&mut self) -> (Balance, u64) {
        self.balance_version += 1;
        (self.balance(), self.balance_version)
    }

    /// Aggregate balance derived from every non-cancelled transaction
    ///
    /// Outbound value (amount plus fee) leaves `available` as soon as it is
    /// committed to a send, and stays in `pending_outgoing` until confirmed.
    /// Inbound value only becomes available once confirmed and past its lock height.
    pub fn balance(&self) -> Balance {
        let mut credited: u64 = 0;
        let mut debited: u64 = 0;
        let mut balance = Balance::default();

        for tx in self.pending_inbound.values() {
            balance.pending_incoming = balance.pending_incoming.saturating_add(tx.amount);
        }
        for tx in self.pending_outbound.values() {
            let spent = tx.amount.saturating_add(tx.fee);
            debited = debited.saturating_add(spent);
            balance.pending_outgoing = balance.pending_outgoing.saturating_add(spent);
        }
        for tx in self.completed.values() {
            let confirmed = tx.status.is_confirmed();
            let receives = tx.direction == TransactionDirection::Inbound || tx.is_self_payment();
            if tx.direction == TransactionDirection::Outbound {
                let spent = tx.amount.saturating_add(tx.fee);
                debited = debited.saturating_add(spent);
                if !confirmed {
                    balance.pending_outgoing = balance.pending_outgoing.saturating_add(spent);
                }
            }
            if receives {
                if !confirmed {
                    balance.pending_incoming = balance.pending_incoming.saturating_add(tx.amount);
                } else if tx.lock_height > self.chain_tip {
                    balance.timelocked = balance.timelocked.saturating_add(tx.amount);
                } else {
                    credited = credited.saturating_add(tx.amount);
                }
            }
        }
        balance.available = credited.saturating_sub(debited);
        balance
    }

    fn put(&mut self, kind: TransactionKind, tx: Transaction) -> WalletResult<()> {
        let tx_id = tx.tx_id();
        let misfit = || WalletError::Internal(format!("transaction {tx_id} cannot be stored as {kind}"));
        if !tx.fits(kind) {
            return Err(misfit());
        }
        match (kind, tx) {
            (TransactionKind::PendingInbound, Transaction::PendingInbound(tx)) => {
                self.pending_inbound.insert(tx_id, tx);
            }
            (TransactionKind::PendingOutbound, Transaction::PendingOutbound(tx)) => {
                self.pending_outbound.insert(tx_id, tx);
            }
            (TransactionKind::Completed, Transaction::Completed(tx)) => {
                self.completed.insert(tx_id, tx);
            }
            (TransactionKind::Cancelled, Transaction::Completed(tx)) => {
                self.cancelled.insert(tx_id, tx);
            }
            _ => return Err(misfit()),
        }
        Ok(())
    }
}

/// Thread-safe wrapper serialising every mutation through one lock
#[derive(Debug, Default)]
pub struct TransactionStore {
    inner: Mutex<Partitions>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the store lock for a multi-step transition
    pub fn lock(&self) -> MutexGuard<'_, Partitions> {
        // A panicking writer cannot leave a half-moved transaction behind, so
        // the data is still consistent after poisoning
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn lookup(&self, tx_id: TxId, kind: TransactionKind) -> WalletResult<Transaction> {
        self.lock().lookup(tx_id, kind)
    }

    /// Snapshot of one partition
    pub fn list(&self, kind: TransactionKind) -> Vec<Transaction> {
        self.lock().list(kind)
    }

    pub fn insert(&self, kind: TransactionKind, tx: Transaction) -> WalletResult<()> {
        self.lock().insert(kind, tx)
    }

    pub fn move_transaction<F>(
        &self,
        tx_id: TxId,
        from: TransactionKind,
        to: TransactionKind,
        transform: F,
    ) -> WalletResult<Transaction>
    where
        F: FnOnce(Transaction) -> WalletResult<Transaction>,
    {
        self.lock().move_transaction(tx_id, from, to, transform)
    }

    pub fn remove(&self, tx_id: TxId, kind: TransactionKind) -> WalletResult<Transaction> {
        self.lock().remove(tx_id, kind)
    }

    pub fn locate(&self, tx_id: TxId) -> Option<TransactionKind> {
        self.lock().locate(tx_id)
    }

    pub fn balance(&self) -> Balance {
        self.lock().balance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{CancellationReason, PrivateKey, PublicKey, TransactionStatus};

    fn key() -> PublicKey {
        PrivateKey::random().public_key()
    }

    fn inbound(id: u64, amount: u64) -> Transaction {
        Transaction::PendingInbound(PendingInboundTransaction::new(
            TxId::new(id),
            key(),
            amount,
            "in".into(),
        ))
    }

    fn outbound(id: u64, amount: u64, fee: u64) -> Transaction {
        Transaction::PendingOutbound(PendingOutboundTransaction::new(
            TxId::new(id),
            key(),
            amount,
            fee,
            "out".into(),
        ))
    }

    #[test]
    fn test_insert_lookup_and_list() {
        let store = TransactionStore::new();
        store
            .insert(TransactionKind::PendingInbound, inbound(1, 100))
            .unwrap();
        store
            .insert(TransactionKind::PendingOutbound, outbound(2, 50, 5))
            .unwrap();

        assert_eq!(
            store
                .lookup(TxId::new(1), TransactionKind::PendingInbound)
                .unwrap()
                .amount(),
            100
        );
        assert!(matches!(
            store.lookup(TxId::new(1), TransactionKind::Completed),
            Err(WalletError::NotFound(_))
        ));
        assert_eq!(store.list(TransactionKind::PendingInbound).len(), 1);
        assert_eq!(store.list(TransactionKind::PendingOutbound).len(), 1);
        assert!(store.list(TransactionKind::Cancelled).is_empty());
    }

    #[test]
    fn test_insert_rejects_id_present_in_other_partition() {
        let store = TransactionStore::new();
        store
            .insert(TransactionKind::PendingInbound, inbound(7, 1))
            .unwrap();
        let err = store
            .insert(TransactionKind::PendingOutbound, outbound(7, 1, 1))
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidState { .. }));
        assert_eq!(store.locate(TxId::new(7)), Some(TransactionKind::PendingInbound));
    }

    #[test]
    fn test_insert_rejects_wrong_shape() {
        let store = TransactionStore::new();
        assert!(store
            .insert(TransactionKind::Completed, inbound(3, 1))
            .is_err());
        assert_eq!(store.locate(TxId::new(3)), None);
    }

    #[test]
    fn test_move_requires_source_partition() {
        let store = TransactionStore::new();
        let err = store
            .move_transaction(
                TxId::new(9),
                TransactionKind::PendingOutbound,
                TransactionKind::Completed,
                Ok,
            )
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidState { .. }));
    }

    #[test]
    fn test_move_is_all_or_nothing() {
        let store = TransactionStore::new();
        store
            .insert(TransactionKind::PendingOutbound, outbound(4, 10, 1))
            .unwrap();

        // transform failure leaves the record where it was
        let result = store.move_transaction(
            TxId::new(4),
            TransactionKind::PendingOutbound,
            TransactionKind::Completed,
            |_| Err(WalletError::Internal("boom".into())),
        );
        assert!(result.is_err());
        assert_eq!(
            store.locate(TxId::new(4)),
            Some(TransactionKind::PendingOutbound)
        );

        let own = key();
        let moved = store
            .move_transaction(
                TxId::new(4),
                TransactionKind::PendingOutbound,
                TransactionKind::Completed,
                |tx| match tx {
                    Transaction::PendingOutbound(p) => Ok(Transaction::Completed(
                        CompletedTransaction::from_pending_outbound(p, own),
                    )),
                    other => Ok(other),
                },
            )
            .unwrap();
        assert_eq!(moved.status(), TransactionStatus::Completed);
        assert_eq!(store.locate(TxId::new(4)), Some(TransactionKind::Completed));
    }

    #[test]
    fn test_balance_tracks_partitions() {
        let store = TransactionStore::new();
        let own = key();
        let mut partitions = store.lock();

        let mut funded = CompletedTransaction::from_pending_inbound(
            PendingInboundTransaction::new(TxId::new(1), key(), 1_000, "funds".into()),
            own,
        );
        funded.status = TransactionStatus::FauxConfirmed;
        partitions
            .insert(TransactionKind::Completed, Transaction::Completed(funded))
            .unwrap();
        partitions
            .insert(TransactionKind::PendingInbound, inbound(2, 300))
            .unwrap();
        partitions
            .insert(TransactionKind::PendingOutbound, outbound(3, 200, 10))
            .unwrap();

        let balance = partitions.balance();
        assert_eq!(balance.available, 790);
        assert_eq!(balance.pending_incoming, 300);
        assert_eq!(balance.pending_outgoing, 210);
        assert_eq!(balance.timelocked, 0);

        let cancelled = partitions
            .move_transaction(
                TxId::new(3),
                TransactionKind::PendingOutbound,
                TransactionKind::Cancelled,
                |tx| match tx {
                    Transaction::PendingOutbound(p) => {
                        let mut c = CompletedTransaction::from_pending_outbound(p, own);
                        c.cancellation_reason = Some(CancellationReason::UserCancelled);
                        Ok(Transaction::Completed(c))
                    }
                    other => Ok(other),
                },
            )
            .unwrap();
        assert_eq!(cancelled.tx_id(), TxId::new(3));
        assert_eq!(partitions.balance().available, 1_000);
    }

    #[test]
    fn test_timelocked_until_chain_tip_passes_lock_height() {
        let store = TransactionStore::new();
        let own = key();
        let mut partitions = store.lock();
        let mut locked = CompletedTransaction::from_pending_inbound(
            PendingInboundTransaction::new(TxId::new(1), key(), 500, "locked".into()),
            own,
        );
        locked.status = TransactionStatus::MinedConfirmed;
        locked.lock_height = 100;
        partitions
            .insert(TransactionKind::Completed, Transaction::Completed(locked))
            .unwrap();

        assert_eq!(partitions.balance().timelocked, 500);
        assert_eq!(partitions.balance().available, 0);
        partitions.set_chain_tip(100);
        assert_eq!(partitions.balance().timelocked, 0);
        assert_eq!(partitions.balance().available, 500);
    }

    #[test]
    fn test_balance_versions_increase() {
        let store = TransactionStore::new();
        let mut partitions = store.lock();
        let (_, first) = partitions.next_balance();
        let (_, second) = partitions.next_balance();
        assert!(second > first);
    }
}
