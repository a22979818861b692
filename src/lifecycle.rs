//! Transaction lifecycle state machine
//!
//! ```text
//!  send ──► PendingOutbound ──reply/finalize──┐
//!                                             ▼
//!  received ► PendingInbound ──finalize──► Completed{Broadcast}
//!                                             │ mined_unconfirmed(n), faux_unconfirmed(n)
//!                                             ▼
//!                              Completed{MinedConfirmed | FauxConfirmed}
//!
//!  import_utxo / recovered output ─────► Completed{FauxConfirmed}
//!  coin_split / one-sided send ────────► Completed{Broadcast}
//!  cancel (pending only), network cancellation (any) ──► Cancelled{reason}
//! ```
//!
//! Every transition runs under the transaction store lock and publishes its
//! notification (plus a fresh balance) before the lock is released, so the
//! dispatcher sees events for one transaction in the order they were applied.
//! Calls into [`WalletConnectivity`] always happen after the lock is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::data_structures::{
    CancellationReason, CommitmentSignature, CompletedTransaction, OutputFeatures,
    PendingInboundTransaction, PendingOutboundTransaction, PrivateKey, PublicKey, RequestId,
    Transaction, TransactionDirection, TransactionKind, TransactionStatus, TxId,
};
use crate::errors::{WalletError, WalletResult};
use crate::events::{EventDispatcher, WalletEvent};
use crate::network::WalletConnectivity;
use crate::storage::{Partitions, TransactionStore};

/// Transaction weight model used for fee estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeModel {
    pub kernel_weight: u64,
    pub input_weight: u64,
    pub output_weight: u64,
}

impl Default for FeeModel {
    fn default() -> Self {
        Self {
            kernel_weight: 3,
            input_weight: 1,
            output_weight: 13,
        }
    }
}

impl FeeModel {
    /// Fee for a transaction with one input and the given kernel and output counts
    pub fn fee(&self, fee_per_gram: u64, kernel_count: u64, output_count: u64) -> WalletResult<u64> {
        let overflow = || WalletError::InvalidArgument("fee calculation overflows".into());
        let weight = kernel_count
            .checked_mul(self.kernel_weight)
            .and_then(|w| w.checked_add(self.input_weight))
            .and_then(|w| output_count.checked_mul(self.output_weight)?.checked_add(w))
            .ok_or_else(overflow)?;
        weight.checked_mul(fee_per_gram).ok_or_else(overflow)
    }
}

/// Lifecycle tunables taken from the wallet configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub fee_model: FeeModel,
    pub minimum_coin_split_fee: u64,
    pub required_confirmations: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            fee_model: FeeModel::default(),
            minimum_coin_split_fee: 100,
            required_confirmations: 3,
        }
    }
}

/// Status change requested by a chain-state protocol event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationUpdate {
    Broadcast,
    Mined,
    MinedUnconfirmed(u64),
    FauxConfirmed,
    FauxUnconfirmed(u64),
}

impl ConfirmationUpdate {
    /// Whether this update moves `tx` forward; anything else is stale
    fn applies_to(&self, tx: &CompletedTransaction) -> bool {
        if tx.status.is_confirmed() {
            return false;
        }
        match *self {
            ConfirmationUpdate::Broadcast => tx.status == TransactionStatus::Completed,
            ConfirmationUpdate::Mined | ConfirmationUpdate::FauxConfirmed => true,
            ConfirmationUpdate::MinedUnconfirmed(n) => {
                Self::advances(tx, TransactionStatus::MinedUnconfirmed, n)
            }
            ConfirmationUpdate::FauxUnconfirmed(n) => {
                Self::advances(tx, TransactionStatus::FauxUnconfirmed, n)
            }
        }
    }

    fn advances(tx: &CompletedTransaction, status: TransactionStatus, confirmations: u64) -> bool {
        confirmations > tx.confirmations
            || (confirmations == tx.confirmations && tx.status != status)
    }

    fn apply(&self, tx: &mut CompletedTransaction, required_confirmations: u64) {
        match *self {
            ConfirmationUpdate::Broadcast => tx.status = TransactionStatus::Broadcast,
            ConfirmationUpdate::Mined => {
                tx.status = TransactionStatus::MinedConfirmed;
                tx.confirmations = tx.confirmations.max(required_confirmations);
            }
            ConfirmationUpdate::FauxConfirmed => {
                tx.status = TransactionStatus::FauxConfirmed;
                tx.confirmations = tx.confirmations.max(required_confirmations);
            }
            ConfirmationUpdate::MinedUnconfirmed(n) => {
                tx.status = TransactionStatus::MinedUnconfirmed;
                tx.confirmations = n;
            }
            ConfirmationUpdate::FauxUnconfirmed(n) => {
                tx.status = TransactionStatus::FauxUnconfirmed;
                tx.confirmations = n;
            }
        }
    }

    fn event(&self, transaction: CompletedTransaction) -> WalletEvent {
        match *self {
            ConfirmationUpdate::Broadcast => WalletEvent::TransactionBroadcast(transaction),
            ConfirmationUpdate::Mined => WalletEvent::TransactionMined(transaction),
            ConfirmationUpdate::FauxConfirmed => WalletEvent::TransactionFauxConfirmed(transaction),
            ConfirmationUpdate::MinedUnconfirmed(confirmations) => {
                WalletEvent::TransactionMinedUnconfirmed {
                    transaction,
                    confirmations,
                }
            }
            ConfirmationUpdate::FauxUnconfirmed(confirmations) => {
                WalletEvent::TransactionFauxUnconfirmed {
                    transaction,
                    confirmations,
                }
            }
        }
    }
}

/// Which counterparty milestone finalized a pending transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalization {
    ReplyReceived,
    Finalized,
}

/// Arguments of a manual UTXO import
#[derive(Debug, Clone)]
pub struct UtxoImport<'a> {
    pub amount: u64,
    pub spending_key: &'a PrivateKey,
    pub source_public_key: PublicKey,
    pub features: OutputFeatures,
    pub commitment_signature: &'a CommitmentSignature,
    pub sender_public_key: PublicKey,
    pub script_private_key: &'a PrivateKey,
    pub message: String,
}

pub struct TransactionLifecycle {
    store: Arc<TransactionStore>,
    dispatcher: Arc<EventDispatcher>,
    connectivity: Arc<dyn WalletConnectivity>,
    own_key: PublicKey,
    settings: LifecycleSettings,
    required_confirmations: AtomicU64,
}

impl TransactionLifecycle {
    pub fn new(
        store: Arc<TransactionStore>,
        dispatcher: Arc<EventDispatcher>,
        connectivity: Arc<dyn WalletConnectivity>,
        own_key: PublicKey,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            dispatcher,
            connectivity,
            own_key,
            required_confirmations: AtomicU64::new(settings.required_confirmations),
            settings,
        }
    }

    pub fn required_confirmations(&self) -> u64 {
        self.required_confirmations.load(Ordering::SeqCst)
    }

    pub fn set_required_confirmations(&self, confirmations: u64) -> WalletResult<()> {
        if confirmations == 0 {
            return Err(WalletError::InvalidArgument(
                "required confirmations must be at least 1".into(),
            ));
        }
        self.required_confirmations
            .store(confirmations, Ordering::SeqCst);
        info!(confirmations, "Required confirmations updated");
        Ok(())
    }

    // ---- user actions ----

    /// Start a send to `destination`
    ///
    /// Interactive sends are recorded as `PendingOutbound`; one-sided sends
    /// need no reply and are recorded as `Completed{Broadcast}` straight away.
    /// The transport outcome arrives later as a direct-send or
    /// store-and-forward result.
    pub fn send(
        &self,
        destination: PublicKey,
        amount: u64,
        fee_per_gram: u64,
        message: String,
        one_sided: bool,
    ) -> WalletResult<TxId> {
        if amount == 0 {
            return Err(WalletError::InvalidArgument("amount must be non-zero".into()));
        }
        if fee_per_gram == 0 {
            return Err(WalletError::InvalidArgument(
                "fee per gram must be non-zero".into(),
            ));
        }
        if destination == self.own_key {
            return Err(WalletError::InvalidArgument(
                "cannot send to this wallet's own public key".into(),
            ));
        }

        let tx = {
            let mut partitions = self.store.lock();
            let fee = self.settings.fee_model.fee(fee_per_gram, 1, 2)?;
            Self::ensure_funds(&partitions, amount, fee)?;

            let tx_id = fresh_tx_id(&partitions);
            let pending = PendingOutboundTransaction::new(tx_id, destination, amount, fee, message);
            let tx = if one_sided {
                let mut completed = CompletedTransaction::from_pending_outbound(pending, self.own_key);
                completed.status = TransactionStatus::Broadcast;
                partitions.insert(TransactionKind::Completed, Transaction::Completed(completed.clone()))?;
                Transaction::Completed(completed)
            } else {
                let tx = Transaction::PendingOutbound(pending);
                partitions.insert(TransactionKind::PendingOutbound, tx.clone())?;
                tx
            };
            self.publish_balance(&mut partitions);
            info!(tx_id = %tx_id, amount, fee, one_sided, "Send started");
            tx
        };

        if let Err(e) = self.connectivity.submit_transaction(&tx, one_sided) {
            self.roll_back(tx.tx_id());
            return Err(e);
        }
        if one_sided {
            self.announce_broadcast(tx.tx_id());
        }
        Ok(tx.tx_id())
    }

    /// Cancel a pending transaction
    ///
    /// Returns `Ok(false)` if it is already cancelled. Completed transactions
    /// cannot be cancelled by the user.
    pub fn cancel(&self, tx_id: TxId) -> WalletResult<bool> {
        {
            let mut partitions = self.store.lock();
            match partitions.locate(tx_id) {
                None => return Err(WalletError::NotFound(format!("transaction {tx_id}"))),
                Some(TransactionKind::Cancelled) => {
                    debug!(tx_id = %tx_id, "Transaction already cancelled");
                    return Ok(false);
                }
                Some(TransactionKind::Completed) => {
                    return Err(WalletError::invalid_state(
                        tx_id,
                        "completed transactions cannot be cancelled",
                    ));
                }
                Some(from) => {
                    self.move_to_cancelled(
                        &mut partitions,
                        tx_id,
                        from,
                        CancellationReason::UserCancelled,
                    )?;
                }
            }
        }

        if let Err(e) = self.connectivity.notify_cancelled(tx_id) {
            warn!(tx_id = %tx_id, error = %e, "Could not notify counterparty of cancellation");
        }
        Ok(true)
    }

    /// Record funds discovered out-of-band as `Completed{FauxConfirmed}`
    pub fn import_utxo(&self, import: UtxoImport<'_>) -> WalletResult<TxId> {
        if import.amount == 0 {
            return Err(WalletError::ImportError("amount must be non-zero".into()));
        }
        import.commitment_signature.check_encoding()?;
        if import.spending_key == import.script_private_key {
            return Err(WalletError::ImportError(
                "spending key and script key must differ".into(),
            ));
        }

        let mut partitions = self.store.lock();
        let tx_id = self.record_faux_inbound(
            &mut partitions,
            import.amount,
            import.source_public_key,
            import.features.maturity,
            import.message,
        )?;
        info!(tx_id = %tx_id, amount = import.amount, "Imported UTXO");
        Ok(tx_id)
    }

    /// Split `amount` into `split_count` outputs with a self payment
    pub fn coin_split(
        &self,
        amount: u64,
        split_count: u64,
        fee: u64,
        message: String,
        lock_height: u64,
    ) -> WalletResult<TxId> {
        if amount == 0 || split_count == 0 || split_count > amount {
            return Err(WalletError::InvalidArgument(format!(
                "cannot split {amount} into {split_count} outputs"
            )));
        }
        if fee < self.settings.minimum_coin_split_fee {
            return Err(WalletError::InvalidArgument(format!(
                "coin split fee must be at least {}",
                self.settings.minimum_coin_split_fee
            )));
        }

        let tx = {
            let mut partitions = self.store.lock();
            Self::ensure_funds(&partitions, amount, fee)?;

            let tx_id = fresh_tx_id(&partitions);
            let mut split = CompletedTransaction::from_pending_outbound(
                PendingOutboundTransaction::new(tx_id, self.own_key, amount, fee, message),
                self.own_key,
            );
            split.status = TransactionStatus::Broadcast;
            split.lock_height = lock_height;
            partitions.insert(TransactionKind::Completed, Transaction::Completed(split.clone()))?;
            self.publish_balance(&mut partitions);
            info!(tx_id = %tx_id, amount, split_count, fee, "Coin split broadcast");
            Transaction::Completed(split)
        };

        if let Err(e) = self.connectivity.submit_transaction(&tx, false) {
            self.roll_back(tx.tx_id());
            return Err(e);
        }
        self.announce_broadcast(tx.tx_id());
        Ok(tx.tx_id())
    }

    /// Fee for sending `amount`, failing if the wallet cannot cover it
    pub fn estimate_fee(
        &self,
        amount: u64,
        fee_per_gram: u64,
        kernel_count: u64,
        output_count: u64,
    ) -> WalletResult<u64> {
        if kernel_count == 0 || output_count == 0 {
            return Err(WalletError::InvalidArgument(
                "kernel and output counts must be non-zero".into(),
            ));
        }
        let fee = self
            .settings
            .fee_model
            .fee(fee_per_gram, kernel_count, output_count)?;
        Self::ensure_funds(&self.store.lock(), amount, fee)?;
        Ok(fee)
    }

    /// Re-submit every completed transaction that is not yet confirmed
    pub fn restart_broadcast(&self, request_id: RequestId) -> WalletResult<Vec<TxId>> {
        let tx_ids: Vec<TxId> = self
            .store
            .lock()
            .completed()
            .filter(|tx| !tx.status.is_confirmed())
            .map(|tx| tx.tx_id)
            .collect();
        self.connectivity.request_rebroadcast(request_id, &tx_ids)?;
        info!(%request_id, count = tx_ids.len(), "Restarted transaction broadcast");
        Ok(tx_ids)
    }

    // ---- protocol events ----

    /// A peer started a send to this wallet
    pub fn on_received(
        &self,
        tx_id: TxId,
        source_public_key: PublicKey,
        amount: u64,
        message: String,
    ) -> WalletResult<bool> {
        let mut partitions = self.store.lock();
        if let Some(existing) = partitions.locate(tx_id) {
            debug!(tx_id = %tx_id, %existing, "Ignoring repeated transaction received event");
            return Ok(false);
        }
        let tx = PendingInboundTransaction::new(tx_id, source_public_key, amount, message);
        partitions.insert(TransactionKind::PendingInbound, Transaction::PendingInbound(tx.clone()))?;
        self.dispatcher.publish(WalletEvent::TransactionReceived(tx));
        self.publish_balance(&mut partitions);
        info!(tx_id = %tx_id, amount, "Transaction received");
        Ok(true)
    }

    /// Counterparty reply or finalization: pending becomes `Completed{Broadcast}`
    pub fn on_finalized(&self, tx_id: TxId, milestone: Finalization) -> WalletResult<bool> {
        let mut partitions = self.store.lock();
        let from = match partitions.locate(tx_id) {
            Some(kind @ (TransactionKind::PendingInbound | TransactionKind::PendingOutbound)) => kind,
            Some(kind) => {
                debug!(tx_id = %tx_id, %kind, ?milestone, "Ignoring finalization of non-pending transaction");
                return Ok(false);
            }
            None => {
                warn!(tx_id = %tx_id, ?milestone, "Finalization for unknown transaction");
                return Err(WalletError::NotFound(format!("transaction {tx_id}")));
            }
        };

        let completed =
            self.promote_pending(&mut partitions, tx_id, from, TransactionStatus::Broadcast)?;
        let event = match milestone {
            Finalization::ReplyReceived => WalletEvent::TransactionReplyReceived(completed),
            Finalization::Finalized => WalletEvent::TransactionFinalized(completed),
        };
        self.dispatcher.publish(event);
        self.publish_balance(&mut partitions);
        Ok(true)
    }

    /// Chain-state progress for a transaction
    ///
    /// Pending transactions the network reports on are promoted first. Stale
    /// updates (anything after a confirmed status, or a confirmation count
    /// lower than one already recorded) are ignored and return `Ok(false)`.
    pub fn on_confirmation_update(
        &self,
        tx_id: TxId,
        update: ConfirmationUpdate,
    ) -> WalletResult<bool> {
        let mut partitions = self.store.lock();
        match partitions.locate(tx_id) {
            None => {
                warn!(tx_id = %tx_id, ?update, "Chain update for unknown transaction");
                return Err(WalletError::NotFound(format!("transaction {tx_id}")));
            }
            Some(TransactionKind::Cancelled) => {
                debug!(tx_id = %tx_id, ?update, "Ignoring chain update for cancelled transaction");
                return Ok(false);
            }
            Some(from @ (TransactionKind::PendingInbound | TransactionKind::PendingOutbound)) => {
                // the update itself sets the status
                self.promote_pending(&mut partitions, tx_id, from, TransactionStatus::Completed)?;
            }
            Some(TransactionKind::Completed) => {}
        }

        let required = self.required_confirmations();
        let tx = partitions.completed_mut(tx_id).ok_or_else(|| {
            WalletError::Internal(format!("transaction {tx_id} vanished from completed"))
        })?;
        if !update.applies_to(tx) {
            debug!(
                tx_id = %tx_id,
                ?update,
                status = ?tx.status,
                confirmations = tx.confirmations,
                "Ignoring stale chain update"
            );
            return Ok(false);
        }
        update.apply(tx, required);
        let snapshot = tx.clone();
        debug!(tx_id = %tx_id, status = ?snapshot.status, confirmations = snapshot.confirmations, "Chain update applied");

        self.dispatcher.publish(update.event(snapshot));
        self.publish_balance(&mut partitions);
        Ok(true)
    }

    /// Cancellation reported by the network or the counterparty
    pub fn on_cancellation(&self, tx_id: TxId, reason: CancellationReason) -> WalletResult<bool> {
        let mut partitions = self.store.lock();
        match partitions.locate(tx_id) {
            None => {
                warn!(tx_id = %tx_id, ?reason, "Cancellation for unknown transaction");
                Err(WalletError::NotFound(format!("transaction {tx_id}")))
            }
            Some(TransactionKind::Cancelled) => {
                debug!(tx_id = %tx_id, "Transaction already cancelled");
                Ok(false)
            }
            Some(from) => {
                self.move_to_cancelled(&mut partitions, tx_id, from, reason)?;
                Ok(true)
            }
        }
    }

    /// Output found by a recovery scan
    pub fn on_output_recovered(
        &self,
        amount: u64,
        source_public_key: PublicKey,
        lock_height: u64,
        message: String,
    ) -> WalletResult<TxId> {
        let mut partitions = self.store.lock();
        self.record_faux_inbound(&mut partitions, amount, source_public_key, lock_height, message)
    }

    /// New chain tip from the base node; may release timelocked funds
    pub fn on_chain_tip(&self, height: u64) -> bool {
        let mut partitions = self.store.lock();
        if partitions.chain_tip() == height {
            return false;
        }
        let before = partitions.balance();
        partitions.set_chain_tip(height);
        if partitions.balance() != before {
            self.publish_balance(&mut partitions);
        }
        debug!(height, "Chain tip updated");
        true
    }

    // ---- helpers ----

    fn ensure_funds(partitions: &Partitions, amount: u64, fee: u64) -> WalletResult<()> {
        let required = amount
            .checked_add(fee)
            .ok_or_else(|| WalletError::InvalidArgument("amount plus fee overflows".into()))?;
        let available = partitions.balance().available;
        if available < required {
            return Err(WalletError::InsufficientFunds {
                required,
                available,
            });
        }
        Ok(())
    }

    fn publish_balance(&self, partitions: &mut Partitions) {
        let (balance, version) = partitions.next_balance();
        self.dispatcher
            .publish(WalletEvent::BalanceUpdated { balance, version });
    }

    fn promote_pending(
        &self,
        partitions: &mut Partitions,
        tx_id: TxId,
        from: TransactionKind,
        status: TransactionStatus,
    ) -> WalletResult<CompletedTransaction> {
        let own_key = self.own_key;
        let moved = partitions.move_transaction(tx_id, from, TransactionKind::Completed, |tx| {
            let mut completed = into_completed(tx, own_key);
            completed.status = status;
            Ok(Transaction::Completed(completed))
        })?;
        moved
            .into_completed()
            .ok_or_else(|| WalletError::Internal(format!("transaction {tx_id} not completed")))
    }

    fn move_to_cancelled(
        &self,
        partitions: &mut Partitions,
        tx_id: TxId,
        from: TransactionKind,
        reason: CancellationReason,
    ) -> WalletResult<()> {
        let own_key = self.own_key;
        let moved = partitions.move_transaction(tx_id, from, TransactionKind::Cancelled, |tx| {
            let mut cancelled = into_completed(tx, own_key);
            cancelled.cancellation_reason = Some(reason);
            Ok(Transaction::Completed(cancelled))
        })?;
        let transaction = moved
            .into_completed()
            .ok_or_else(|| WalletError::Internal(format!("transaction {tx_id} not cancelled")))?;
        info!(tx_id = %tx_id, ?reason, %from, "Transaction cancelled");
        self.dispatcher.publish(WalletEvent::TransactionCancelled {
            transaction,
            reason,
        });
        self.publish_balance(partitions);
        Ok(())
    }

    fn record_faux_inbound(
        &self,
        partitions: &mut Partitions,
        amount: u64,
        source_public_key: PublicKey,
        lock_height: u64,
        message: String,
    ) -> WalletResult<TxId> {
        let tx_id = fresh_tx_id(partitions);
        let mut tx = CompletedTransaction::from_pending_inbound(
            PendingInboundTransaction::new(tx_id, source_public_key, amount, message),
            self.own_key,
        );
        tx.status = TransactionStatus::FauxConfirmed;
        tx.confirmations = self.required_confirmations();
        tx.lock_height = lock_height;
        partitions.insert(TransactionKind::Completed, Transaction::Completed(tx.clone()))?;
        self.dispatcher
            .publish(WalletEvent::TransactionFauxConfirmed(tx));
        self.publish_balance(partitions);
        Ok(tx_id)
    }

    /// Publish `TransactionBroadcast` once the transport accepted the transaction
    ///
    /// Skipped if a protocol event already moved the record past `Broadcast`.
    fn announce_broadcast(&self, tx_id: TxId) {
        let partitions = self.store.lock();
        if let Some(tx) = partitions
            .completed()
            .find(|tx| tx.tx_id == tx_id && tx.status == TransactionStatus::Broadcast)
        {
            self.dispatcher
                .publish(WalletEvent::TransactionBroadcast(tx.clone()));
        };
    }

    /// Undo a send whose submission to the transport failed
    fn roll_back(&self, tx_id: TxId) {
        let mut partitions = self.store.lock();
        if let Some(kind) = partitions.locate(tx_id) {
            if partitions.remove(tx_id, kind).is_ok() {
                warn!(tx_id = %tx_id, "Submission failed, transaction discarded");
                self.publish_balance(&mut partitions);
            }
        }
    }
}

fn into_completed(tx: Transaction, own_key: PublicKey) -> CompletedTransaction {
    match tx {
        Transaction::PendingInbound(p) => CompletedTransaction::from_pending_inbound(p, own_key),
        Transaction::PendingOutbound(p) => CompletedTransaction::from_pending_outbound(p, own_key),
        Transaction::Completed(c) => c,
    }
}

fn fresh_tx_id(partitions: &Partitions) -> TxId {
    loop {
        let tx_id = TxId::random();
        if partitions.locate(tx_id).is_none() {
            return tx_id;
        }
    }
}

/// Direction of value flow for a completed record, from this wallet's view
pub fn direction_label(tx: &CompletedTransaction) -> &'static str {
    match (tx.direction, tx.is_self_payment()) {
        (_, true) => "self",
        (TransactionDirection::Inbound, false) => "inbound",
        (TransactionDirection::Outbound, false) => "outbound",
    }
}
