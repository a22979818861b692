//! Listener trait for wallet notifications
//!
//! A wallet has exactly one listener. It exposes one method per notification
//! kind; none of them have default bodies, so a listener that forgets an event
//! kind fails to compile instead of silently missing callbacks.

use async_trait::async_trait;
use std::error::Error;

use crate::data_structures::{
    Balance, CancellationReason, CompletedTransaction, ConnectivityStatus, ContactLiveness,
    PendingInboundTransaction, RequestId, TxId,
};
use crate::events::types::{RecoveryProgress, WalletEvent};

/// Result type returned by every listener callback
pub type ListenerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Receiver of wallet notifications
///
/// Callbacks run on the dispatcher's worker thread, one at a time. A returned
/// error is logged by the dispatcher and the event is not retried.
///
/// # Examples
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use tari_wallet_core::events::{ListenerResult, WalletEventListener};
///
/// struct Printer;
///
/// #[async_trait]
/// impl WalletEventListener for Printer {
///     async fn on_balance_updated(&mut self, balance: &Balance) -> ListenerResult {
///         println!("available: {}", balance.available);
///         Ok(())
///     }
///     // ... every other callback
/// }
/// ```
#[async_trait]
pub trait WalletEventListener: Send {
    async fn on_transaction_received(&mut self, tx: &PendingInboundTransaction) -> ListenerResult;

    async fn on_transaction_reply_received(&mut self, tx: &CompletedTransaction) -> ListenerResult;

    async fn on_transaction_finalized(&mut self, tx: &CompletedTransaction) -> ListenerResult;

    async fn on_transaction_broadcast(&mut self, tx: &CompletedTransaction) -> ListenerResult;

    async fn on_transaction_mined(&mut self, tx: &CompletedTransaction) -> ListenerResult;

    async fn on_transaction_mined_unconfirmed(
        &mut self,
        tx: &CompletedTransaction,
        confirmations: u64,
    ) -> ListenerResult;

    async fn on_transaction_faux_confirmed(&mut self, tx: &CompletedTransaction) -> ListenerResult;

    async fn on_transaction_faux_unconfirmed(
        &mut self,
        tx: &CompletedTransaction,
        confirmations: u64,
    ) -> ListenerResult;

    async fn on_transaction_cancelled(
        &mut self,
        tx: &CompletedTransaction,
        reason: CancellationReason,
    ) -> ListenerResult;

    async fn on_direct_send_result(&mut self, tx_id: TxId, success: bool) -> ListenerResult;

    async fn on_store_and_forward_send_result(
        &mut self,
        tx_id: TxId,
        success: bool,
    ) -> ListenerResult;

    async fn on_txo_validation_complete(
        &mut self,
        request_id: RequestId,
        success: bool,
    ) -> ListenerResult;

    async fn on_transaction_validation_complete(
        &mut self,
        request_id: RequestId,
        success: bool,
    ) -> ListenerResult;

    async fn on_contact_liveness_updated(&mut self, liveness: &ContactLiveness) -> ListenerResult;

    async fn on_balance_updated(&mut self, balance: &Balance) -> ListenerResult;

    async fn on_connectivity_status(&mut self, status: ConnectivityStatus) -> ListenerResult;

    async fn on_recovery_progress(&mut self, progress: &RecoveryProgress) -> ListenerResult;

    /// Name used in dispatcher logs
    fn name(&self) -> &'static str {
        "WalletEventListener"
    }
}

/// Route one event to the matching listener callback
pub async fn deliver(
    listener: &mut dyn WalletEventListener,
    event: &WalletEvent,
) -> ListenerResult {
    match event {
        WalletEvent::TransactionReceived(tx) => listener.on_transaction_received(tx).await,
        WalletEvent::TransactionReplyReceived(tx) => {
            listener.on_transaction_reply_received(tx).await
        }
        WalletEvent::TransactionFinalized(tx) => listener.on_transaction_finalized(tx).await,
        WalletEvent::TransactionBroadcast(tx) => listener.on_transaction_broadcast(tx).await,
        WalletEvent::TransactionMined(tx) => listener.on_transaction_mined(tx).await,
        WalletEvent::TransactionMinedUnconfirmed {
            transaction,
            confirmations,
        } => {
            listener
                .on_transaction_mined_unconfirmed(transaction, *confirmations)
                .await
        }
        WalletEvent::TransactionFauxConfirmed(tx) => {
            listener.on_transaction_faux_confirmed(tx).await
        }
        WalletEvent::TransactionFauxUnconfirmed {
            transaction,
            confirmations,
        } => {
            listener
                .on_transaction_faux_unconfirmed(transaction, *confirmations)
                .await
        }
        WalletEvent::TransactionCancelled {
            transaction,
            reason,
        } => listener.on_transaction_cancelled(transaction, *reason).await,
        WalletEvent::DirectSendResult { tx_id, success } => {
            listener.on_direct_send_result(*tx_id, *success).await
        }
        WalletEvent::StoreAndForwardSendResult { tx_id, success } => {
            listener
                .on_store_and_forward_send_result(*tx_id, *success)
                .await
        }
        WalletEvent::TxoValidationComplete {
            request_id,
            success,
        } => {
            listener
                .on_txo_validation_complete(*request_id, *success)
                .await
        }
        WalletEvent::TransactionValidationComplete {
            request_id,
            success,
        } => {
            listener
                .on_transaction_validation_complete(*request_id, *success)
                .await
        }
        WalletEvent::ContactLivenessUpdated(liveness) => {
            listener.on_contact_liveness_updated(liveness).await
        }
        WalletEvent::BalanceUpdated { balance, .. } => listener.on_balance_updated(balance).await,
        WalletEvent::ConnectivityStatus(status) => listener.on_connectivity_status(*status).await,
        WalletEvent::RecoveryProgress(progress) => listener.on_recovery_progress(progress).await,
    }
}
