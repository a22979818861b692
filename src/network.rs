//! Base node and peer transport collaborator
//!
//! The wallet never talks to the network directly. Every outbound action goes
//! through [`WalletConnectivity`]; results come back later as
//! [`ProtocolEvent`](crate::events::ProtocolEvent)s fed into the wallet.
//! Implementations must not block: queue the work and return.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::data_structures::{
    BaseNodePeer, FeePerGramStat, PowerMode, PublicKey, RequestId, Transaction, TxId,
};
use crate::errors::{WalletError, WalletResult};

pub trait WalletConnectivity: Send + Sync {
    /// Hand a new send (pending or already completed) to the transport
    fn submit_transaction(&self, tx: &Transaction, one_sided: bool) -> WalletResult<()>;

    /// Tell the counterparty a pending transaction was cancelled locally
    fn notify_cancelled(&self, tx_id: TxId) -> WalletResult<()>;

    fn request_txo_validation(&self, request_id: RequestId) -> WalletResult<()>;

    fn request_transaction_validation(&self, request_id: RequestId) -> WalletResult<()>;

    fn request_rebroadcast(&self, request_id: RequestId, tx_ids: &[TxId]) -> WalletResult<()>;

    fn start_recovery_scan(&self, base_node: &PublicKey, output_message: &str) -> WalletResult<()>;

    fn set_power_mode(&self, mode: PowerMode) -> WalletResult<()>;

    /// Fee-per-gram buckets for the next `count` blocks
    fn fee_per_gram_stats(&self, count: u32) -> WalletResult<Vec<FeePerGramStat>>;

    fn add_base_node_peer(&self, peer: &BaseNodePeer) -> WalletResult<()>;
}

/// Connectivity that accepts everything and does nothing
///
/// Fee statistics report a flat market of one microTari per gram.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopConnectivity;

impl WalletConnectivity for NoopConnectivity {
    fn submit_transaction(&self, tx: &Transaction, one_sided: bool) -> WalletResult<()> {
        debug!(tx_id = %tx.tx_id(), one_sided, "Submit (noop)");
        Ok(())
    }

    fn notify_cancelled(&self, _tx_id: TxId) -> WalletResult<()> {
        Ok(())
    }

    fn request_txo_validation(&self, _request_id: RequestId) -> WalletResult<()> {
        Ok(())
    }

    fn request_transaction_validation(&self, _request_id: RequestId) -> WalletResult<()> {
        Ok(())
    }

    fn request_rebroadcast(&self, _request_id: RequestId, _tx_ids: &[TxId]) -> WalletResult<()> {
        Ok(())
    }

    fn start_recovery_scan(&self, _base_node: &PublicKey, _output_message: &str) -> WalletResult<()> {
        Ok(())
    }

    fn set_power_mode(&self, _mode: PowerMode) -> WalletResult<()> {
        Ok(())
    }

    fn fee_per_gram_stats(&self, count: u32) -> WalletResult<Vec<FeePerGramStat>> {
        Ok((0..u64::from(count))
            .map(|order| FeePerGramStat {
                order,
                min_fee_per_gram: 1,
                avg_fee_per_gram: 1,
                max_fee_per_gram: 1,
            })
            .collect())
    }

    fn add_base_node_peer(&self, _peer: &BaseNodePeer) -> WalletResult<()> {
        Ok(())
    }
}

/// One call made against [`RecordingConnectivity`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityCall {
    Submit { tx_id: TxId, one_sided: bool },
    NotifyCancelled(TxId),
    TxoValidation(RequestId),
    TransactionValidation(RequestId),
    Rebroadcast { request_id: RequestId, tx_ids: Vec<TxId> },
    RecoveryScan(PublicKey),
    PowerMode(PowerMode),
    FeeStats(u32),
    AddPeer(BaseNodePeer),
}

/// Connectivity that records every call, for tests and the simulator
#[derive(Debug, Default)]
pub struct RecordingConnectivity {
    calls: Mutex<Vec<ConnectivityCall>>,
    reject_submissions: AtomicBool,
}

impl RecordingConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record submissions but fail them, as an unreachable transport would
    pub fn set_reject_submissions(&self, reject: bool) {
        self.reject_submissions.store(reject, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ConnectivityCall> {
        self.lock().clone()
    }

    /// Ids of every submitted transaction, in submission order
    pub fn submitted(&self) -> Vec<TxId> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                ConnectivityCall::Submit { tx_id, .. } => Some(*tx_id),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConnectivityCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: ConnectivityCall) -> WalletResult<()> {
        self.lock().push(call);
        Ok(())
    }
}

impl WalletConnectivity for RecordingConnectivity {
    fn submit_transaction(&self, tx: &Transaction, one_sided: bool) -> WalletResult<()> {
        self.record(ConnectivityCall::Submit {
            tx_id: tx.tx_id(),
            one_sided,
        })?;
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(WalletError::Internal("transport unavailable".into()));
        }
        Ok(())
    }

    fn notify_cancelled(&self, tx_id: TxId) -> WalletResult<()> {
        self.record(ConnectivityCall::NotifyCancelled(tx_id))
    }

    fn request_txo_validation(&self, request_id: RequestId) -> WalletResult<()> {
        self.record(ConnectivityCall::TxoValidation(request_id))
    }

    fn request_transaction_validation(&self, request_id: RequestId) -> WalletResult<()> {
        self.record(ConnectivityCall::TransactionValidation(request_id))
    }

    fn request_rebroadcast(&self, request_id: RequestId, tx_ids: &[TxId]) -> WalletResult<()> {
        self.record(ConnectivityCall::Rebroadcast {
            request_id,
            tx_ids: tx_ids.to_vec(),
        })
    }

    fn start_recovery_scan(&self, base_node: &PublicKey, _output_message: &str) -> WalletResult<()> {
        self.record(ConnectivityCall::RecoveryScan(*base_node))
    }

    fn set_power_mode(&self, mode: PowerMode) -> WalletResult<()> {
        self.record(ConnectivityCall::PowerMode(mode))
    }

    fn fee_per_gram_stats(&self, count: u32) -> WalletResult<Vec<FeePerGramStat>> {
        self.record(ConnectivityCall::FeeStats(count))?;
        NoopConnectivity.fee_per_gram_stats(count)
    }

    fn add_base_node_peer(&self, peer: &BaseNodePeer) -> WalletResult<()> {
        self.record(ConnectivityCall::AddPeer(peer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_fee_stats_are_ordered() {
        let stats = NoopConnectivity.fee_per_gram_stats(3).unwrap();
        let orders: Vec<u64> = stats.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_recording_connectivity_keeps_call_order() {
        let net = RecordingConnectivity::new();
        net.request_txo_validation(RequestId::new(1)).unwrap();
        net.set_power_mode(PowerMode::Low).unwrap();
        assert_eq!(
            net.calls(),
            vec![
                ConnectivityCall::TxoValidation(RequestId::new(1)),
                ConnectivityCall::PowerMode(PowerMode::Low),
            ]
        );
        assert!(net.submitted().is_empty());
    }
}
