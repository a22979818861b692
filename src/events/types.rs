//! Event type definitions for the wallet event system
//!
//! Two families of events flow through the wallet:
//!
//! - [`ProtocolEvent`]: raw inputs produced by network, mining-status and
//!   base-node worker threads. They drive the transaction state machine.
//! - [`WalletEvent`]: notifications delivered to the registered listener once
//!   a protocol event (or a user call) has been applied.

use serde::{Deserialize, Serialize};

use crate::data_structures::{
    Balance, CancellationReason, CompletedTransaction, ConnectivityStatus, ContactLiveness,
    PendingInboundTransaction, PublicKey, RequestId, TxId,
};

/// Recovery scan milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryPhase {
    Starting,
    ConnectedToBaseNode,
    ConnectionFailed,
    Progress,
    Completed,
    ScanningRoundFailed,
    RecoveryFailed,
    /// Phase value this wallet does not know about; informational only
    Unknown(u8),
}

impl RecoveryPhase {
    /// Terminal phases end the recovery run
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecoveryPhase::Completed | RecoveryPhase::RecoveryFailed)
    }
}

impl From<u8> for RecoveryPhase {
    fn from(value: u8) -> Self {
        match value {
            0 => RecoveryPhase::Starting,
            1 => RecoveryPhase::ConnectedToBaseNode,
            2 => RecoveryPhase::ConnectionFailed,
            3 => RecoveryPhase::Progress,
            4 => RecoveryPhase::Completed,
            5 => RecoveryPhase::ScanningRoundFailed,
            6 => RecoveryPhase::RecoveryFailed,
            other => RecoveryPhase::Unknown(other),
        }
    }
}

impl From<RecoveryPhase> for u8 {
    fn from(phase: RecoveryPhase) -> Self {
        match phase {
            RecoveryPhase::Starting => 0,
            RecoveryPhase::ConnectedToBaseNode => 1,
            RecoveryPhase::ConnectionFailed => 2,
            RecoveryPhase::Progress => 3,
            RecoveryPhase::Completed => 4,
            RecoveryPhase::ScanningRoundFailed => 5,
            RecoveryPhase::RecoveryFailed => 6,
            RecoveryPhase::Unknown(other) => other,
        }
    }
}

/// Recovery milestone with its two numeric arguments
///
/// For `Progress` these are (current block, total blocks); for `Completed`
/// (outputs recovered, value recovered); for the failure phases (retry, max retries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryProgress {
    pub phase: RecoveryPhase,
    pub current: u64,
    pub total: u64,
}

/// Input produced by a native worker thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    TransactionReceived {
        tx_id: TxId,
        source_public_key: PublicKey,
        amount: u64,
        message: String,
    },
    TransactionReplyReceived {
        tx_id: TxId,
    },
    TransactionFinalized {
        tx_id: TxId,
    },
    TransactionBroadcast {
        tx_id: TxId,
    },
    TransactionMined {
        tx_id: TxId,
    },
    TransactionMinedUnconfirmed {
        tx_id: TxId,
        confirmations: u64,
    },
    TransactionFauxConfirmed {
        tx_id: TxId,
    },
    TransactionFauxUnconfirmed {
        tx_id: TxId,
        confirmations: u64,
    },
    TransactionCancelled {
        tx_id: TxId,
        reason: CancellationReason,
    },
    DirectSendResult {
        tx_id: TxId,
        success: bool,
    },
    StoreAndForwardSendResult {
        tx_id: TxId,
        success: bool,
    },
    TxoValidationComplete {
        request_id: RequestId,
        success: bool,
    },
    TransactionValidationComplete {
        request_id: RequestId,
        success: bool,
    },
    ContactLivenessUpdated(ContactLiveness),
    ConnectivityStatus(u64),
    BaseNodeState {
        chain_tip: u64,
    },
    RecoveryProgress {
        phase: u8,
        current: u64,
        total: u64,
    },
    OutputRecovered {
        amount: u64,
        source_public_key: PublicKey,
        lock_height: u64,
        message: String,
    },
}

impl ProtocolEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ProtocolEvent::TransactionReceived { .. } => "TransactionReceived",
            ProtocolEvent::TransactionReplyReceived { .. } => "TransactionReplyReceived",
            ProtocolEvent::TransactionFinalized { .. } => "TransactionFinalized",
            ProtocolEvent::TransactionBroadcast { .. } => "TransactionBroadcast",
            ProtocolEvent::TransactionMined { .. } => "TransactionMined",
            ProtocolEvent::TransactionMinedUnconfirmed { .. } => "TransactionMinedUnconfirmed",
            ProtocolEvent::TransactionFauxConfirmed { .. } => "TransactionFauxConfirmed",
            ProtocolEvent::TransactionFauxUnconfirmed { .. } => "TransactionFauxUnconfirmed",
            ProtocolEvent::TransactionCancelled { .. } => "TransactionCancelled",
            ProtocolEvent::DirectSendResult { .. } => "DirectSendResult",
            ProtocolEvent::StoreAndForwardSendResult { .. } => "StoreAndForwardSendResult",
            ProtocolEvent::TxoValidationComplete { .. } => "TxoValidationComplete",
            ProtocolEvent::TransactionValidationComplete { .. } => "TransactionValidationComplete",
            ProtocolEvent::ContactLivenessUpdated(_) => "ContactLivenessUpdated",
            ProtocolEvent::ConnectivityStatus(_) => "ConnectivityStatus",
            ProtocolEvent::BaseNodeState { .. } => "BaseNodeState",
            ProtocolEvent::RecoveryProgress { .. } => "RecoveryProgress",
            ProtocolEvent::OutputRecovered { .. } => "OutputRecovered",
        }
    }
}

/// Notification delivered to the wallet's listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletEvent {
    TransactionReceived(PendingInboundTransaction),
    TransactionReplyReceived(CompletedTransaction),
    TransactionFinalized(CompletedTransaction),
    TransactionBroadcast(CompletedTransaction),
    TransactionMined(CompletedTransaction),
    TransactionMinedUnconfirmed {
        transaction: CompletedTransaction,
        confirmations: u64,
    },
    TransactionFauxConfirmed(CompletedTransaction),
    TransactionFauxUnconfirmed {
        transaction: CompletedTransaction,
        confirmations: u64,
    },
    TransactionCancelled {
        transaction: CompletedTransaction,
        reason: CancellationReason,
    },
    DirectSendResult {
        tx_id: TxId,
        success: bool,
    },
    StoreAndForwardSendResult {
        tx_id: TxId,
        success: bool,
    },
    TxoValidationComplete {
        request_id: RequestId,
        success: bool,
    },
    TransactionValidationComplete {
        request_id: RequestId,
        success: bool,
    },
    ContactLivenessUpdated(ContactLiveness),
    /// `version` increases with every recomputation; older versions are never delivered after newer ones
    BalanceUpdated {
        balance: Balance,
        version: u64,
    },
    ConnectivityStatus(ConnectivityStatus),
    RecoveryProgress(RecoveryProgress),
}

impl WalletEvent {
    /// Stable name used for logging and statistics
    pub fn event_type(&self) -> &'static str {
        match self {
            WalletEvent::TransactionReceived(_) => "TransactionReceived",
            WalletEvent::TransactionReplyReceived(_) => "TransactionReplyReceived",
            WalletEvent::TransactionFinalized(_) => "TransactionFinalized",
            WalletEvent::TransactionBroadcast(_) => "TransactionBroadcast",
            WalletEvent::TransactionMined(_) => "TransactionMined",
            WalletEvent::TransactionMinedUnconfirmed { .. } => "TransactionMinedUnconfirmed",
            WalletEvent::TransactionFauxConfirmed(_) => "TransactionFauxConfirmed",
            WalletEvent::TransactionFauxUnconfirmed { .. } => "TransactionFauxUnconfirmed",
            WalletEvent::TransactionCancelled { .. } => "TransactionCancelled",
            WalletEvent::DirectSendResult { .. } => "DirectSendResult",
            WalletEvent::StoreAndForwardSendResult { .. } => "StoreAndForwardSendResult",
            WalletEvent::TxoValidationComplete { .. } => "TxoValidationComplete",
            WalletEvent::TransactionValidationComplete { .. } => "TransactionValidationComplete",
            WalletEvent::ContactLivenessUpdated(_) => "ContactLivenessUpdated",
            WalletEvent::BalanceUpdated { .. } => "BalanceUpdated",
            WalletEvent::ConnectivityStatus(_) => "ConnectivityStatus",
            WalletEvent::RecoveryProgress(_) => "RecoveryProgress",
        }
    }

    /// Transaction this event is about, if any
    pub fn tx_id(&self) -> Option<TxId> {
        match self {
            WalletEvent::TransactionReceived(tx) => Some(tx.tx_id),
            WalletEvent::TransactionReplyReceived(tx)
            | WalletEvent::TransactionFinalized(tx)
            | WalletEvent::TransactionBroadcast(tx)
            | WalletEvent::TransactionMined(tx)
            | WalletEvent::TransactionFauxConfirmed(tx) => Some(tx.tx_id),
            WalletEvent::TransactionMinedUnconfirmed { transaction, .. }
            | WalletEvent::TransactionFauxUnconfirmed { transaction, .. }
            | WalletEvent::TransactionCancelled { transaction, .. } => Some(transaction.tx_id),
            WalletEvent::DirectSendResult { tx_id, .. }
            | WalletEvent::StoreAndForwardSendResult { tx_id, .. } => Some(*tx_id),
            _ => None,
        }
    }

    /// Compact JSON form, used by the logging listener
    pub fn to_compact_json(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::PrivateKey;

    #[test]
    fn test_recovery_phase_numbering() {
        for value in 0u8..=6 {
            let phase = RecoveryPhase::from(value);
            assert!(!matches!(phase, RecoveryPhase::Unknown(_)));
            assert_eq!(u8::from(phase), value);
        }
        assert_eq!(RecoveryPhase::from(200), RecoveryPhase::Unknown(200));
        assert!(!RecoveryPhase::Unknown(200).is_terminal());
        assert!(RecoveryPhase::Completed.is_terminal());
        assert!(RecoveryPhase::RecoveryFailed.is_terminal());
        assert!(!RecoveryPhase::ScanningRoundFailed.is_terminal());
    }

    #[test]
    fn test_event_tx_id_extraction() {
        let tx = PendingInboundTransaction::new(
            TxId::new(5),
            PrivateKey::random().public_key(),
            10,
            "hi".into(),
        );
        let event = WalletEvent::TransactionReceived(tx);
        assert_eq!(event.tx_id(), Some(TxId::new(5)));
        assert_eq!(event.event_type(), "TransactionReceived");

        let balance = WalletEvent::BalanceUpdated {
            balance: Balance::default(),
            version: 1,
        };
        assert_eq!(balance.tx_id(), None);
        assert!(balance.to_compact_json().unwrap().contains("BalanceUpdated"));
    }
}
