//! Transaction records held by the wallet
//!
//! Pending records exist while the counterparty negotiation is in flight.
//! Completed records are mutated in place as confirmations advance, and the
//! cancelled partition reuses [`CompletedTransaction`] with a cancellation reason set.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::types::{PublicKey, TxId};

/// Seconds since the unix epoch
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Transaction status, numbered the way the base layer wallet reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Completed = 0,
    Broadcast = 1,
    MinedUnconfirmed = 2,
    Imported = 3,
    Pending = 4,
    MinedConfirmed = 6,
    Rejected = 7,
    FauxUnconfirmed = 8,
    FauxConfirmed = 9,
}

impl TransactionStatus {
    /// Confirmed statuses are terminal for the confirmation event stream
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self,
            TransactionStatus::MinedConfirmed
                | TransactionStatus::FauxConfirmed
                | TransactionStatus::Imported
        )
    }

    pub fn is_faux(&self) -> bool {
        matches!(
            self,
            TransactionStatus::FauxConfirmed
                | TransactionStatus::FauxUnconfirmed
                | TransactionStatus::Imported
        )
    }
}

impl From<TransactionStatus> for i32 {
    fn from(status: TransactionStatus) -> Self {
        status as i32
    }
}

impl TryFrom<i32> for TransactionStatus {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TransactionStatus::Completed),
            1 => Ok(TransactionStatus::Broadcast),
            2 => Ok(TransactionStatus::MinedUnconfirmed),
            3 => Ok(TransactionStatus::Imported),
            4 => Ok(TransactionStatus::Pending),
            6 => Ok(TransactionStatus::MinedConfirmed),
            7 => Ok(TransactionStatus::Rejected),
            8 => Ok(TransactionStatus::FauxUnconfirmed),
            9 => Ok(TransactionStatus::FauxConfirmed),
            other => Err(other),
        }
    }
}

/// Why a transaction ended up in the cancelled partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancellationReason {
    Unknown = 0,
    UserCancelled = 1,
    Timeout = 2,
    DoubleSpend = 3,
    Orphan = 4,
    TimeLocked = 5,
    InvalidTransaction = 6,
    AbandonedCoinbase = 7,
}

impl From<u64> for CancellationReason {
    fn from(value: u64) -> Self {
        match value {
            1 => CancellationReason::UserCancelled,
            2 => CancellationReason::Timeout,
            3 => CancellationReason::DoubleSpend,
            4 => CancellationReason::Orphan,
            5 => CancellationReason::TimeLocked,
            6 => CancellationReason::InvalidTransaction,
            7 => CancellationReason::AbandonedCoinbase,
            _ => CancellationReason::Unknown,
        }
    }
}

impl From<CancellationReason> for u64 {
    fn from(reason: CancellationReason) -> Self {
        reason as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionDirection {
    Inbound,
    Outbound,
}

/// Lifecycle partition a transaction currently lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    PendingInbound,
    PendingOutbound,
    Completed,
    Cancelled,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 4] = [
        TransactionKind::PendingInbound,
        TransactionKind::PendingOutbound,
        TransactionKind::Completed,
        TransactionKind::Cancelled,
    ];
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionKind::PendingInbound => "pending-inbound",
            TransactionKind::PendingOutbound => "pending-outbound",
            TransactionKind::Completed => "completed",
            TransactionKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A send from a peer to this wallet, awaiting finalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInboundTransaction {
    pub tx_id: TxId,
    pub source_public_key: PublicKey,
    pub amount: u64,
    pub message: String,
    pub timestamp: u64,
    pub status: TransactionStatus,
}

impl PendingInboundTransaction {
    pub fn new(tx_id: TxId, source_public_key: PublicKey, amount: u64, message: String) -> Self {
        Self {
            tx_id,
            source_public_key,
            amount,
            message,
            timestamp: unix_timestamp(),
            status: TransactionStatus::Pending,
        }
    }
}

/// A send initiated by this wallet, awaiting the counterparty reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOutboundTransaction {
    pub tx_id: TxId,
    pub destination_public_key: PublicKey,
    pub amount: u64,
    pub fee: u64,
    pub message: String,
    pub timestamp: u64,
    pub status: TransactionStatus,
}

impl PendingOutboundTransaction {
    pub fn new(
        tx_id: TxId,
        destination_public_key: PublicKey,
        amount: u64,
        fee: u64,
        message: String,
    ) -> Self {
        Self {
            tx_id,
            destination_public_key,
            amount,
            fee,
            message,
            timestamp: unix_timestamp(),
            status: TransactionStatus::Pending,
        }
    }
}

/// A finalized transaction (or a cancelled one, when `cancellation_reason` is set)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTransaction {
    pub tx_id: TxId,
    pub source_public_key: PublicKey,
    pub destination_public_key: PublicKey,
    pub amount: u64,
    pub fee: u64,
    pub message: String,
    pub timestamp: u64,
    pub direction: TransactionDirection,
    pub status: TransactionStatus,
    pub confirmations: u64,
    /// Outputs created by this transaction are not spendable before this height
    pub lock_height: u64,
    pub cancellation_reason: Option<CancellationReason>,
}

impl CompletedTransaction {
    pub fn from_pending_inbound(tx: PendingInboundTransaction, own_key: PublicKey) -> Self {
        Self {
            tx_id: tx.tx_id,
            source_public_key: tx.source_public_key,
            destination_public_key: own_key,
            amount: tx.amount,
            fee: 0,
            message: tx.message,
            timestamp: tx.timestamp,
            direction: TransactionDirection::Inbound,
            status: TransactionStatus::Completed,
            confirmations: 0,
            lock_height: 0,
            cancellation_reason: None,
        }
    }

    pub fn from_pending_outbound(tx: PendingOutboundTransaction, own_key: PublicKey) -> Self {
        Self {
            tx_id: tx.tx_id,
            source_public_key: own_key,
            destination_public_key: tx.destination_public_key,
            amount: tx.amount,
            fee: tx.fee,
            message: tx.message,
            timestamp: tx.timestamp,
            direction: TransactionDirection::Outbound,
            status: TransactionStatus::Completed,
            confirmations: 0,
            lock_height: 0,
            cancellation_reason: None,
        }
    }

    /// Self payments (coin splits) spend and receive with the same key
    pub fn is_self_payment(&self) -> bool {
        self.source_public_key == self.destination_public_key
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_reason.is_some()
    }
}

/// A transaction in any partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transaction {
    PendingInbound(PendingInboundTransaction),
    PendingOutbound(PendingOutboundTransaction),
    Completed(CompletedTransaction),
}

impl Transaction {
    pub fn tx_id(&self) -> TxId {
        match self {
            Transaction::PendingInbound(tx) => tx.tx_id,
            Transaction::PendingOutbound(tx) => tx.tx_id,
            Transaction::Completed(tx) => tx.tx_id,
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Transaction::PendingInbound(tx) => tx.amount,
            Transaction::PendingOutbound(tx) => tx.amount,
            Transaction::Completed(tx) => tx.amount,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        match self {
            Transaction::PendingInbound(tx) => tx.status,
            Transaction::PendingOutbound(tx) => tx.status,
            Transaction::Completed(tx) => tx.status,
        }
    }

    /// Whether this record shape may live in the given partition
    pub fn fits(&self, kind: TransactionKind) -> bool {
        match (self, kind) {
            (Transaction::PendingInbound(_), TransactionKind::PendingInbound) => true,
            (Transaction::PendingOutbound(_), TransactionKind::PendingOutbound) => true,
            (Transaction::Completed(tx), TransactionKind::Completed) => !tx.is_cancelled(),
            (Transaction::Completed(tx), TransactionKind::Cancelled) => tx.is_cancelled(),
            _ => false,
        }
    }

    pub fn into_completed(self) -> Option<CompletedTransaction> {
        match self {
            Transaction::Completed(tx) => Some(tx),
            _ => None,
        }
    }

    pub fn as_completed(&self) -> Option<&CompletedTransaction> {
        match self {
            Transaction::Completed(tx) => Some(tx),
            _ => None,
        }
    }
}
