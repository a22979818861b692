//! Contacts, balances and fee market snapshots

use serde::{Deserialize, Serialize};

use super::types::PublicKey;

/// Address book entry, identified by its public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub alias: String,
    pub public_key: PublicKey,
}

impl Contact {
    pub fn new(alias: impl Into<String>, public_key: PublicKey) -> Self {
        Self {
            alias: alias.into(),
            public_key,
        }
    }
}

/// Online status reported for a contact by the liveness service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactOnlineStatus {
    Online,
    Offline,
    NeverSeen,
    Banned,
}

/// Liveness sample for a contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactLiveness {
    pub public_key: PublicKey,
    pub latency_ms: Option<u32>,
    pub last_seen: Option<u64>,
    pub online_status: ContactOnlineStatus,
}

/// Aggregate wallet balance in microTari
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub available: u64,
    pub pending_incoming: u64,
    pub pending_outgoing: u64,
    pub timelocked: u64,
}

/// Fee-per-gram snapshot for one block-order bucket of the mempool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePerGramStat {
    pub order: u64,
    pub min_fee_per_gram: u64,
    pub avg_fee_per_gram: u64,
    pub max_fee_per_gram: u64,
}

/// Base node connectivity as reported by the network layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectivityStatus {
    Connecting,
    Online,
    Offline,
    Unknown(u64),
}

impl From<u64> for ConnectivityStatus {
    fn from(value: u64) -> Self {
        match value {
            0 => ConnectivityStatus::Connecting,
            1 => ConnectivityStatus::Online,
            2 => ConnectivityStatus::Offline,
            other => ConnectivityStatus::Unknown(other),
        }
    }
}

/// Network activity level requested from the connectivity layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerMode {
    Normal,
    Low,
}

/// Base node peer the wallet talks to for chain state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseNodePeer {
    pub public_key: PublicKey,
    pub address: String,
}
