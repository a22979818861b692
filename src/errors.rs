//! Error types for the wallet core
//!
//! Every fallible operation in the crate returns [`WalletResult`]. At the
//! boundary each [`WalletError`] collapses into a stable integer code (see
//! [`WalletError::code`]) so hosts without exceptions can still tell failures apart.

use thiserror::Error;

use crate::data_structures::{RequestId, TxId};

/// Convenience alias used across the crate
pub type WalletResult<T> = Result<T, WalletError>;

/// Error taxonomy shared by every wallet component
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Malformed key, address, amount or string argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation is not valid for the transaction's current lifecycle state
    #[error("Invalid state for transaction {tx_id}: {reason}")]
    InvalidState { tx_id: TxId, reason: String },

    /// Operation is not valid for the wallet as a whole (e.g. listener already set)
    #[error("Invalid wallet state: {0}")]
    InvalidWalletState(String),

    /// Unknown transaction id, handle or key
    #[error("Not found: {0}")]
    NotFound(String),

    /// Spendable balance does not cover the requested amount plus fee
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// Cryptographic or encoding mismatch while importing an output
    #[error("UTXO import failed: {0}")]
    ImportError(String),

    /// Validation resolution for a request id that is not outstanding
    #[error("Unknown validation request {0}")]
    UnknownRequest(RequestId),

    /// Wallet configuration rejected during construction
    #[error("Configuration error: {field} - {message}")]
    Configuration { field: String, message: String },

    /// Seed word list rejected a word or ran past its maximum length
    #[error("Seed words error: {0}")]
    SeedWords(String),

    /// Unexpected engine failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Stable, non-zero code written to the boundary error out-parameter
    pub fn code(&self) -> i32 {
        match self {
            WalletError::InvalidArgument(_) => 1,
            WalletError::InvalidState { .. } => 2,
            WalletError::InvalidWalletState(_) => 3,
            WalletError::NotFound(_) => 4,
            WalletError::InsufficientFunds { .. } => 5,
            WalletError::ImportError(_) => 6,
            WalletError::UnknownRequest(_) => 7,
            WalletError::Configuration { .. } => 8,
            WalletError::SeedWords(_) => 9,
            WalletError::Internal(_) => 999,
        }
    }

    pub fn invalid_state(tx_id: TxId, reason: impl Into<String>) -> Self {
        WalletError::InvalidState {
            tx_id,
            reason: reason.into(),
        }
    }

    pub fn config(field: &str, message: impl Into<String>) -> Self {
        WalletError::Configuration {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(err: hex::FromHexError) -> Self {
        WalletError::InvalidArgument(format!("hex decoding failed: {err}"))
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::config("json", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_and_non_zero() {
        let errors = vec![
            WalletError::InvalidArgument("a".into()),
            WalletError::invalid_state(TxId::new(1), "b"),
            WalletError::InvalidWalletState("c".into()),
            WalletError::NotFound("d".into()),
            WalletError::InsufficientFunds {
                required: 2,
                available: 1,
            },
            WalletError::ImportError("e".into()),
            WalletError::UnknownRequest(RequestId::new(9)),
            WalletError::config("network", "empty"),
            WalletError::SeedWords("f".into()),
            WalletError::Internal("g".into()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(WalletError::code).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_messages() {
        let err = WalletError::InsufficientFunds {
            required: 1005,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: required 1005, available 10"
        );
        assert_eq!(
            WalletError::UnknownRequest(RequestId::new(42)).to_string(),
            "Unknown validation request 42"
        );
    }
}
