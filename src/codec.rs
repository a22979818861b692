//! Transport encoding for values crossing the host boundary
//!
//! Hosts without an unsigned 64-bit integer receive ids, amounts and counts
//! as 8-byte big-endian buffers, and pass amounts back in as decimal text.
//! Keys travel as hex. Nothing in here holds state.

use crate::data_structures::{PrivateKey, PublicKey, RequestId, TxId};
use crate::errors::{WalletError, WalletResult};

/// Width of the fixed integer transport buffer
pub const U64_BYTES: usize = 8;

pub fn u64_to_bytes(value: u64) -> [u8; U64_BYTES] {
    value.to_be_bytes()
}

/// Decode a big-endian buffer; shorter buffers are left-padded with zeros
pub fn u64_from_bytes(bytes: &[u8]) -> WalletResult<u64> {
    if bytes.len() > U64_BYTES {
        // Unsigned big-integer encodings may carry a leading sign byte
        let (head, tail) = bytes.split_at(bytes.len() - U64_BYTES);
        if head.iter().any(|b| *b != 0) {
            return Err(WalletError::InvalidArgument(format!(
                "value of {} bytes does not fit in 64 bits",
                bytes.len()
            )));
        }
        return u64_from_bytes(tail);
    }
    let mut buf = [0u8; U64_BYTES];
    buf[U64_BYTES - bytes.len()..].copy_from_slice(bytes);
    Ok(u64::from_be_bytes(buf))
}

/// Parse a decimal text amount as sent by hosts with narrow integer types
pub fn parse_u64_text(text: &str) -> WalletResult<u64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(WalletError::InvalidArgument("empty numeric string".into()));
    }
    trimmed
        .parse::<u64>()
        .map_err(|e| WalletError::InvalidArgument(format!("'{trimmed}' is not a u64: {e}")))
}

pub fn tx_id_to_bytes(tx_id: TxId) -> [u8; U64_BYTES] {
    u64_to_bytes(tx_id.as_u64())
}

pub fn tx_id_from_bytes(bytes: &[u8]) -> WalletResult<TxId> {
    u64_from_bytes(bytes).map(TxId::new)
}

pub fn request_id_to_bytes(request_id: RequestId) -> [u8; U64_BYTES] {
    u64_to_bytes(request_id.as_u64())
}

pub fn public_key_from_hex(hex_str: &str) -> WalletResult<PublicKey> {
    PublicKey::from_hex(hex_str)
}

pub fn private_key_from_hex(hex_str: &str) -> WalletResult<PrivateKey> {
    PrivateKey::from_hex(hex_str)
}

pub fn fixed_bytes_from_hex<const N: usize>(hex_str: &str) -> WalletResult<[u8; N]> {
    let bytes = hex::decode(hex_str.trim())?;
    bytes.as_slice().try_into().map_err(|_| {
        WalletError::InvalidArgument(format!("expected {N} bytes, got {}", bytes.len()))
    })
}
