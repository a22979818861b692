//! Identifier and cryptographic value types
//!
//! Keys, signatures and commitments are treated as opaque, immutable byte
//! strings. The only checks performed here are encoding checks: public keys
//! must decompress to a Ristretto point and private keys must be canonical scalars.

use std::fmt;

use curve25519_dalek::{ristretto::CompressedRistretto, scalar::Scalar, RistrettoPoint};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{WalletError, WalletResult};

/// Length in bytes of every key, nonce and commitment value
pub const KEY_LENGTH: usize = 32;

/// Wallet-unique transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(u64);

impl TxId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Random non-zero id, matching how the base layer wallet assigns ids
    pub fn random() -> Self {
        loop {
            let id: u64 = rand::random();
            if id != 0 {
                return Self(id);
            }
        }
    }
}

impl From<u64> for TxId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an outstanding validation or rebroadcast request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn to_array(bytes: &[u8], what: &str) -> WalletResult<[u8; KEY_LENGTH]> {
    bytes.try_into().map_err(|_| {
        WalletError::InvalidArgument(format!(
            "{what} must be {KEY_LENGTH} bytes, got {}",
            bytes.len()
        ))
    })
}

/// Compressed Ristretto public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey([u8; KEY_LENGTH]);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        let array = to_array(bytes, "public key")?;
        CompressedRistretto(array).decompress().ok_or_else(|| {
            WalletError::InvalidArgument("public key is not a valid Ristretto point".into())
        })?;
        Ok(Self(array))
    }

    pub fn from_hex(hex_str: &str) -> WalletResult<Self> {
        Self::from_bytes(&hex::decode(hex_str.trim())?)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Canonical Ristretto scalar, wiped from memory on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; KEY_LENGTH]);

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        let array = to_array(bytes, "private key")?;
        let scalar: Option<Scalar> = Scalar::from_canonical_bytes(array).into();
        match scalar {
            Some(s) if s != Scalar::ZERO => Ok(Self(array)),
            Some(_) => Err(WalletError::InvalidArgument("private key is zero".into())),
            None => Err(WalletError::InvalidArgument(
                "private key is not a canonical scalar".into(),
            )),
        }
    }

    pub fn from_hex(hex_str: &str) -> WalletResult<Self> {
        Self::from_bytes(&hex::decode(hex_str.trim())?)
    }

    /// Reduce 64 bytes of key material into a scalar
    pub fn from_wide_bytes(bytes: &[u8; 64]) -> Self {
        Self(Scalar::from_bytes_mod_order_wide(bytes).to_bytes())
    }

    pub fn random() -> Self {
        let mut wide = [0u8; 64];
        rand::Rng::fill(&mut rand::thread_rng(), &mut wide[..]);
        let key = Self::from_wide_bytes(&wide);
        wide.zeroize();
        key
    }

    pub fn public_key(&self) -> PublicKey {
        let scalar = Scalar::from_bytes_mod_order(self.0);
        PublicKey(RistrettoPoint::mul_base(&scalar).compress().to_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Opaque Pedersen commitment
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment([u8; KEY_LENGTH]);

impl Commitment {
    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        Ok(Self(to_array(bytes, "commitment")?))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

/// Opaque Schnorr signature
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub public_nonce: PublicKey,
    pub signature: [u8; KEY_LENGTH],
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signature({}, {})",
            self.public_nonce,
            hex::encode(self.signature)
        )
    }
}

/// Commitment-and-signature proof carried by an imported output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentSignature {
    pub public_nonce: Commitment,
    pub u: [u8; KEY_LENGTH],
    pub v: [u8; KEY_LENGTH],
}

impl CommitmentSignature {
    pub fn new(public_nonce: Commitment, u: [u8; KEY_LENGTH], v: [u8; KEY_LENGTH]) -> Self {
        Self { public_nonce, u, v }
    }

    /// Both scalar halves must be canonical and non-zero, the nonce must decompress
    pub fn check_encoding(&self) -> WalletResult<()> {
        CompressedRistretto(*self.public_nonce.as_bytes())
            .decompress()
            .ok_or_else(|| {
                WalletError::ImportError("commitment signature nonce is not a valid point".into())
            })?;
        for (name, half) in [("u", self.u), ("v", self.v)] {
            let scalar: Option<Scalar> = Scalar::from_canonical_bytes(half).into();
            match scalar {
                Some(s) if s != Scalar::ZERO => {}
                _ => {
                    return Err(WalletError::ImportError(format!(
                        "commitment signature component {name} is not a canonical non-zero scalar"
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Output feature flags attached to imported and split outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFeatures {
    pub version: u8,
    pub output_type: u8,
    pub maturity: u64,
}
