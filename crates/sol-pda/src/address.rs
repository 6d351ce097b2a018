//! Solana account identities.
//!
//! An address is a 32-byte value. For wallets it is the raw Ed25519 public
//! key; for program derived addresses it is a SHA-256 output that is known
//! not to be a curve point. The textual form is Base58 (Bitcoin alphabet).

use std::fmt;
use std::str::FromStr;

use crate::error::PdaError;

/// A 32-byte Solana address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decode a Base58 address string.
    ///
    /// Returns an error if the string is not valid Base58 or does not decode
    /// to exactly 32 bytes.
    pub fn from_base58(address: &str) -> Result<Self, PdaError> {
        let bytes = bs58::decode(address)
            .into_vec()
            .map_err(|e| PdaError::InvalidAddress(format!("base58 decode failed: {e}")))?;

        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            PdaError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
        })?;

        Ok(Self(arr))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Whether these bytes decompress to an Ed25519 point, i.e. whether a
    /// private key could exist for this address.
    pub fn is_on_curve(&self) -> bool {
        crate::derive::is_on_curve(&self.0)
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Pubkey> for [u8; 32] {
    fn from(key: Pubkey) -> Self {
        key.0
    }
}

impl FromStr for Pubkey {
    type Err = PdaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.to_base58())
    }
}
