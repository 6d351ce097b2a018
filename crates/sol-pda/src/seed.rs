//! Canonical seed encoding.
//!
//! Both sides of a derivation (the on-chain program and any off-chain client)
//! must agree on the seed bytes, so each seed kind has exactly one encoding:
//!
//! | Seed        | Bytes                                   |
//! |-------------|-----------------------------------------|
//! | `Text`      | raw UTF-8                               |
//! | `Identity`  | the 32 address bytes                    |
//! | `U8`..`U64` | `width / 8` bytes, little-endian        |

use crate::address::Pubkey;
use crate::error::PdaError;

/// Maximum length of a single encoded seed.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds in one address computation, bump included.
pub const MAX_SEEDS: usize = 16;

/// A seed value before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedValue {
    Text(String),
    Identity(Pubkey),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
}

impl SeedValue {
    /// Bit width of an unsigned-integer seed, `None` for other kinds.
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            SeedValue::U8(_) => Some(8),
            SeedValue::U16(_) => Some(16),
            SeedValue::U32(_) => Some(32),
            SeedValue::U64(_) => Some(64),
            SeedValue::Text(_) | SeedValue::Identity(_) => None,
        }
    }
}

impl From<&str> for SeedValue {
    fn from(s: &str) -> Self {
        SeedValue::Text(s.to_owned())
    }
}

impl From<String> for SeedValue {
    fn from(s: String) -> Self {
        SeedValue::Text(s)
    }
}

impl From<Pubkey> for SeedValue {
    fn from(key: Pubkey) -> Self {
        SeedValue::Identity(key)
    }
}

impl From<u8> for SeedValue {
    fn from(v: u8) -> Self {
        SeedValue::U8(v)
    }
}

impl From<u16> for SeedValue {
    fn from(v: u16) -> Self {
        SeedValue::U16(v)
    }
}

impl From<u32> for SeedValue {
    fn from(v: u32) -> Self {
        SeedValue::U32(v)
    }
}

impl From<u64> for SeedValue {
    fn from(v: u64) -> Self {
        SeedValue::U64(v)
    }
}

/// The canonical bytes of one seed, at most [`MAX_SEED_LEN`] long.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedSeed(Vec<u8>);

impl EncodedSeed {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for EncodedSeed {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encode a single seed.
///
/// Only `Text` can fail: a string longer than 32 UTF-8 bytes is rejected
/// rather than truncated.
pub fn encode(seed: &SeedValue) -> Result<EncodedSeed, PdaError> {
    let bytes = match seed {
        SeedValue::Text(s) => s.as_bytes().to_vec(),
        SeedValue::Identity(key) => key.as_bytes().to_vec(),
        SeedValue::U8(v) => v.to_le_bytes().to_vec(),
        SeedValue::U16(v) => v.to_le_bytes().to_vec(),
        SeedValue::U32(v) => v.to_le_bytes().to_vec(),
        SeedValue::U64(v) => v.to_le_bytes().to_vec(),
    };

    if bytes.len() > MAX_SEED_LEN {
        return Err(PdaError::SeedTooLarge {
            len: bytes.len(),
            max: MAX_SEED_LEN,
        });
    }

    Ok(EncodedSeed(bytes))
}

/// Encode every seed in order, failing on the first oversized one.
pub fn encode_all(seeds: &[SeedValue]) -> Result<Vec<EncodedSeed>, PdaError> {
    seeds.iter().map(encode).collect()
}
