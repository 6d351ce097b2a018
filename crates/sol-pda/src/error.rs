use thiserror::Error;

/// Address derivation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PdaError {
    #[error("seed too large: {len} bytes (max {max})")]
    SeedTooLarge { len: usize, max: usize },

    #[error("too many seeds: {count} (max {max})")]
    TooManySeeds { count: usize, max: usize },

    #[error("no bump seed in 0..=255 yields an off-curve address")]
    NoValidAddress,

    #[error("derived address lies on the ed25519 curve")]
    OnCurveAddress,

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
