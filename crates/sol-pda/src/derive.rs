//! Program Derived Address search and direct creation.
//!
//! ```text
//! address = SHA-256(seed_0 || ... || seed_n || [bump] || program_id || "ProgramDerivedAddress")
//! ```
//!
//! The result is only valid if it is NOT an Ed25519 point. `find_*` scans the
//! bump from 255 down to 0 and returns the first valid one; that bump is the
//! canonical one every implementation agrees on.

use sha2::{Digest, Sha256};

use crate::address::Pubkey;
use crate::error::PdaError;
use crate::seed::{encode_all, EncodedSeed, SeedValue, MAX_SEEDS, MAX_SEED_LEN};

/// Domain separator appended after the program id.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Find the canonical PDA and its bump for `seeds` under `program_id`.
pub fn find_program_address(
    program_id: &Pubkey,
    seeds: &[SeedValue],
) -> Result<(Pubkey, u8), PdaError> {
    let encoded = encode_all(seeds)?;
    find_program_address_bytes(&as_slices(&encoded), program_id)
}

/// Compute the PDA for `seeds` with a caller-supplied bump, without searching.
///
/// Fails with [`PdaError::OnCurveAddress`] if that bump lands on the curve.
pub fn create_program_address_with_bump(
    program_id: &Pubkey,
    seeds: &[SeedValue],
    bump: u8,
) -> Result<Pubkey, PdaError> {
    let encoded = encode_all(seeds)?;
    let mut slices = as_slices(&encoded);
    let bump_seed = [bump];
    slices.push(&bump_seed);
    create_program_address_bytes(&slices, program_id)
}

/// Compute the PDA for `seeds` as given. A bump, if any, is expected as the
/// last seed (typically `SeedValue::U8(bump)`).
pub fn create_program_address(
    program_id: &Pubkey,
    seeds: &[SeedValue],
) -> Result<Pubkey, PdaError> {
    let encoded = encode_all(seeds)?;
    create_program_address_bytes(&as_slices(&encoded), program_id)
}

/// Bump search over pre-encoded seeds.
///
/// Iterates bump seeds from 255 down to 0 and returns the first result that
/// is NOT a valid Ed25519 point.
pub fn find_program_address_bytes(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), PdaError> {
    // One slot is reserved for the bump.
    check_seeds(seeds, MAX_SEEDS - 1)?;

    for bump in (0u8..=255).rev() {
        let hash = hash_seeds(seeds, &[bump], program_id);
        if !is_on_curve(&hash) {
            return Ok((Pubkey::new(hash), bump));
        }
    }

    Err(PdaError::NoValidAddress)
}

/// Direct creation over pre-encoded seeds.
pub fn create_program_address_bytes(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<Pubkey, PdaError> {
    check_seeds(seeds, MAX_SEEDS)?;

    let hash = hash_seeds(seeds, &[], program_id);
    if is_on_curve(&hash) {
        return Err(PdaError::OnCurveAddress);
    }

    Ok(Pubkey::new(hash))
}

/// Check if 32 bytes represent a valid Ed25519 curve point.
///
/// Uses `curve25519-dalek` to attempt decompression. If it succeeds, the
/// point is on the curve.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

fn hash_seeds(seeds: &[&[u8]], bump_seed: &[u8], program_id: &Pubkey) -> [u8; 32] {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    hasher.finalize().into()
}

fn check_seeds(seeds: &[&[u8]], max_seeds: usize) -> Result<(), PdaError> {
    if seeds.len() > max_seeds {
        return Err(PdaError::TooManySeeds {
            count: seeds.len(),
            max: max_seeds,
        });
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(PdaError::SeedTooLarge {
            len: seed.len(),
            max: MAX_SEED_LEN,
        });
    }
    Ok(())
}

fn as_slices(encoded: &[EncodedSeed]) -> Vec<&[u8]> {
    encoded.iter().map(EncodedSeed::as_bytes).collect()
}
