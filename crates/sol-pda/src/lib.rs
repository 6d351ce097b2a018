//! Program Derived Address (PDA) computation for Solana.
//!
//! A PDA is a 32-byte address computed from a program id and an ordered list
//! of seeds, chosen so that it is NOT a point on the Ed25519 curve. No private
//! key can sign for it, so the owning program can treat it as an account it
//! exclusively controls.
//!
//! The derivation is bit-exact with the on-chain runtime: seeds are encoded
//! canonically (see [`seed`]), hashed with SHA-256 together with a bump byte,
//! the program id and the `"ProgramDerivedAddress"` marker, and the bump is
//! searched from 255 down to 0.

pub mod address;
pub mod derive;
pub mod error;
pub mod seed;

pub use address::Pubkey;
pub use derive::{
    create_program_address, create_program_address_bytes, create_program_address_with_bump,
    find_program_address, find_program_address_bytes, is_on_curve,
};
pub use error::PdaError;
pub use seed::{encode, encode_all, EncodedSeed, SeedValue, MAX_SEEDS, MAX_SEED_LEN};
