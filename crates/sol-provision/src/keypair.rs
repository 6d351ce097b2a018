//! Ed25519 signing identities.
//!
//! The session holds its keypair as a plain field and hands the commit path
//! only the narrow [`TxSigner`] view of it.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use sol_pda::Pubkey;
use zeroize::Zeroize;

use crate::error::ProvisionError;
use crate::transaction::Signature;

/// Anything that can sign a transaction message.
pub trait TxSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    fn sign_message(&self, message: &[u8]) -> Signature;
}

/// An Ed25519 keypair. The secret half is zeroized on drop by
/// `ed25519-dalek`.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS random source.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a keypair from a 32-byte Ed25519 secret seed.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        let mut seed = *secret;
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing_key }
    }

    /// Build a keypair from the 64-byte `secret || public` layout used by
    /// Solana keypair files. The public half must match the secret.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, ProvisionError> {
        let mut arr: [u8; 64] = bytes.try_into().map_err(|_| {
            ProvisionError::Signing(format!("expected 64 keypair bytes, got {}", bytes.len()))
        })?;
        let result = SigningKey::from_keypair_bytes(&arr)
            .map_err(|e| ProvisionError::Signing(format!("keypair mismatch: {e}")));
        arr.zeroize();
        Ok(Self {
            signing_key: result?,
        })
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.signing_key.verifying_key().to_bytes())
    }
}

impl TxSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Keypair::pubkey(self)
    }

    fn sign_message(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

/// Signers required by a pending batch, in first-seen order, one entry per
/// public key.
#[derive(Debug, Clone, Default)]
pub struct SignerSet {
    signers: Vec<Keypair>,
}

impl SignerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `signer` unless a signer with the same public key is present.
    /// Returns whether it was added.
    pub fn insert(&mut self, signer: &Keypair) -> bool {
        if self.contains(&signer.pubkey()) {
            return false;
        }
        self.signers.push(signer.clone());
        true
    }

    pub fn contains(&self, key: &Pubkey) -> bool {
        self.signers.iter().any(|s| s.pubkey() == *key)
    }

    pub fn pubkeys(&self) -> Vec<Pubkey> {
        self.signers.iter().map(Keypair::pubkey).collect()
    }

    pub fn as_signers(&self) -> Vec<&dyn TxSigner> {
        self.signers.iter().map(|s| s as &dyn TxSigner).collect()
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn clear(&mut self) {
        self.signers.clear();
    }
}
