//! Batched SPL token provisioning for test actors.
//!
//! An [`ActorSession`] wraps one keypair and a [`Ledger`] connection. Token
//! definitions, holding-account creation and transfers are queued locally
//! and submitted together as one signed transaction on
//! [`ActorSession::commit`].
//!
//! The wire format (legacy messages, System/Token/Associated Token program
//! instructions) is built by hand on top of `ed25519-dalek` and `bs58`;
//! holding accounts are PDAs derived with [`sol_pda`].

pub mod amount;
pub mod config;
pub mod error;
pub mod instruction;
pub mod keypair;
pub mod ledger;
pub mod session;
pub mod transaction;

pub use amount::BalanceInfo;
pub use config::SessionConfig;
pub use error::{LedgerError, ProvisionError};
pub use instruction::{
    derive_associated_token_address, AccountMeta, Instruction, ASSOCIATED_TOKEN_PROGRAM_ID,
    MINT_SIZE, SYSTEM_PROGRAM_ID, SYSVAR_RENT_ID, TOKEN_PROGRAM_ID,
};
pub use keypair::{Keypair, SignerSet, TxSigner};
pub use ledger::{Ledger, TokenAmount, LAMPORTS_PER_SOL};
pub use session::{ActorSession, TokenInfo};
pub use sol_pda::Pubkey;
pub use transaction::{Message, Signature, SignedTransaction};
