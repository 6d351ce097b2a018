use async_trait::async_trait;
use sol_pda::Pubkey;

use crate::error::LedgerError;
use crate::transaction::{Signature, SignedTransaction};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// A confirmed token balance as reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    pub raw: u64,
    pub decimals: u8,
}

/// The remote ledger a session submits to and reads confirmed state from.
///
/// Implementations own endpoint configuration, timeouts and cancellation.
/// Batches are applied all-or-nothing by the ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn latest_blockhash(&self) -> Result<[u8; 32], LedgerError>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize)
        -> Result<u64, LedgerError>;

    /// Submit a signed batch and wait until it is confirmed.
    async fn send_and_confirm(&self, tx: &SignedTransaction) -> Result<Signature, LedgerError>;

    /// Confirmed balance of a token account; `AccountNotFound` if it does
    /// not exist on chain.
    async fn token_account_balance(&self, account: &Pubkey) -> Result<TokenAmount, LedgerError>;

    /// Fund `to` from a faucet and wait for confirmation.
    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<(), LedgerError>;

    /// Native balance in lamports.
    async fn balance(&self, account: &Pubkey) -> Result<u64, LedgerError>;
}
