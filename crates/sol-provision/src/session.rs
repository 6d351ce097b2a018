//! Batched token provisioning for one actor.
//!
//! Every mutating call updates the session's bookkeeping immediately and
//! queues instructions; nothing reaches the ledger until [`ActorSession::commit`]
//! submits the whole batch as one transaction.
//!
//! ```text
//! Idle --define/transfer--> Accumulating --commit--> Submitting
//!   ^                            ^                      |
//!   |                            +------ failure -------+
//!   +------------------- success ------------------------+
//! ```
//!
//! The `tokens`/`accounts` maps record intent. They are not rolled back by
//! `reset` or by a failed commit; callers that need confirmed state read it
//! back with [`ActorSession::query_balance`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sol_pda::Pubkey;
use tracing::{debug, info, warn};

use crate::amount::{self, BalanceInfo};
use crate::config::SessionConfig;
use crate::error::ProvisionError;
use crate::instruction::{self, Instruction, MINT_SIZE, TOKEN_PROGRAM_ID};
use crate::keypair::{Keypair, SignerSet};
use crate::ledger::{Ledger, TokenAmount};
use crate::transaction::{compile_message, sign_transaction, Signature};

/// What a session knows about one token symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub mint: Pubkey,
    pub decimals: u8,
}

#[derive(Debug, Default)]
struct Holdings {
    tokens: HashMap<String, TokenInfo>,
    accounts: HashMap<String, Pubkey>,
}

#[derive(Debug, Default)]
struct Batch {
    instructions: Vec<Instruction>,
    signers: SignerSet,
}

impl Batch {
    fn push(&mut self, ix: Instruction) {
        self.instructions.push(ix);
    }

    fn require(&mut self, signer: &Keypair) {
        self.signers.insert(signer);
    }

    /// Return `owner`'s account for `symbol`, queueing its creation (paid by
    /// `payer`) the first time it is needed.
    fn ensure_holding_account(
        &mut self,
        payer: &Keypair,
        owner: &Pubkey,
        holdings: &mut Holdings,
        symbol: &str,
        mint: &Pubkey,
    ) -> Result<Pubkey, ProvisionError> {
        if let Some(account) = holdings.accounts.get(symbol) {
            return Ok(*account);
        }

        let account = instruction::derive_associated_token_address(owner, mint)?;
        self.record_holding_account(payer, owner, holdings, symbol, mint, account);
        Ok(account)
    }

    fn record_holding_account(
        &mut self,
        payer: &Keypair,
        owner: &Pubkey,
        holdings: &mut Holdings,
        symbol: &str,
        mint: &Pubkey,
        account: Pubkey,
    ) {
        holdings.accounts.insert(symbol.to_owned(), account);
        self.push(instruction::create_associated_token_account_idempotent(
            &payer.pubkey(),
            &account,
            owner,
            mint,
        ));
        self.require(payer);
        debug!(%owner, %account, symbol, "queued holding account creation");
    }

    fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    fn clear(&mut self) {
        self.instructions.clear();
        self.signers.clear();
    }
}

/// A provisioning session bound to one actor and one ledger connection.
pub struct ActorSession {
    keypair: Keypair,
    ledger: Arc<dyn Ledger>,
    config: SessionConfig,
    rent_exempt_mint_lamports: u64,
    holdings: Holdings,
    batch: Batch,
}

impl ActorSession {
    /// Open a session for `keypair`. The rent-exempt minimum for a mint
    /// account is taken from `config` or queried from the ledger once here.
    pub async fn connect(
        ledger: Arc<dyn Ledger>,
        keypair: Keypair,
        config: SessionConfig,
    ) -> Result<Self, ProvisionError> {
        config.validate()?;

        let rent_exempt_mint_lamports = match config.rent_exempt_mint_lamports {
            Some(lamports) => lamports,
            None => {
                ledger
                    .minimum_balance_for_rent_exemption(MINT_SIZE as usize)
                    .await?
            }
        };

        debug!(actor = %keypair.pubkey(), rent_exempt_mint_lamports, "session connected");

        Ok(Self {
            keypair,
            ledger,
            config,
            rent_exempt_mint_lamports,
            holdings: Holdings::default(),
            batch: Batch::default(),
        })
    }

    /// Open a session for a freshly generated keypair.
    pub async fn generate(
        ledger: Arc<dyn Ledger>,
        config: SessionConfig,
    ) -> Result<Self, ProvisionError> {
        Self::connect(ledger, Keypair::generate(), config).await
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn rent_exempt_mint_lamports(&self) -> u64 {
        self.rent_exempt_mint_lamports
    }

    pub fn token(&self, symbol: &str) -> Option<&TokenInfo> {
        self.holdings.tokens.get(symbol)
    }

    pub fn holding_account(&self, symbol: &str) -> Option<Pubkey> {
        self.holdings.accounts.get(symbol).copied()
    }

    pub fn pending_ops(&self) -> &[Instruction] {
        &self.batch.instructions
    }

    pub fn required_signers(&self) -> Vec<Pubkey> {
        self.batch.signers.pubkeys()
    }

    pub fn is_idle(&self) -> bool {
        self.batch.is_empty()
    }

    // -----------------------------------------------------------------------
    // Queued operations
    // -----------------------------------------------------------------------

    /// Create a new token with this actor as mint authority and mint the
    /// configured initial supply into the actor's own holding account.
    ///
    /// Queues, in order: create the mint account, initialize the mint,
    /// create the actor's holding account, mint the initial supply.
    ///
    /// A symbol already known to this session (defined or received) is
    /// rejected with [`ProvisionError::DuplicateSymbol`].
    pub fn define_and_fund_token(
        &mut self,
        symbol: &str,
        decimals: u8,
    ) -> Result<&mut Self, ProvisionError> {
        if self.holdings.tokens.contains_key(symbol) {
            return Err(ProvisionError::DuplicateSymbol(symbol.to_owned()));
        }

        let mint = Keypair::generate();
        let mint_id = mint.pubkey();
        let owner = self.keypair.pubkey();
        let account = instruction::derive_associated_token_address(&owner, &mint_id)?;

        self.holdings.tokens.insert(
            symbol.to_owned(),
            TokenInfo {
                mint: mint_id,
                decimals,
            },
        );

        self.batch.push(instruction::create_account(
            &owner,
            &mint_id,
            self.rent_exempt_mint_lamports,
            MINT_SIZE,
            &TOKEN_PROGRAM_ID,
        ));
        self.batch.require(&self.keypair);
        self.batch.require(&mint);

        self.batch
            .push(instruction::initialize_mint(&mint_id, &owner, None, decimals));

        self.batch.record_holding_account(
            &self.keypair,
            &owner,
            &mut self.holdings,
            symbol,
            &mint_id,
            account,
        );

        self.batch.push(instruction::mint_to(
            &mint_id,
            &account,
            &owner,
            self.config.initial_supply,
        ));

        debug!(
            actor = %owner,
            symbol,
            mint = %mint_id,
            decimals,
            supply = self.config.initial_supply,
            "queued token definition"
        );

        Ok(self)
    }

    /// [`define_and_fund_token`](Self::define_and_fund_token) with the
    /// configured default decimals.
    pub fn define_and_fund_token_default(
        &mut self,
        symbol: &str,
    ) -> Result<&mut Self, ProvisionError> {
        let decimals = self.config.default_decimals;
        self.define_and_fund_token(symbol, decimals)
    }

    /// Make sure this actor's own holding account for `symbol` exists,
    /// queueing its creation at most once.
    pub fn ensure_holding_account(&mut self, symbol: &str) -> Result<Pubkey, ProvisionError> {
        let info = self.token_info(symbol)?;
        let owner = self.keypair.pubkey();
        self.batch.ensure_holding_account(
            &self.keypair,
            &owner,
            &mut self.holdings,
            symbol,
            &info.mint,
        )
    }

    /// Make sure `owner`'s holding account for this actor's `symbol` exists,
    /// paid by this actor, and register the token with `owner`'s session.
    pub fn ensure_holding_account_for(
        &mut self,
        symbol: &str,
        owner: &mut ActorSession,
    ) -> Result<Pubkey, ProvisionError> {
        let info = self.token_info(symbol)?;
        self.provision_receiver(symbol, info, owner)
    }

    /// Queue a transfer of `amount` display units of `symbol` to `to`,
    /// creating `to`'s holding account first if this is its first `symbol`.
    pub fn transfer(
        &mut self,
        symbol: &str,
        amount: f64,
        to: &mut ActorSession,
    ) -> Result<&mut Self, ProvisionError> {
        let info = self.token_info(symbol)?;
        let source = self
            .holding_account(symbol)
            .ok_or_else(|| ProvisionError::UnknownSymbol(symbol.to_owned()))?;

        let raw = amount::ui_to_raw(amount, info.decimals)?;
        if raw == 0 {
            return Err(ProvisionError::InvalidAmount(
                "transfer amount must be > 0".into(),
            ));
        }

        let destination = self.provision_receiver(symbol, info, to)?;
        let owner = self.keypair.pubkey();

        self.batch
            .push(instruction::transfer(&source, &destination, &owner, raw));
        self.batch.require(&self.keypair);

        debug!(
            from = %owner,
            to = %to.pubkey(),
            symbol,
            raw,
            "queued transfer"
        );

        Ok(self)
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Submit every queued instruction as one atomic transaction and wait
    /// for confirmation.
    ///
    /// Returns `None` without touching the ledger when nothing is queued. On
    /// failure the ledger's error is returned and the batch is kept, so the
    /// caller can retry or [`reset`](Self::reset).
    pub async fn commit(&mut self) -> Result<Option<Signature>, ProvisionError> {
        if self.batch.is_empty() {
            return Ok(None);
        }

        let actor = self.keypair.pubkey();
        let blockhash = self.ledger.latest_blockhash().await?;
        let message = compile_message(&self.batch.instructions, &actor, &blockhash)?;
        let tx = sign_transaction(message, &self.batch.signers.as_signers())?;

        info!(
            %actor,
            instructions = self.batch.instructions.len(),
            signers = self.batch.signers.len(),
            "submitting batch"
        );

        match self.ledger.send_and_confirm(&tx).await {
            Ok(signature) => {
                info!(%actor, %signature, "batch confirmed");
                self.batch.clear();
                Ok(Some(signature))
            }
            Err(e) => {
                warn!(%actor, error = %e, "batch failed; pending operations kept");
                Err(e.into())
            }
        }
    }

    /// Drop every queued instruction and signer without submitting.
    pub fn reset(&mut self) {
        debug!(
            actor = %self.keypair.pubkey(),
            discarded = self.batch.instructions.len(),
            "batch reset"
        );
        self.batch.clear();
    }

    // -----------------------------------------------------------------------
    // Confirmed state
    // -----------------------------------------------------------------------

    /// Confirmed balance of this actor's holding account for `symbol`.
    ///
    /// Zero (with the locally known decimals, if any) when no holding
    /// account has been provisioned. Queued operations are never counted.
    pub async fn query_balance(&self, symbol: &str) -> Result<BalanceInfo, ProvisionError> {
        let Some(account) = self.holding_account(symbol) else {
            return Ok(BalanceInfo::zero(self.token(symbol).map(|t| t.decimals)));
        };

        let TokenAmount { raw, decimals } = self.ledger.token_account_balance(&account).await?;
        Ok(BalanceInfo::from_raw(raw, decimals))
    }

    /// Airdrop `sol` SOL to this actor and wait for it to land.
    pub async fn faucet(&self, sol: f64) -> Result<(), ProvisionError> {
        self.airdrop(amount::sol_to_lamports(sol)?).await
    }

    /// Airdrop the configured default amount (5 SOL unless overridden).
    pub async fn faucet_default(&self) -> Result<(), ProvisionError> {
        self.airdrop(self.config.default_airdrop_lamports).await
    }

    /// Native balance in SOL.
    pub async fn sol(&self) -> Result<f64, ProvisionError> {
        let lamports = self.ledger.balance(&self.keypair.pubkey()).await?;
        Ok(amount::lamports_to_sol(lamports))
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn airdrop(&self, lamports: u64) -> Result<(), ProvisionError> {
        self.ledger
            .request_airdrop(&self.keypair.pubkey(), lamports)
            .await?;
        debug!(actor = %self.keypair.pubkey(), lamports, "airdrop confirmed");
        Ok(())
    }

    fn token_info(&self, symbol: &str) -> Result<TokenInfo, ProvisionError> {
        self.token(symbol)
            .copied()
            .ok_or_else(|| ProvisionError::UnknownSymbol(symbol.to_owned()))
    }

    fn provision_receiver(
        &mut self,
        symbol: &str,
        info: TokenInfo,
        receiver: &mut ActorSession,
    ) -> Result<Pubkey, ProvisionError> {
        if let Some(existing) = receiver.token(symbol) {
            if existing.mint != info.mint {
                warn!(
                    receiver = %receiver.pubkey(),
                    symbol,
                    known_mint = %existing.mint,
                    mint = %info.mint,
                    "symbol already bound to another mint"
                );
                return Err(ProvisionError::DuplicateSymbol(symbol.to_owned()));
            }
        }

        let owner = receiver.pubkey();
        let account = self.batch.ensure_holding_account(
            &self.keypair,
            &owner,
            &mut receiver.holdings,
            symbol,
            &info.mint,
        )?;
        receiver
            .holdings
            .tokens
            .entry(symbol.to_owned())
            .or_insert(info);
        Ok(account)
    }
}

impl fmt::Debug for ActorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSession")
            .field("actor", &self.keypair.pubkey())
            .field("tokens", &self.holdings.tokens)
            .field("pending", &self.batch.instructions.len())
            .field("signers", &self.batch.signers.len())
            .finish_non_exhaustive()
    }
}
