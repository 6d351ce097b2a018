//! In-memory ledger for session integration tests.
//!
//! Interprets the System, Token and Associated Token instructions the
//! session emits, verifies every signature, charges fees and rent, and
//! applies each transaction all-or-nothing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sol_provision::instruction::derive_associated_token_address;
use sol_provision::transaction::CompiledInstruction;
use sol_provision::{
    LedgerError, Ledger, Message, Pubkey, Signature, SignedTransaction, TokenAmount,
    ASSOCIATED_TOKEN_PROGRAM_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
};

pub const FEE_PER_SIGNATURE: u64 = 5_000;
pub const TOKEN_ACCOUNT_SIZE: usize = 165;

/// Rent-exempt minimum for `data_len` bytes (two years at the default rate).
pub fn rent_exempt_minimum(data_len: usize) -> u64 {
    (data_len as u64 + 128) * 3_480 * 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintState {
    pub authority: Pubkey,
    pub decimals: u8,
    pub supply: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccountState {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

#[derive(Debug, Clone, Default)]
struct State {
    lamports: HashMap<Pubkey, u64>,
    /// Accounts created through the System program: owner program id.
    allocated: HashMap<Pubkey, Pubkey>,
    mints: HashMap<Pubkey, MintState>,
    token_accounts: HashMap<Pubkey, TokenAccountState>,
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<State>,
    reject_next: Mutex<Option<String>>,
    submissions: Mutex<usize>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `send_and_confirm` fail with `Rejected(reason)`
    /// without touching state.
    pub fn reject_next(&self, reason: &str) {
        *self.reject_next.lock().unwrap() = Some(reason.to_owned());
    }

    /// Number of transactions received, including rejected ones.
    pub fn submissions(&self) -> usize {
        *self.submissions.lock().unwrap()
    }

    pub fn mint(&self, mint: &Pubkey) -> Option<MintState> {
        self.state.lock().unwrap().mints.get(mint).copied()
    }

    pub fn token_account(&self, account: &Pubkey) -> Option<TokenAccountState> {
        self.state.lock().unwrap().token_accounts.get(account).copied()
    }

    pub fn lamports(&self, account: &Pubkey) -> u64 {
        self.state
            .lock()
            .unwrap()
            .lamports
            .get(account)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn latest_blockhash(&self) -> Result<[u8; 32], LedgerError> {
        Ok([7u8; 32])
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, LedgerError> {
        Ok(rent_exempt_minimum(data_len))
    }

    async fn send_and_confirm(&self, tx: &SignedTransaction) -> Result<Signature, LedgerError> {
        *self.submissions.lock().unwrap() += 1;

        if let Some(reason) = self.reject_next.lock().unwrap().take() {
            return Err(LedgerError::Rejected(reason));
        }

        tx.verify()
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;
        let id = tx
            .id()
            .ok_or_else(|| LedgerError::Rejected("transaction has no signatures".into()))?;

        let mut guard = self.state.lock().unwrap();
        let mut next = guard.clone();
        execute(&mut next, &tx.message)?;
        *guard = next;
        Ok(id)
    }

    async fn token_account_balance(&self, account: &Pubkey) -> Result<TokenAmount, LedgerError> {
        let state = self.state.lock().unwrap();
        let holding = state
            .token_accounts
            .get(account)
            .ok_or(LedgerError::AccountNotFound(*account))?;
        let mint = state
            .mints
            .get(&holding.mint)
            .ok_or(LedgerError::AccountNotFound(holding.mint))?;
        Ok(TokenAmount {
            raw: holding.amount,
            decimals: mint.decimals,
        })
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        let balance = state.lamports.entry(*to).or_insert(0);
        *balance = balance
            .checked_add(lamports)
            .ok_or_else(|| LedgerError::Rejected("lamport overflow".into()))?;
        Ok(())
    }

    async fn balance(&self, account: &Pubkey) -> Result<u64, LedgerError> {
        Ok(self.lamports(account))
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

fn rejected(msg: impl Into<String>) -> LedgerError {
    LedgerError::Rejected(msg.into())
}

fn execute(state: &mut State, message: &Message) -> Result<(), LedgerError> {
    let fee_payer = *message
        .account_keys
        .first()
        .ok_or_else(|| rejected("message has no accounts"))?;
    debit(
        state,
        &fee_payer,
        FEE_PER_SIGNATURE * u64::from(message.num_required_signatures),
    )?;

    for ix in &message.instructions {
        let ctx = IxContext::resolve(message, ix)?;
        if ctx.program == SYSTEM_PROGRAM_ID {
            system(state, &ctx)?;
        } else if ctx.program == TOKEN_PROGRAM_ID {
            token(state, &ctx)?;
        } else if ctx.program == ASSOCIATED_TOKEN_PROGRAM_ID {
            associated_token(state, &ctx)?;
        } else {
            return Err(rejected(format!("unknown program {}", ctx.program)));
        }
    }
    Ok(())
}

struct IxContext<'a> {
    program: Pubkey,
    accounts: Vec<(Pubkey, bool)>,
    data: &'a [u8],
}

impl<'a> IxContext<'a> {
    fn resolve(message: &Message, ix: &'a CompiledInstruction) -> Result<Self, LedgerError> {
        let key = |i: u8| {
            message
                .account_keys
                .get(usize::from(i))
                .copied()
                .ok_or_else(|| rejected(format!("account index {i} out of range")))
        };
        let program = key(ix.program_id_index)?;
        let accounts = ix
            .account_indices
            .iter()
            .map(|&i| Ok((key(i)?, message.is_signer(usize::from(i)))))
            .collect::<Result<Vec<_>, LedgerError>>()?;
        Ok(Self {
            program,
            accounts,
            data: &ix.data,
        })
    }

    fn account(&self, n: usize) -> Result<Pubkey, LedgerError> {
        self.accounts
            .get(n)
            .map(|(key, _)| *key)
            .ok_or_else(|| rejected(format!("missing account #{n}")))
    }

    fn signer(&self, n: usize) -> Result<Pubkey, LedgerError> {
        match self.accounts.get(n) {
            Some((key, true)) => Ok(*key),
            Some((key, false)) => Err(rejected(format!("{key} must sign"))),
            None => Err(rejected(format!("missing account #{n}"))),
        }
    }

    fn u64_at(&self, offset: usize) -> Result<u64, LedgerError> {
        self.data
            .get(offset..offset + 8)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or_else(|| rejected("instruction data too short"))
    }

    fn pubkey_at(&self, offset: usize) -> Result<Pubkey, LedgerError> {
        self.data
            .get(offset..offset + 32)
            .and_then(|b| <[u8; 32]>::try_from(b).ok())
            .map(Pubkey::new)
            .ok_or_else(|| rejected("instruction data too short"))
    }
}

fn debit(state: &mut State, account: &Pubkey, lamports: u64) -> Result<(), LedgerError> {
    let balance = state.lamports.entry(*account).or_insert(0);
    *balance = balance
        .checked_sub(lamports)
        .ok_or_else(|| rejected(format!("insufficient lamports in {account}")))?;
    Ok(())
}

fn credit(state: &mut State, account: &Pubkey, lamports: u64) {
    *state.lamports.entry(*account).or_insert(0) += lamports;
}

fn system(state: &mut State, ctx: &IxContext<'_>) -> Result<(), LedgerError> {
    if ctx.data.get(..4) != Some(&0u32.to_le_bytes()[..]) {
        return Err(rejected("unsupported system instruction"));
    }
    let from = ctx.signer(0)?;
    let new_account = ctx.signer(1)?;
    let lamports = ctx.u64_at(4)?;
    let owner = ctx.pubkey_at(20)?;

    if state.allocated.contains_key(&new_account) {
        return Err(rejected(format!("account {new_account} already in use")));
    }
    debit(state, &from, lamports)?;
    credit(state, &new_account, lamports);
    state.allocated.insert(new_account, owner);
    Ok(())
}

fn token(state: &mut State, ctx: &IxContext<'_>) -> Result<(), LedgerError> {
    match ctx.data.first() {
        Some(0) => {
            let mint = ctx.account(0)?;
            if state.allocated.get(&mint) != Some(&TOKEN_PROGRAM_ID) {
                return Err(rejected(format!("{mint} is not owned by the token program")));
            }
            if state.mints.contains_key(&mint) {
                return Err(rejected(format!("mint {mint} already initialized")));
            }
            let decimals = *ctx
                .data
                .get(1)
                .ok_or_else(|| rejected("instruction data too short"))?;
            let authority = ctx.pubkey_at(2)?;
            state.mints.insert(
                mint,
                MintState {
                    authority,
                    decimals,
                    supply: 0,
                },
            );
            Ok(())
        }
        Some(7) => {
            let mint = ctx.account(0)?;
            let destination = ctx.account(1)?;
            let authority = ctx.signer(2)?;
            let amount = ctx.u64_at(1)?;

            let mint_state = state
                .mints
                .get_mut(&mint)
                .ok_or_else(|| rejected(format!("unknown mint {mint}")))?;
            if mint_state.authority != authority {
                return Err(rejected("wrong mint authority"));
            }
            mint_state.supply = mint_state
                .supply
                .checked_add(amount)
                .ok_or_else(|| rejected("supply overflow"))?;

            let holding = state
                .token_accounts
                .get_mut(&destination)
                .filter(|a| a.mint == mint)
                .ok_or_else(|| rejected(format!("invalid destination {destination}")))?;
            holding.amount += amount;
            Ok(())
        }
        Some(3) => {
            let source = ctx.account(0)?;
            let destination = ctx.account(1)?;
            let owner = ctx.signer(2)?;
            let amount = ctx.u64_at(1)?;

            let src = state
                .token_accounts
                .get(&source)
                .copied()
                .ok_or_else(|| rejected(format!("unknown source {source}")))?;
            if src.owner != owner {
                return Err(rejected("source not owned by signer"));
            }
            if src.amount < amount {
                return Err(rejected("insufficient token balance"));
            }
            let dst = state
                .token_accounts
                .get(&destination)
                .copied()
                .ok_or_else(|| rejected(format!("unknown destination {destination}")))?;
            if dst.mint != src.mint {
                return Err(rejected("mint mismatch"));
            }

            if let Some(a) = state.token_accounts.get_mut(&source) {
                a.amount -= amount;
            }
            if let Some(a) = state.token_accounts.get_mut(&destination) {
                a.amount += amount;
            }
            Ok(())
        }
        _ => Err(rejected("unsupported token instruction")),
    }
}

fn associated_token(state: &mut State, ctx: &IxContext<'_>) -> Result<(), LedgerError> {
    if ctx.data != [1u8].as_slice() {
        return Err(rejected("only CreateIdempotent is supported"));
    }
    let payer = ctx.signer(0)?;
    let account = ctx.account(1)?;
    let owner = ctx.account(2)?;
    let mint = ctx.account(3)?;

    if let Some(existing) = state.token_accounts.get(&account) {
        return if existing.mint == mint && existing.owner == owner {
            Ok(())
        } else {
            Err(rejected(format!("{account} holds a different token")))
        };
    }

    let expected = derive_associated_token_address(&owner, &mint)
        .map_err(|e| rejected(e.to_string()))?;
    if expected != account {
        return Err(rejected(format!("{account} is not the associated account")));
    }
    if !state.mints.contains_key(&mint) {
        return Err(rejected(format!("unknown mint {mint}")));
    }

    let rent = rent_exempt_minimum(TOKEN_ACCOUNT_SIZE);
    debit(state, &payer, rent)?;
    credit(state, &account, rent);
    state.token_accounts.insert(
        account,
        TokenAccountState {
            mint,
            owner,
            amount: 0,
        },
    );
    Ok(())
}
