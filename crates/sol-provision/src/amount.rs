//! Display amounts (`f64`) versus raw on-chain amounts (`u64` scaled by
//! `10^decimals`).
//!
//! Scaling goes through `rust_decimal` rather than float multiplication: the
//! amount is parsed from its shortest round-trip decimal string, so `0.1`
//! with 6 decimals is exactly `100_000`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ProvisionError;

/// Decimals of the native SOL unit.
const SOL_DECIMALS: u8 = 9;

/// A token balance as shown to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub amount: f64,
    pub raw_amount: u64,
    /// `None` when the token is not known to the session at all.
    pub decimals: Option<u8>,
}

impl BalanceInfo {
    pub fn zero(decimals: Option<u8>) -> Self {
        Self {
            amount: 0.0,
            raw_amount: 0,
            decimals,
        }
    }

    pub fn from_raw(raw_amount: u64, decimals: u8) -> Self {
        Self {
            amount: raw_to_ui(raw_amount, decimals),
            raw_amount,
            decimals: Some(decimals),
        }
    }
}

/// Largest scale a `Decimal` can represent.
const MAX_DECIMAL_SCALE: u8 = 28;

/// Scale a display amount to raw units.
///
/// Fails for negative or non-finite amounts, for amounts with more
/// fractional digits than `decimals`, and for results that overflow `u64`.
pub fn ui_to_raw(amount: f64, decimals: u8) -> Result<u64, ProvisionError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ProvisionError::InvalidAmount(format!(
            "{amount} is not a finite, non-negative amount"
        )));
    }
    if amount == 0.0 {
        return Ok(0);
    }
    if decimals > MAX_DECIMAL_SCALE {
        return Err(ProvisionError::InvalidAmount(format!(
            "{decimals} decimals exceed the supported {MAX_DECIMAL_SCALE}"
        )));
    }

    let overflow =
        || ProvisionError::InvalidAmount(format!("{amount} * 10^{decimals} overflows u64"));

    // f64 Display never uses exponent notation.
    let value = Decimal::from_str_exact(&amount.to_string()).map_err(|_| overflow())?;
    let scale = Decimal::from_i128_with_scale(10i128.pow(u32::from(decimals)), 0);
    let raw = value.checked_mul(scale).ok_or_else(overflow)?;

    if !raw.fract().is_zero() {
        return Err(ProvisionError::InvalidAmount(format!(
            "{amount} has more than {decimals} fractional digits"
        )));
    }

    raw.to_u64().ok_or_else(overflow)
}

/// Convert raw units to a display amount.
pub fn raw_to_ui(raw: u64, decimals: u8) -> f64 {
    Decimal::try_from_i128_with_scale(i128::from(raw), u32::from(decimals))
        .ok()
        .and_then(|d| d.to_f64())
        // Scales past 28 are outside Decimal's range.
        .unwrap_or_else(|| raw as f64 / 10f64.powi(i32::from(decimals)))
}

pub fn sol_to_lamports(sol: f64) -> Result<u64, ProvisionError> {
    ui_to_raw(sol, SOL_DECIMALS)
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    raw_to_ui(lamports, SOL_DECIMALS)
}
