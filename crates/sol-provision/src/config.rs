use serde::{Deserialize, Serialize};

use crate::error::ProvisionError;
use crate::ledger::LAMPORTS_PER_SOL;

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Decimals used by [`define_and_fund_token_default`].
    ///
    /// [`define_and_fund_token_default`]: crate::session::ActorSession::define_and_fund_token_default
    pub default_decimals: u8,

    /// Raw units minted into the creator's account when a token is defined.
    pub initial_supply: u64,

    /// Lamports funding each new mint account. When unset the session asks
    /// the ledger once, at connect time.
    pub rent_exempt_mint_lamports: Option<u64>,

    /// Lamports requested by [`faucet_default`].
    ///
    /// [`faucet_default`]: crate::session::ActorSession::faucet_default
    pub default_airdrop_lamports: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_decimals: 9,
            initial_supply: 10_000_000_000_000_000_000,
            rent_exempt_mint_lamports: None,
            default_airdrop_lamports: 5 * LAMPORTS_PER_SOL,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ProvisionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ProvisionError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.initial_supply == 0 {
            return Err(ProvisionError::InvalidConfig(
                "initial_supply must be > 0".into(),
            ));
        }
        Ok(())
    }
}
