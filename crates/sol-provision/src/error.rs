use sol_pda::{PdaError, Pubkey};
use thiserror::Error;

/// Failures reported by the remote ledger. They are passed through the
/// session unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("network error: {0}")]
    Network(String),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("account not found: {0}")]
    AccountNotFound(Pubkey),
}

/// Provisioning session errors.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("unknown token symbol: {0}")]
    UnknownSymbol(String),

    #[error("token symbol already registered: {0}")]
    DuplicateSymbol(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("transaction build error: {0}")]
    TransactionBuild(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Pda(#[from] PdaError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_symbol() {
        let err = ProvisionError::UnknownSymbol("USDC".into());
        assert_eq!(err.to_string(), "unknown token symbol: USDC");
    }

    #[test]
    fn display_duplicate_symbol() {
        let err = ProvisionError::DuplicateSymbol("USDC".into());
        assert_eq!(err.to_string(), "token symbol already registered: USDC");
    }

    #[test]
    fn display_invalid_amount() {
        let err = ProvisionError::InvalidAmount("negative".into());
        assert_eq!(err.to_string(), "invalid amount: negative");
    }

    #[test]
    fn ledger_errors_pass_through_unchanged() {
        let inner = LedgerError::Rejected("blockhash not found".into());
        let err: ProvisionError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
        assert!(matches!(err, ProvisionError::Ledger(e) if e == inner));
    }

    #[test]
    fn pda_errors_pass_through_unchanged() {
        let err: ProvisionError = PdaError::OnCurveAddress.into();
        assert_eq!(err.to_string(), "derived address lies on the ed25519 curve");
    }

    #[test]
    fn display_account_not_found() {
        let err = LedgerError::AccountNotFound(Pubkey::new([0u8; 32]));
        assert_eq!(
            err.to_string(),
            "account not found: 11111111111111111111111111111111"
        );
    }

    #[test]
    fn debug_format_works() {
        let err = ProvisionError::Signing("fail".into());
        assert!(format!("{err:?}").contains("Signing"));
    }
}
