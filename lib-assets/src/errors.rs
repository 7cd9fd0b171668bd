//! Asset Vault Errors

use lib_types::{Address, Amount, AssetId};
use thiserror::Error;

/// Error during vault operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Unknown asset: {0:?}")]
    UnknownAsset(AssetId),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Debit not authorized for {account:?}")]
    NotAuthorized { account: Address },

    #[error("Zero amount not allowed")]
    ZeroAmount,

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Result type for vault operations
pub type AssetResult<T> = Result<T, AssetError>;
