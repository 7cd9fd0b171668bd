//! Asset Vault Trait
//!
//! The minimal transfer interface the raise ledger needs. Implementations
//! are provided by the host: a chain adapter in production, an in-memory
//! map in tests. All methods take `&self` so a vault can sit behind an
//! `Arc` and be shared across ledger handles.

use lib_types::{Address, Amount, AssetId};

use crate::errors::AssetResult;

/// Transfer capability for a set of assets
///
/// # Custody model
///
/// Each raise owns a custody account. `debit` pulls contributor funds
/// into it; `credit` pays funds out of it. A vault implementation must
/// make each call atomic: on error, no balance changes.
pub trait AssetVault: Send + Sync {
    /// Declared smallest-unit scale of an asset
    ///
    /// Queried once when a ledger is opened. Fails for assets the vault
    /// does not know.
    fn unit_scale(&self, asset: &AssetId) -> AssetResult<Amount>;

    /// Move `amount` of `asset` from a contributor into custody
    ///
    /// Fails on insufficient balance or missing authorization.
    fn debit(
        &self,
        asset: &AssetId,
        from: &Address,
        custody: &Address,
        amount: Amount,
    ) -> AssetResult<()>;

    /// Move `amount` of `asset` out of custody to a recipient
    ///
    /// Fails only on catastrophic conditions (unknown asset, overflow).
    fn credit(
        &self,
        asset: &AssetId,
        custody: &Address,
        to: &Address,
        amount: Amount,
    ) -> AssetResult<()>;

    /// Current balance of `account`, zero for unknown accounts
    fn balance_of(&self, asset: &AssetId, account: &Address) -> Amount;
}
