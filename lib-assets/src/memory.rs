//! In-Memory Asset Vault
//!
//! Map-backed vault for hosts and tests. Assets are registered with their
//! unit scale up front; balances default to zero.

use std::collections::HashMap;

use parking_lot::RwLock;

use lib_types::{Address, Amount, AssetId};

use crate::errors::{AssetError, AssetResult};
use crate::vault::AssetVault;

/// In-memory vault backed by a balance map
///
/// Interior locking keeps all methods `&self` so the vault can be shared
/// behind an `Arc` across ledger handles.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    scales: RwLock<HashMap<AssetId, Amount>>,
    balances: RwLock<HashMap<(AssetId, Address), Amount>>,
}

impl InMemoryVault {
    /// Create an empty vault with no registered assets
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset and its smallest-unit scale
    ///
    /// Re-registering an asset replaces its scale.
    pub fn register_asset(&self, asset: AssetId, unit_scale: Amount) {
        self.scales.write().insert(asset, unit_scale);
    }

    /// Mint `amount` of `asset` into `account`
    ///
    /// Test and host setup helper; not part of the vault capability.
    pub fn deposit(&self, asset: &AssetId, account: &Address, amount: Amount) -> AssetResult<()> {
        if !self.scales.read().contains_key(asset) {
            return Err(AssetError::UnknownAsset(*asset));
        }

        let mut balances = self.balances.write();
        let balance = balances.entry((*asset, *account)).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(AssetError::Overflow)?;
        Ok(())
    }
}

impl AssetVault for InMemoryVault {
    fn unit_scale(&self, asset: &AssetId) -> AssetResult<Amount> {
        self.scales
            .read()
            .get(asset)
            .copied()
            .ok_or(AssetError::UnknownAsset(*asset))
    }

    fn debit(
        &self,
        asset: &AssetId,
        from: &Address,
        custody: &Address,
        amount: Amount,
    ) -> AssetResult<()> {
        if amount == 0 {
            return Err(AssetError::ZeroAmount);
        }
        if !self.scales.read().contains_key(asset) {
            return Err(AssetError::UnknownAsset(*asset));
        }

        let mut balances = self.balances.write();

        let have = *balances.get(&(*asset, *from)).unwrap_or(&0);
        if have < amount {
            return Err(AssetError::InsufficientBalance { have, need: amount });
        }

        let custody_balance = *balances.get(&(*asset, *custody)).unwrap_or(&0);
        let new_custody_balance = custody_balance
            .checked_add(amount)
            .ok_or(AssetError::Overflow)?;

        balances.insert((*asset, *from), have - amount);
        balances.insert((*asset, *custody), new_custody_balance);

        tracing::debug!(
            "Vault: debited {} of {:?} from {:?} into custody {:?}",
            amount,
            asset,
            from,
            custody
        );

        Ok(())
    }

    fn credit(
        &self,
        asset: &AssetId,
        custody: &Address,
        to: &Address,
        amount: Amount,
    ) -> AssetResult<()> {
        if amount == 0 {
            return Err(AssetError::ZeroAmount);
        }
        if !self.scales.read().contains_key(asset) {
            return Err(AssetError::UnknownAsset(*asset));
        }

        let mut balances = self.balances.write();

        let have = *balances.get(&(*asset, *custody)).unwrap_or(&0);
        if have < amount {
            return Err(AssetError::InsufficientBalance { have, need: amount });
        }

        let to_balance = *balances.get(&(*asset, *to)).unwrap_or(&0);
        let new_to_balance = to_balance.checked_add(amount).ok_or(AssetError::Overflow)?;

        balances.insert((*asset, *custody), have - amount);
        balances.insert((*asset, *to), new_to_balance);

        tracing::debug!(
            "Vault: credited {} of {:?} from custody {:?} to {:?}",
            amount,
            asset,
            custody,
            to
        );

        Ok(())
    }

    fn balance_of(&self, asset: &AssetId, account: &Address) -> Amount {
        *self.balances.read().get(&(*asset, *account)).unwrap_or(&0)
    }
}
