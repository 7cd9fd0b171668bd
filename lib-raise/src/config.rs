//! Raise Configuration
//!
//! Immutable value object fixed when a ledger is opened. Validation is
//! exhaustive at that single point; every field is read-only afterwards.

use serde::{Deserialize, Serialize};

use lib_types::{Address, AllowlistDigest, Amount, AssetId, Bps, Timestamp};

use crate::errors::{RaiseError, RaiseResult};

/// Fee scale: 10000 basis points = 100%
pub const FEE_SCALE_BPS: Bps = 10_000;

/// Raise configuration
///
/// Amounts are in smallest units throughout. Sale-asset quantities
/// (allocations) and payment-asset quantities (price, hard cap) are
/// never mixed; the ledger converts between them at admission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaiseConfig {
    /// Asset being sold
    pub sale_asset: AssetId,
    /// Asset accepted as payment
    pub payment_asset: AssetId,
    /// Payment-asset smallest units per whole unit of the sale asset
    pub price: Amount,
    /// Private phase opens (inclusive)
    pub presale_start: Timestamp,
    /// Public phase opens; before this instant a proof is required
    pub public_sale_start: Timestamp,
    /// Contributions close (exclusive)
    pub end_time: Timestamp,
    /// Commitment over private-phase addresses; the empty sentinel
    /// disables the private phase
    pub allowlist_digest: AllowlistDigest,
    /// Receives the settlement payout
    pub beneficiary: Address,
    /// Receives the platform fee
    pub fee_recipient: Address,
    /// Platform fee in basis points
    pub fee_bps: Bps,
    /// Aggregate cap in payment-asset units
    pub hard_cap: Amount,
    /// Per-contribution minimum in sale-asset units
    pub min_allocation: Amount,
    /// Per-wallet cumulative maximum in sale-asset units
    pub max_allocation: Amount,
}

impl RaiseConfig {
    /// Validate the configuration
    ///
    /// Checked once when the ledger is opened. Each violation is a
    /// distinct error.
    pub fn validate(&self) -> RaiseResult<()> {
        if self.sale_asset.is_zero() {
            return Err(RaiseError::ZeroAsset("sale_asset"));
        }
        if self.payment_asset.is_zero() {
            return Err(RaiseError::ZeroAsset("payment_asset"));
        }
        if self.beneficiary.is_zero() {
            return Err(RaiseError::ZeroAddress("beneficiary"));
        }
        if self.fee_recipient.is_zero() {
            return Err(RaiseError::ZeroAddress("fee_recipient"));
        }
        if self.price == 0 {
            return Err(RaiseError::ZeroPrice);
        }
        if self.hard_cap == 0 {
            return Err(RaiseError::ZeroHardCap);
        }
        if self.min_allocation == 0 {
            return Err(RaiseError::ZeroMinAllocation);
        }
        if self.min_allocation > self.max_allocation {
            return Err(RaiseError::AllocationBoundsInverted {
                min: self.min_allocation,
                max: self.max_allocation,
            });
        }
        if self.fee_bps > FEE_SCALE_BPS {
            return Err(RaiseError::FeeAboveScale { bps: self.fee_bps });
        }
        if self.presale_start > self.public_sale_start || self.public_sale_start > self.end_time {
            return Err(RaiseError::TimestampsOutOfOrder {
                presale_start: self.presale_start,
                public_sale_start: self.public_sale_start,
                end_time: self.end_time,
            });
        }

        Ok(())
    }
}
