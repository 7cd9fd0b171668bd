//! Raise Ledger Errors
//!
//! Every variant carries the offending values and the relevant limits so
//! callers never re-derive them. Any error aborts the whole operation
//! with zero state mutation.

use lib_assets::AssetError;
use lib_types::{Address, Amount, AssetId, Bps, RaiseId, Timestamp};
use thiserror::Error;

/// Error during raise operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaiseError {
    // === Configuration ===
    #[error("Zero address for {0}")]
    ZeroAddress(&'static str),

    #[error("Zero asset id for {0}")]
    ZeroAsset(&'static str),

    #[error("Price must be greater than zero")]
    ZeroPrice,

    #[error("Hard cap must be greater than zero")]
    ZeroHardCap,

    #[error("Minimum allocation must be greater than zero")]
    ZeroMinAllocation,

    #[error("Allocation bounds inverted: min {min}, max {max}")]
    AllocationBoundsInverted { min: Amount, max: Amount },

    #[error("Fee rate above scale: {bps} bps")]
    FeeAboveScale { bps: Bps },

    #[error("Timestamps out of order: presale {presale_start}, public {public_sale_start}, end {end_time}")]
    TimestampsOutOfOrder {
        presale_start: Timestamp,
        public_sale_start: Timestamp,
        end_time: Timestamp,
    },

    #[error("Zero unit scale for {asset:?}")]
    ZeroUnitScale { asset: AssetId },

    // === Admission ===
    #[error("Sale not active at {now}: window is [{opens}, {closes})")]
    NotActive {
        now: Timestamp,
        opens: Timestamp,
        closes: Timestamp,
    },

    #[error("Sale is closed")]
    Closed,

    #[error("Below minimum allocation: requested {requested}, minimum {minimum}")]
    BelowMinimum { requested: Amount, minimum: Amount },

    #[error("Private phase has no committed allowlist")]
    PrivatePhaseDisabled,

    #[error("Allowlist proof rejected")]
    InvalidProof,

    #[error("Wallet cap exceeded: current {current}, delta {delta}, cap {cap}")]
    ExceedsWalletCap {
        current: Amount,
        delta: Amount,
        cap: Amount,
    },

    #[error("Hard cap exceeded: current {current}, delta {delta}, cap {cap}")]
    ExceedsHardCap {
        current: Amount,
        delta: Amount,
        cap: Amount,
    },

    #[error("Payment overflow: {sale_units} sale units at price {price}")]
    PaymentOverflow { sale_units: Amount, price: Amount },

    #[error("Zero payment for {sale_units} sale units")]
    ZeroPayment { sale_units: Amount },

    // === Lifecycle ===
    #[error("Sale not ended at {now}: ends {end_time}")]
    NotEnded { now: Timestamp, end_time: Timestamp },

    #[error("Cancel window passed at {now}: sale opens {presale_start}")]
    CancelWindowPassed {
        now: Timestamp,
        presale_start: Timestamp,
    },

    #[error("Already closed")]
    AlreadyClosed,

    #[error("Not settleable: requires finalized and not cancelled")]
    NotSettleable,

    #[error("Arithmetic overflow")]
    Overflow,

    // === Authorization ===
    #[error("Not controller: {caller:?}")]
    NotController { caller: Address },

    #[error("Not authorized: {caller:?}")]
    NotAuthorized { caller: Address },

    // === Concurrency ===
    #[error("Re-entrant call rejected")]
    ReentrantCall,

    // === Registry ===
    #[error("Duplicate raise: {raise_id:?}")]
    DuplicateRaise { raise_id: RaiseId },

    // === Transport ===
    #[error("Vault error: {0}")]
    Vault(#[from] AssetError),
}

/// Result type for raise operations
pub type RaiseResult<T> = Result<T, RaiseError>;
