//! Crowdgate Asset Vault
//!
//! This crate defines the asset-transfer capability consumed by the raise
//! ledger. The ledger never touches balances directly; it holds an opaque
//! [`AssetVault`] handle and asks it to move funds.
//!
//! # Key Types
//!
//! - [`AssetVault`]: The transfer capability (debit into custody, credit out)
//! - [`InMemoryVault`]: Map-backed implementation for hosts and tests
//! - [`AssetError`]: Structured failure reasons
//!
//! Custody semantics: `debit` moves contributor funds into a custody
//! account, `credit` pays them out. Every movement either completes in
//! full or fails with no effect.

pub mod errors;
pub mod memory;
pub mod vault;

pub use errors::{AssetError, AssetResult};
pub use memory::InMemoryVault;
pub use vault::AssetVault;
