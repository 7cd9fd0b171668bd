//! Fixed-Price Raise Ledger
//!
//! Crowdgate's raise engine: contributions of a payment asset buy a
//! fixed-price allocation of a sale asset under time-phased access. A
//! raise opens with a private allowlisted window, widens into an open
//! window, closes at its deadline, and settles the custody balance to
//! the beneficiary with a basis-points fee split.
//!
//! # Key Types
//! - [`RaiseConfig`] - Immutable parameters fixed when a raise is created
//! - [`RaiseLedger`] - Admission and lifecycle state machine for one raise
//! - [`RaiseRegistry`] - Authority-gated index of raises over one vault
//! - [`AllowlistTree`] - Merkle commitment over the private-phase member set
//! - [`RaiseEvent`] - State-change record routed to an [`EventIndexer`]
//!
//! # Invariants
//! - Total accepted payment never exceeds the hard cap
//! - Per-wallet allocation never exceeds the configured maximum
//! - Failed operations leave ledger state untouched
//! - Settlement pays the held balance, never the admission counter

pub mod allowlist;
pub mod config;
pub mod errors;
pub mod event_indexer;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod pricing;
pub mod registry;

pub use allowlist::{leaf_digest, verify_membership, AllowlistTree, ProofNode};
pub use config::{RaiseConfig, FEE_SCALE_BPS};
pub use errors::{RaiseError, RaiseResult};
pub use event_indexer::SledEventIndexer;
pub use events::{EventIndexer, InMemoryEventIndexer, RaiseEvent};
pub use ledger::{Phase, RaiseLedger};
pub use pricing::required_payment;
pub use registry::RaiseRegistry;
