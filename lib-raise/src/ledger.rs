//! Raise Ledger
//!
//! The admission state machine for a fixed-price raise. A `RaiseLedger`
//! owns the per-contributor allocation book and the aggregate payment
//! counter, admits contributions through a fixed sequence of checks,
//! and pulls the payment into a custody account derived from the raise
//! identifier.
//!
//! # Key Types
//! - `RaiseLedger` - Cloneable handle to one raise; clones share state
//! - `Phase` - Lifecycle phase as seen at a given instant
//!
//! # Invariants
//! - `total_accepted` never exceeds `hard_cap`
//! - Per-contributor allocation never exceeds `max_allocation`
//! - A failed operation leaves the ledger byte-for-byte unchanged
//! - `cancelled` implies `finalized`; the reverse does not hold

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use lib_assets::AssetVault;
use lib_types::{Address, Amount, RaiseId, Timestamp};

use crate::allowlist::{verify_membership, ProofNode};
use crate::config::RaiseConfig;
use crate::errors::{RaiseError, RaiseResult};
use crate::events::RaiseEvent;
use crate::pricing::required_payment;

/// Domain prefix for raise identifier derivation
const RAISE_ID_DOMAIN: &[u8] = b"CROWDGATE_RAISE_V1";

// ============================================================================
// Phase
// ============================================================================

/// Lifecycle phase of a raise at a given instant
///
/// Time-based phases are derived from the clock the caller passes in;
/// `Finalized` and `Cancelled` are sticky and override the clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Phase {
    /// Before the presale window opens
    Pending,
    /// Allowlisted contributions only
    Private,
    /// Open contributions, no proof required
    Public,
    /// Window expired, awaiting finalization
    Ended,
    /// Closed normally; settlement may proceed
    Finalized,
    /// Aborted before opening; settlement is blocked
    Cancelled,
}

impl Phase {
    /// Whether contributions can be admitted in this phase
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Private | Phase::Public)
    }

    /// Whether the raise has reached a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Finalized | Phase::Cancelled)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Pending => write!(f, "pending"),
            Phase::Private => write!(f, "private"),
            Phase::Public => write!(f, "public"),
            Phase::Ended => write!(f, "ended"),
            Phase::Finalized => write!(f, "finalized"),
            Phase::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ============================================================================
// Ledger state
// ============================================================================

/// Mutable ledger state guarded by the handle's mutex
pub(crate) struct LedgerState {
    /// Total payment-asset units accepted so far
    pub(crate) total_accepted: Amount,
    /// Cumulative sale-asset allocation per contributor
    pub(crate) contributions: HashMap<Address, Amount>,
    /// Set by `finalize` and `cancel`; blocks further contributions
    pub(crate) finalized: bool,
    /// Set by `cancel` only; blocks settlement
    pub(crate) cancelled: bool,
    /// Address allowed to drive lifecycle transitions
    pub(crate) controller: Address,
    /// In-flight vault transfer marker
    pub(crate) entered: bool,
}

pub(crate) struct LedgerInner {
    pub(crate) config: RaiseConfig,
    pub(crate) raise_id: RaiseId,
    pub(crate) custody: Address,
    pub(crate) sale_unit_scale: Amount,
    pub(crate) vault: Arc<dyn AssetVault>,
    pub(crate) state: Mutex<LedgerState>,
}

// ============================================================================
// RaiseLedger
// ============================================================================

/// Handle to one fixed-price raise
///
/// Cloning is cheap and every clone operates on the same underlying
/// ledger. The mutex is never held across a vault call: admission
/// updates the book first, releases the lock, performs the debit, and
/// rolls the book back if the debit fails.
#[derive(Clone)]
pub struct RaiseLedger {
    pub(crate) inner: Arc<LedgerInner>,
}

impl fmt::Debug for RaiseLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaiseLedger")
            .field("raise_id", &self.inner.raise_id)
            .field("custody", &self.inner.custody)
            .finish_non_exhaustive()
    }
}

impl RaiseLedger {
    /// Open a new raise over the given vault
    ///
    /// Validates the configuration, captures the sale asset's unit
    /// scale, and derives the raise identifier from the config plus
    /// `created_at` so two otherwise identical raises stay distinct.
    /// Both assets must be known to the vault with a non-zero scale.
    /// The beneficiary starts out as controller.
    pub fn open(
        config: RaiseConfig,
        vault: Arc<dyn AssetVault>,
        created_at: Timestamp,
    ) -> RaiseResult<Self> {
        config.validate()?;

        let sale_unit_scale = vault.unit_scale(&config.sale_asset)?;
        if sale_unit_scale == 0 {
            return Err(RaiseError::ZeroUnitScale {
                asset: config.sale_asset,
            });
        }
        if vault.unit_scale(&config.payment_asset)? == 0 {
            return Err(RaiseError::ZeroUnitScale {
                asset: config.payment_asset,
            });
        }

        let raise_id = derive_raise_id(&config, created_at);
        let custody = Address::new(*raise_id.as_bytes());

        let state = LedgerState {
            total_accepted: 0,
            contributions: HashMap::new(),
            finalized: false,
            cancelled: false,
            controller: config.beneficiary,
            entered: false,
        };

        tracing::debug!(
            "Raise {:?} opened: hard cap {}, window [{}, {})",
            raise_id,
            config.hard_cap,
            config.presale_start,
            config.end_time
        );

        Ok(Self {
            inner: Arc::new(LedgerInner {
                config,
                raise_id,
                custody,
                sale_unit_scale,
                vault,
                state: Mutex::new(state),
            }),
        })
    }

    /// Admit a contribution of `sale_units` at the instant `now`
    ///
    /// Checks run in a fixed order and the first failure aborts with no
    /// effects: time window, not closed, minimum size, allowlist proof
    /// during the private phase, per-wallet cap, price conversion, hard
    /// cap. The book is updated before the vault debit and rolled back
    /// if the debit fails, so a rejected payment never leaves a
    /// phantom allocation.
    pub fn contribute(
        &self,
        contributor: Address,
        sale_units: Amount,
        proof: &[ProofNode],
        now: Timestamp,
    ) -> RaiseResult<RaiseEvent> {
        let cfg = &self.inner.config;

        let payment = {
            let mut state = self.inner.state.lock();

            if state.entered {
                return Err(RaiseError::ReentrantCall);
            }

            // Check 1: inside the contribution window
            if now < cfg.presale_start || now >= cfg.end_time {
                return Err(RaiseError::NotActive {
                    now,
                    opens: cfg.presale_start,
                    closes: cfg.end_time,
                });
            }

            // Check 2: not finalized or cancelled
            if state.finalized {
                return Err(RaiseError::Closed);
            }

            // Check 3: minimum contribution size
            if sale_units < cfg.min_allocation {
                return Err(RaiseError::BelowMinimum {
                    requested: sale_units,
                    minimum: cfg.min_allocation,
                });
            }

            // Check 4: allowlist membership during the private phase
            if now < cfg.public_sale_start {
                if cfg.allowlist_digest.is_empty() {
                    return Err(RaiseError::PrivatePhaseDisabled);
                }
                if !verify_membership(&contributor, proof, &cfg.allowlist_digest) {
                    return Err(RaiseError::InvalidProof);
                }
            }

            // Check 5: per-wallet allocation cap
            let current = state.contributions.get(&contributor).copied().unwrap_or(0);
            let new_allocation = match current.checked_add(sale_units) {
                Some(total) if total <= cfg.max_allocation => total,
                _ => {
                    return Err(RaiseError::ExceedsWalletCap {
                        current,
                        delta: sale_units,
                        cap: cfg.max_allocation,
                    })
                }
            };

            // Check 6: convert sale units to the payment owed
            let payment = required_payment(sale_units, cfg.price, self.inner.sale_unit_scale)?;

            // Check 7: aggregate hard cap
            let new_total = match state.total_accepted.checked_add(payment) {
                Some(total) if total <= cfg.hard_cap => total,
                _ => {
                    return Err(RaiseError::ExceedsHardCap {
                        current: state.total_accepted,
                        delta: payment,
                        cap: cfg.hard_cap,
                    })
                }
            };

            // Effects land before the external debit
            state.total_accepted = new_total;
            state.contributions.insert(contributor, new_allocation);
            state.entered = true;

            payment
        };

        // Interaction with the lock released. A re-entrant call from the
        // vault observes `entered` and is rejected instead of deadlocking.
        let debit = self
            .inner
            .vault
            .debit(&cfg.payment_asset, &contributor, &self.inner.custody, payment);

        let mut state = self.inner.state.lock();
        state.entered = false;

        if let Err(e) = debit {
            state.total_accepted -= payment;
            let prior = state
                .contributions
                .get(&contributor)
                .copied()
                .unwrap_or(0)
                .saturating_sub(sale_units);
            if prior == 0 {
                state.contributions.remove(&contributor);
            } else {
                state.contributions.insert(contributor, prior);
            }
            tracing::warn!(
                "Raise {:?}: debit of {} from {:?} failed, rolled back: {}",
                self.inner.raise_id,
                payment,
                contributor,
                e
            );
            return Err(RaiseError::Vault(e));
        }

        tracing::debug!(
            "Raise {:?}: admitted {} sale units from {:?} for {} payment units",
            self.inner.raise_id,
            sale_units,
            contributor,
            payment
        );

        Ok(RaiseEvent::Contribution {
            raise_id: self.inner.raise_id,
            contributor,
            sale_units,
            payment_units: payment,
            timestamp: now,
        })
    }

    // ========================================================================
    // Read accessors
    // ========================================================================

    /// Cumulative sale-asset units allocated to one contributor
    pub fn contribution_of(&self, contributor: &Address) -> Amount {
        self.inner
            .state
            .lock()
            .contributions
            .get(contributor)
            .copied()
            .unwrap_or(0)
    }

    /// Total payment-asset units accepted so far
    pub fn total_accepted(&self) -> Amount {
        self.inner.state.lock().total_accepted
    }

    /// Number of distinct contributors with a non-zero allocation
    pub fn contributor_count(&self) -> usize {
        self.inner.state.lock().contributions.len()
    }

    /// Phase at the given instant
    pub fn phase(&self, now: Timestamp) -> Phase {
        let state = self.inner.state.lock();
        let cfg = &self.inner.config;
        if state.cancelled {
            Phase::Cancelled
        } else if state.finalized {
            Phase::Finalized
        } else if now < cfg.presale_start {
            Phase::Pending
        } else if now < cfg.public_sale_start {
            Phase::Private
        } else if now < cfg.end_time {
            Phase::Public
        } else {
            Phase::Ended
        }
    }

    /// Raise identifier
    pub fn raise_id(&self) -> RaiseId {
        self.inner.raise_id
    }

    /// Custody account the collected payments sit in
    pub fn custody_account(&self) -> Address {
        self.inner.custody
    }

    /// Current controller
    pub fn controller(&self) -> Address {
        self.inner.state.lock().controller
    }

    /// Immutable raise configuration
    pub fn config(&self) -> &RaiseConfig {
        &self.inner.config
    }

    /// Sale asset unit scale captured at open time
    pub fn sale_unit_scale(&self) -> Amount {
        self.inner.sale_unit_scale
    }

    /// Whether the raise is closed to contributions
    pub fn is_finalized(&self) -> bool {
        self.inner.state.lock().finalized
    }

    /// Whether the raise was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.lock().cancelled
    }
}

/// Derive the raise identifier from the identifying config fields
///
/// Domain-prefixed so the digest can never collide with other uses of
/// the same hash over the same bytes.
fn derive_raise_id(config: &RaiseConfig, created_at: Timestamp) -> RaiseId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(RAISE_ID_DOMAIN);
    hasher.update(config.sale_asset.as_bytes());
    hasher.update(config.payment_asset.as_bytes());
    hasher.update(config.beneficiary.as_bytes());
    hasher.update(&config.price.to_le_bytes());
    hasher.update(&config.presale_start.to_le_bytes());
    hasher.update(&config.public_sale_start.to_le_bytes());
    hasher.update(&config.end_time.to_le_bytes());
    hasher.update(&created_at.to_le_bytes());
    RaiseId::new(*hasher.finalize().as_bytes())
}
