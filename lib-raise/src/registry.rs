//! Raise Registry
//!
//! Index of all raises opened against one vault. Creation is gated on
//! the registry authority; everything else is read-only queries over
//! the shared ledger handles.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use lib_assets::AssetVault;
use lib_types::{Address, RaiseId, Timestamp};

use crate::config::RaiseConfig;
use crate::errors::{RaiseError, RaiseResult};
use crate::ledger::{Phase, RaiseLedger};

/// Registry of raises sharing one vault
///
/// Interior locking keeps all methods `&self` so the registry can sit
/// behind an `Arc` next to the vault it manages. The lock guards only
/// the index; ledger operations run on the handles outside it.
pub struct RaiseRegistry {
    authority: Address,
    vault: Arc<dyn AssetVault>,
    inner: RwLock<RegistryInner>,
}

struct RegistryInner {
    /// All raises by id
    raises: HashMap<RaiseId, RaiseLedger>,
    /// Creation order for listing
    order: Vec<RaiseId>,
}

impl fmt::Debug for RaiseRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaiseRegistry")
            .field("authority", &self.authority)
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

impl RaiseRegistry {
    /// Create an empty registry over the given vault
    pub fn new(authority: Address, vault: Arc<dyn AssetVault>) -> Self {
        Self {
            authority,
            vault,
            inner: RwLock::new(RegistryInner {
                raises: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Open a new raise and register it
    ///
    /// Authority only. The raise id is derived from the config and
    /// `created_at`, so registering the same config twice in the same
    /// instant is rejected as a duplicate.
    pub fn create(
        &self,
        caller: Address,
        config: RaiseConfig,
        created_at: Timestamp,
    ) -> RaiseResult<RaiseLedger> {
        if caller != self.authority {
            return Err(RaiseError::NotAuthorized { caller });
        }

        let ledger = RaiseLedger::open(config, self.vault.clone(), created_at)?;
        let raise_id = ledger.raise_id();

        let mut inner = self.inner.write();
        if inner.raises.contains_key(&raise_id) {
            return Err(RaiseError::DuplicateRaise { raise_id });
        }
        inner.raises.insert(raise_id, ledger.clone());
        inner.order.push(raise_id);

        tracing::info!(
            "Registry: raise {:?} created by {:?} ({} total)",
            raise_id,
            caller,
            inner.order.len()
        );

        Ok(ledger)
    }

    /// Get a raise handle by id
    pub fn get(&self, raise_id: &RaiseId) -> Option<RaiseLedger> {
        self.inner.read().raises.get(raise_id).cloned()
    }

    /// Whether a raise is registered
    pub fn contains(&self, raise_id: &RaiseId) -> bool {
        self.inner.read().raises.contains_key(raise_id)
    }

    /// All raise handles in creation order
    pub fn list(&self) -> Vec<RaiseLedger> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.raises.get(id))
            .cloned()
            .collect()
    }

    /// Raises in a specific phase at the given instant
    pub fn list_by_phase(&self, phase: Phase, now: Timestamp) -> Vec<RaiseLedger> {
        self.list()
            .into_iter()
            .filter(|raise| raise.phase(now) == phase)
            .collect()
    }

    /// Count of raises in a specific phase at the given instant
    pub fn count_by_phase(&self, phase: Phase, now: Timestamp) -> usize {
        self.list_by_phase(phase, now).len()
    }

    /// Total number of registered raises
    pub fn count(&self) -> usize {
        self.inner.read().order.len()
    }

    /// Registry authority
    pub fn authority(&self) -> Address {
        self.authority
    }
}
