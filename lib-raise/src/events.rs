//! Raise Events
//!
//! Every state change in a raise ledger returns an event for indexing.
//! Hosts route events to an indexer; the indexed log is the source of
//! truth for API responses.

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, RaiseId, Timestamp};

/// Raise ledger events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RaiseEvent {
    /// Contribution admitted
    Contribution {
        /// Raise identifier
        raise_id: RaiseId,
        /// Contributor address
        contributor: Address,
        /// Sale-asset units allocated
        sale_units: Amount,
        /// Payment-asset units collected
        payment_units: Amount,
        /// Timestamp
        timestamp: Timestamp,
    },

    /// Raise finalized after its window closed
    Finalized {
        /// Raise identifier
        raise_id: RaiseId,
        /// Total payment-asset units accepted over the raise
        total_accepted: Amount,
        /// Timestamp
        timestamp: Timestamp,
    },

    /// Raise cancelled before it opened
    Cancelled {
        /// Raise identifier
        raise_id: RaiseId,
        /// Timestamp
        timestamp: Timestamp,
    },

    /// Held funds paid out with the fee split
    Settled {
        /// Raise identifier
        raise_id: RaiseId,
        /// Custody balance at settlement time
        total_held: Amount,
        /// Fee routed to the platform account
        fee: Amount,
        /// Remainder routed to the beneficiary
        payout: Amount,
        /// Timestamp
        timestamp: Timestamp,
    },

    /// Controller capability moved to a new address
    ControlTransferred {
        /// Raise identifier
        raise_id: RaiseId,
        /// Previous controller
        previous: Address,
        /// New controller
        new_controller: Address,
        /// Timestamp
        timestamp: Timestamp,
    },
}

impl RaiseEvent {
    /// Get the raise ID associated with this event
    pub fn raise_id(&self) -> &RaiseId {
        match self {
            RaiseEvent::Contribution { raise_id, .. } => raise_id,
            RaiseEvent::Finalized { raise_id, .. } => raise_id,
            RaiseEvent::Cancelled { raise_id, .. } => raise_id,
            RaiseEvent::Settled { raise_id, .. } => raise_id,
            RaiseEvent::ControlTransferred { raise_id, .. } => raise_id,
        }
    }

    /// Get the timestamp for this event
    pub fn timestamp(&self) -> Timestamp {
        match self {
            RaiseEvent::Contribution { timestamp, .. } => *timestamp,
            RaiseEvent::Finalized { timestamp, .. } => *timestamp,
            RaiseEvent::Cancelled { timestamp, .. } => *timestamp,
            RaiseEvent::Settled { timestamp, .. } => *timestamp,
            RaiseEvent::ControlTransferred { timestamp, .. } => *timestamp,
        }
    }

    /// Get event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            RaiseEvent::Contribution { .. } => "contribution",
            RaiseEvent::Finalized { .. } => "finalized",
            RaiseEvent::Cancelled { .. } => "cancelled",
            RaiseEvent::Settled { .. } => "settled",
            RaiseEvent::ControlTransferred { .. } => "control_transferred",
        }
    }
}

/// Event indexer interface
///
/// Implement this to index raise events for API queries. Query methods
/// return owned events so persistent backends can satisfy them too.
pub trait EventIndexer {
    /// Index a new event
    fn record(&mut self, event: RaiseEvent);

    /// Get all events for a raise, oldest first
    fn events_for(&self, raise_id: &RaiseId) -> Vec<RaiseEvent>;

    /// Get events of one type for a raise, oldest first
    fn events_by_type(&self, raise_id: &RaiseId, event_type: &str) -> Vec<RaiseEvent>;

    /// Get events in an inclusive timestamp range
    fn events_in_range(&self, start: Timestamp, end: Timestamp) -> Vec<RaiseEvent>;

    /// Get the latest event for a raise
    fn latest_for(&self, raise_id: &RaiseId) -> Option<RaiseEvent>;

    /// Total number of indexed events
    fn len(&self) -> usize;

    /// Whether no events have been indexed
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory event indexer for hosts and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventIndexer {
    events: Vec<RaiseEvent>,
}

impl InMemoryEventIndexer {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventIndexer for InMemoryEventIndexer {
    fn record(&mut self, event: RaiseEvent) {
        self.events.push(event);
    }

    fn events_for(&self, raise_id: &RaiseId) -> Vec<RaiseEvent> {
        self.events
            .iter()
            .filter(|e| e.raise_id() == raise_id)
            .cloned()
            .collect()
    }

    fn events_by_type(&self, raise_id: &RaiseId, event_type: &str) -> Vec<RaiseEvent> {
        self.events
            .iter()
            .filter(|e| e.raise_id() == raise_id && e.event_type() == event_type)
            .cloned()
            .collect()
    }

    fn events_in_range(&self, start: Timestamp, end: Timestamp) -> Vec<RaiseEvent> {
        self.events
            .iter()
            .filter(|e| {
                let ts = e.timestamp();
                ts >= start && ts <= end
            })
            .cloned()
            .collect()
    }

    fn latest_for(&self, raise_id: &RaiseId) -> Option<RaiseEvent> {
        self.events
            .iter()
            .filter(|e| e.raise_id() == raise_id)
            .max_by_key(|e| e.timestamp())
            .cloned()
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}
