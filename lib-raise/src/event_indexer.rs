//! Sled-backed Persistent Event Indexer

use std::sync::atomic::{AtomicU64, Ordering};

use lib_types::{RaiseId, Timestamp};

use crate::events::{EventIndexer, RaiseEvent};

const TREE_EVENTS: &str = "raise_events";
const TREE_RAISE_INDEX: &str = "raise_events_raise_idx";
const TREE_TIME_INDEX: &str = "raise_events_time_idx";
const TREE_TYPE_INDEX: &str = "raise_events_type_idx";
const KEY_COUNTER: &str = "meta:counter";

/// Sled-backed persistent event indexer
///
/// The main tree stores bincode-encoded events under a unique key; the
/// secondary trees map raise ids, timestamps, and event types back to
/// those keys. Time index keys start with the big-endian timestamp so
/// a range scan walks them in order.
#[derive(Debug)]
pub struct SledEventIndexer {
    db: sled::Db,
    events: sled::Tree,
    raise_index: sled::Tree,
    time_index: sled::Tree,
    type_index: sled::Tree,
    event_counter: AtomicU64,
}

impl SledEventIndexer {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, sled::Error> {
        let events = db.open_tree(TREE_EVENTS)?;
        let raise_index = db.open_tree(TREE_RAISE_INDEX)?;
        let time_index = db.open_tree(TREE_TIME_INDEX)?;
        let type_index = db.open_tree(TREE_TYPE_INDEX)?;

        let counter = events
            .get(KEY_COUNTER)?
            .map(|v| {
                let bytes: [u8; 8] = v.as_ref().try_into().unwrap_or([0u8; 8]);
                u64::from_be_bytes(bytes)
            })
            .unwrap_or(0);

        Ok(Self {
            db,
            events,
            raise_index,
            time_index,
            type_index,
            event_counter: AtomicU64::new(counter),
        })
    }

    fn generate_event_key(&self, raise_id: &RaiseId, timestamp: Timestamp) -> String {
        let counter = self.event_counter.fetch_add(1, Ordering::SeqCst);
        format!(
            "{}/{}/{}",
            hex::encode(&raise_id.as_bytes()[..8]),
            timestamp,
            counter
        )
    }

    fn save_counter(&self) -> Result<(), sled::Error> {
        let counter = self.event_counter.load(Ordering::SeqCst);
        self.events.insert(KEY_COUNTER, &counter.to_be_bytes())?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), sled::Error> {
        self.events.flush()?;
        self.raise_index.flush()?;
        self.time_index.flush()?;
        self.type_index.flush()?;
        Ok(())
    }

    fn load_event(&self, event_key: &[u8]) -> Option<RaiseEvent> {
        match self.events.get(event_key) {
            Ok(Some(data)) => match bincode::deserialize::<RaiseEvent>(&data) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::error!("Failed to deserialize event: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to load event: {}", e);
                None
            }
        }
    }
}

impl EventIndexer for SledEventIndexer {
    fn record(&mut self, event: RaiseEvent) {
        let event_key = self.generate_event_key(event.raise_id(), event.timestamp());
        let event_type = event.event_type();
        let raise_id = *event.raise_id();
        let timestamp = event.timestamp();

        let serialized = match bincode::serialize(&event) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Failed to serialize event: {}", e);
                return;
            }
        };

        if let Err(e) = self.events.insert(event_key.as_bytes(), serialized) {
            tracing::error!("Failed to store event: {}", e);
            return;
        }
        if let Err(e) = self.save_counter() {
            tracing::error!("Failed to persist event counter: {}", e);
        }

        let raise_idx_key = format!("{}/{}", hex::encode(raise_id.as_bytes()), &event_key);
        if let Err(e) = self
            .raise_index
            .insert(raise_idx_key.as_bytes(), event_key.as_bytes())
        {
            tracing::error!("Failed to update raise index: {}", e);
        }

        let mut time_idx_key = timestamp.to_be_bytes().to_vec();
        time_idx_key.extend_from_slice(b"/");
        time_idx_key.extend_from_slice(event_key.as_bytes());
        if let Err(e) = self.time_index.insert(time_idx_key, event_key.as_bytes()) {
            tracing::error!("Failed to update time index: {}", e);
        }

        let type_idx_key = format!("{}/{}", event_type, &event_key);
        if let Err(e) = self
            .type_index
            .insert(type_idx_key.as_bytes(), event_key.as_bytes())
        {
            tracing::error!("Failed to update type index: {}", e);
        }
    }

    fn events_for(&self, raise_id: &RaiseId) -> Vec<RaiseEvent> {
        let prefix = hex::encode(raise_id.as_bytes());
        let mut events = Vec::new();

        for result in self.raise_index.scan_prefix(prefix.as_bytes()) {
            match result {
                Ok((_, event_key)) => {
                    if let Some(event) = self.load_event(&event_key) {
                        events.push(event);
                    }
                }
                Err(e) => {
                    tracing::error!("Error reading raise index: {}", e);
                }
            }
        }

        events.sort_by_key(|e| e.timestamp());
        events
    }

    fn events_by_type(&self, raise_id: &RaiseId, event_type: &str) -> Vec<RaiseEvent> {
        let mut events = Vec::new();

        for result in self.type_index.scan_prefix(event_type.as_bytes()) {
            match result {
                Ok((_, event_key)) => {
                    if let Some(event) = self.load_event(&event_key) {
                        if event.raise_id() == raise_id {
                            events.push(event);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Error reading type index: {}", e);
                }
            }
        }

        events.sort_by_key(|e| e.timestamp());
        events
    }

    fn events_in_range(&self, start: Timestamp, end: Timestamp) -> Vec<RaiseEvent> {
        let mut events = Vec::new();
        if start > end {
            return events;
        }

        let lower = start.to_be_bytes().to_vec();
        let iter = match end.checked_add(1) {
            Some(next) => self.time_index.range(lower..next.to_be_bytes().to_vec()),
            None => self.time_index.range(lower..),
        };

        for result in iter {
            match result {
                Ok((_, event_key)) => {
                    if let Some(event) = self.load_event(&event_key) {
                        events.push(event);
                    }
                }
                Err(e) => {
                    tracing::error!("Error reading time index: {}", e);
                }
            }
        }

        events
    }

    fn latest_for(&self, raise_id: &RaiseId) -> Option<RaiseEvent> {
        self.events_for(raise_id)
            .into_iter()
            .max_by_key(|e| e.timestamp())
    }

    fn len(&self) -> usize {
        // The counter key lives in the events tree
        self.events.len().saturating_sub(1)
    }
}
