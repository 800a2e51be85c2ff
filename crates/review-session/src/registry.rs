//! Bounded, most-recent-first list of analyzed document names
//!
//! The list lives in memory and is written whole to the key-value store
//! after every mutation. A failed write leaves the in-memory list updated,
//! so the running session keeps working while persistence is best-effort.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::store::KeyValueStore;

pub const RECENT_DOCUMENTS_KEY: &str = "recent_documents";
pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

pub struct RecentDocumentsRegistry {
    store: Arc<dyn KeyValueStore>,
    key: String,
    capacity: usize,
    entries: VecDeque<RecentEntry>,
}

impl std::fmt::Debug for RecentDocumentsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecentDocumentsRegistry")
            .field("key", &self.key)
            .field("capacity", &self.capacity)
            .field("entries", &self.entries)
            .finish()
    }
}

impl RecentDocumentsRegistry {
    /// Load the registry stored under [`RECENT_DOCUMENTS_KEY`]
    pub fn load(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self::load_with_key(store, RECENT_DOCUMENTS_KEY, capacity)
    }

    /// Load the registry from `key`.
    ///
    /// Missing or unreadable data yields an empty registry. Stored lists are
    /// deduplicated (first occurrence wins) and truncated to `capacity`.
    pub fn load_with_key(store: Arc<dyn KeyValueStore>, key: &str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let stored = match store.retrieve(key) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<RecentEntry>>(&json) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(key, "Discarding corrupt recent documents: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key, "Could not read recent documents: {}", e);
                Vec::new()
            }
        };

        let mut entries: VecDeque<RecentEntry> = VecDeque::with_capacity(capacity + 1);
        for entry in stored {
            if entries.len() == capacity {
                break;
            }
            if !entries.iter().any(|e| e.name == entry.name) {
                entries.push_back(entry);
            }
        }
        debug!(key, count = entries.len(), "Loaded recent documents");

        Self {
            store,
            key: key.to_string(),
            capacity,
            entries,
        }
    }

    /// Move `name` to the front (inserting it if new) and persist the list
    pub fn record(&mut self, name: &str) -> Result<(), SessionError> {
        self.record_at(name, Utc::now())
    }

    pub fn record_at(&mut self, name: &str, timestamp: DateTime<Utc>) -> Result<(), SessionError> {
        self.entries.retain(|e| e.name != name);
        self.entries.push_front(RecentEntry {
            name: name.to_string(),
            timestamp,
        });
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                debug!(name = %evicted.name, "Evicted from recent documents");
            }
        }
        self.persist()
    }

    /// Entries, most recent first. The iterator can be cloned to restart it.
    pub fn list(&self) -> impl Iterator<Item = &RecentEntry> + Clone + '_ {
        self.entries.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.entries.clear();
        self.persist()
    }

    fn persist(&self) -> Result<(), SessionError> {
        let entries: Vec<&RecentEntry> = self.entries.iter().collect();
        let json = serde_json::to_string(&entries)
            .map_err(|e| SessionError::RegistryWrite(e.into()))?;
        self.store
            .persist(&self.key, &json)
            .map_err(SessionError::RegistryWrite)
    }
}
