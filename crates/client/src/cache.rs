// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized activity cache shared by direct fetches and pollers.

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};

use crate::activity::ActivityRecord;

/// Emitted after a record changes so subscribed views re-render.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    Upserted { id: String },
}

/// Last-known server representation per activity id.
///
/// Writes are whole-record replacements, last-write-wins by fetch completion
/// order with no version check: when two fetches for the same id complete
/// out of order, the older response overwrites the newer one. Accepted
/// behavior, pinned by `stale_write_overwrites_fresher_record`.
pub struct ActivityCache {
    records: RwLock<HashMap<String, ActivityRecord>>,
    event_tx: broadcast::Sender<CacheEvent>,
}

impl ActivityCache {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self { records: RwLock::new(HashMap::new()), event_tx }
    }

    /// Replace or insert the record keyed by its id. No merge logic.
    pub async fn upsert(&self, record: ActivityRecord) {
        let id = record.id.clone();
        self.records.write().await.insert(id.clone(), record);
        let _ = self.event_tx.send(CacheEvent::Upserted { id });
    }

    /// Current record for an id, or absent when not yet fetched.
    pub async fn get(&self, id: &str) -> Option<ActivityRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// True when the cached record exists and holds a terminal status.
    pub async fn is_terminal(&self, id: &str) -> bool {
        self.records.read().await.get(id).map(|r| r.status.is_terminal()).unwrap_or(false)
    }

    /// Snapshot of all cached records.
    pub async fn snapshot(&self) -> HashMap<String, ActivityRecord> {
        self.records.read().await.clone()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for ActivityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
