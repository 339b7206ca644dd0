//! Outstanding requests waiting for a reply, keyed by integer id.
use crate::lsp::types::RequestId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct PendingEntry<F> {
    pub callback: F,
    pub pending_since: Instant,
}

/// Correlation table. Owns each callback until it is matched or evicted.
pub struct PendingTable<F> {
    entries: HashMap<i64, PendingEntry<F>>,
}

impl<F> Default for PendingTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> PendingTable<F> {
    pub fn new() -> Self {
        PendingTable {
            entries: HashMap::new(),
        }
    }

    /// Remember `callback` for `id`.
    ///
    /// Returns false (nothing stored) for non-integer ids and for ids that are
    /// already pending; the existing entry is kept.
    pub fn register(&mut self, id: &RequestId, callback: F) -> bool {
        self.register_at(id, callback, Instant::now())
    }

    pub fn register_at(&mut self, id: &RequestId, callback: F, now: Instant) -> bool {
        let Some(id) = id.as_int() else {
            return false;
        };
        match self.entries.entry(id) {
            Entry::Occupied(_) => {
                tracing::warn!(id, "request id already pending, keeping the first callback");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    callback,
                    pending_since: now,
                });
                true
            }
        }
    }

    /// Remove and return the callback registered for `id`.
    pub fn take(&mut self, id: i64) -> Option<F> {
        self.entries.remove(&id).map(|entry| entry.callback)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry older than `max_age`. Returns how many were dropped.
    pub fn evict_older_than(&mut self, max_age: Duration) -> usize {
        self.evict_older_than_at(max_age, Instant::now())
    }

    pub fn evict_older_than_at(&mut self, max_age: Duration, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.pending_since) <= max_age);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::info!(evicted, "cleared stale requests with a missing response");
        }
        evicted
    }
}
