//! Most-recently-used list of selected titles.

use bookfinder_core::HistoryEntry;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct HistoryCache {
    entries: Vec<HistoryEntry>,
    capacity: usize,
    last_id: i64,
}

impl HistoryCache {
    /// Restores a persisted list. Duplicate titles keep their newest (first) entry.
    pub fn new(mut entries: Vec<HistoryEntry>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut seen = std::collections::HashSet::new();
        entries.retain(|entry| seen.insert(entry.title.clone()));
        entries.truncate(capacity);
        let last_id = entries.iter().map(|e| e.id).max().unwrap_or(0);
        Self {
            entries,
            capacity,
            last_id,
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves `title` to the front with a fresh timestamp and id, evicting the oldest beyond capacity.
    pub fn add(&mut self, title: &str, now: DateTime<Utc>) -> &HistoryEntry {
        self.entries.retain(|entry| entry.title != title);

        // Ids are epoch millis, bumped so same-millisecond inserts stay distinct.
        let id = now.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;

        self.entries.insert(
            0,
            HistoryEntry {
                title: title.to_string(),
                timestamp: now,
                id,
            },
        );
        self.entries.truncate(self.capacity);
        &self.entries[0]
    }

    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
