//! Client-side mirror of the server's character dataset.

use std::collections::HashMap;

use tracing::debug;

use crate::record::CharacterRecord;

/// Mapping from character name to its last-known record.
///
/// Mutated only by inbound frames: deltas upsert and delete per key,
/// snapshots replace everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusRegistry {
    records: HashMap<String, CharacterRecord>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert each update (whole-record replace, never a field merge), then
    /// remove each deleted name. Returns true if anything changed.
    pub fn apply_delta<U, D>(&mut self, updates: U, deletions: D) -> bool
    where
        U: IntoIterator<Item = (String, CharacterRecord)>,
        D: IntoIterator<Item = String>,
    {
        let mut changed = false;
        for (name, record) in updates {
            if self.records.get(&name) != Some(&record) {
                changed = true;
            }
            self.records.insert(name, record);
        }
        for name in deletions {
            if self.records.remove(&name).is_some() {
                debug!(character = %name, "removed by delta");
                changed = true;
            }
        }
        changed
    }

    /// Replace the whole registry. Names missing from `data` are dropped.
    pub fn apply_snapshot(&mut self, data: HashMap<String, CharacterRecord>) -> bool {
        let changed = self.records != data;
        self.records = data;
        changed
    }

    pub fn get(&self, name: &str) -> Option<&CharacterRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// All known names, sorted lexicographically.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.records.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
