//! Fixed-capacity character selection.
//!
//! The selection is the ordered list of names shown in display slots
//! (position i is slot i). It never holds duplicates and never grows past its
//! capacity: selecting one more name evicts the oldest. Every mutation is
//! written through to the preference store.

use tracing::{debug, info};

use crate::prefs::{PrefKey, PreferenceStore};
use crate::registry::StatusRegistry;

/// Result of a [`SelectionModel::toggle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    /// Added after evicting the oldest selected name
    AddedWithEviction { evicted: String },
    Removed,
    /// Not selected and not in the registry
    Rejected,
}

impl ToggleOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, ToggleOutcome::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionModel {
    names: Vec<String>,
    capacity: usize,
}

impl SelectionModel {
    /// Empty selection. Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            names: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Restore the persisted selection (string items only, duplicates
    /// dropped, truncated to capacity).
    pub fn load(capacity: usize, prefs: &mut PreferenceStore) -> Self {
        let mut model = Self::new(capacity);
        model.names = prefs.load_selection(model.capacity);
        debug!(selected = model.names.len(), "restored selection");
        model
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Slot index of a selected name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Name bound to a slot.
    pub fn get(&self, slot: usize) -> Option<&str> {
        self.names.get(slot).map(String::as_str)
    }

    /// Select or deselect `name`.
    ///
    /// Deselecting always works. Selecting requires the name to be known to
    /// the registry; at capacity the oldest entry (index 0) is evicted first.
    pub fn toggle(
        &mut self,
        name: &str,
        registry: &StatusRegistry,
        prefs: &mut PreferenceStore,
    ) -> ToggleOutcome {
        let outcome = if let Some(pos) = self.position(name) {
            self.names.remove(pos);
            ToggleOutcome::Removed
        } else if !registry.contains(name) {
            debug!(character = %name, "ignoring toggle of unknown character");
            ToggleOutcome::Rejected
        } else {
            let evicted = if self.names.len() >= self.capacity {
                Some(self.names.remove(0))
            } else {
                None
            };
            self.names.push(name.to_string());
            match evicted {
                Some(evicted) => {
                    info!(character = %name, evicted = %evicted, "selection full, evicted oldest");
                    ToggleOutcome::AddedWithEviction { evicted }
                }
                None => ToggleOutcome::Added,
            }
        };

        if outcome.changed() {
            self.persist(prefs);
        }
        outcome
    }

    /// Drop every name the registry no longer knows. Persists and returns
    /// the dropped names if any were removed.
    pub fn reconcile_against_registry(
        &mut self,
        registry: &StatusRegistry,
        prefs: &mut PreferenceStore,
    ) -> Vec<String> {
        let mut dropped = Vec::new();
        self.names.retain(|name| {
            let keep = registry.contains(name);
            if !keep {
                dropped.push(name.clone());
            }
            keep
        });

        if !dropped.is_empty() {
            info!(dropped = ?dropped, "deselected vanished characters");
            self.persist(prefs);
        }
        dropped
    }

    fn persist(&self, prefs: &mut PreferenceStore) {
        prefs.save(PrefKey::Selection, &self.names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CharacterRecord;

    fn registry_with(names: &[&str]) -> StatusRegistry {
        let mut registry = StatusRegistry::new();
        registry.apply_snapshot(
            names
                .iter()
                .map(|n| (n.to_string(), CharacterRecord::new()))
                .collect(),
        );
        registry
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let registry = registry_with(&["A", "B", "C"]);
        let mut prefs = PreferenceStore::in_memory();
        let mut sel = SelectionModel::new(2);

        assert_eq!(sel.toggle("A", &registry, &mut prefs), ToggleOutcome::Added);
        assert_eq!(sel.toggle("B", &registry, &mut prefs), ToggleOutcome::Added);
        assert_eq!(
            sel.toggle("C", &registry, &mut prefs),
            ToggleOutcome::AddedWithEviction {
                evicted: "A".to_string()
            }
        );
        assert_eq!(sel.names(), ["B", "C"]);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let names: Vec<String> = (0..20).map(|i| format!("c{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let registry = registry_with(&refs);
        let mut prefs = PreferenceStore::in_memory();
        let mut sel = SelectionModel::new(3);

        // Mixed adds and removes, including re-toggles.
        for (i, name) in refs.iter().cycle().take(60).enumerate() {
            sel.toggle(name, &registry, &mut prefs);
            if i % 7 == 0 {
                sel.toggle(name, &registry, &mut prefs);
            }
            assert!(sel.len() <= 3);
        }
    }

    #[test]
    fn test_toggle_removes_selected() {
        let registry = registry_with(&["A", "B"]);
        let mut prefs = PreferenceStore::in_memory();
        let mut sel = SelectionModel::new(4);
        sel.toggle("A", &registry, &mut prefs);
        sel.toggle("B", &registry, &mut prefs);

        assert_eq!(sel.toggle("A", &registry, &mut prefs), ToggleOutcome::Removed);
        assert_eq!(sel.names(), ["B"]);
    }

    #[test]
    fn test_unknown_name_rejected_but_can_deselect() {
        let mut registry = registry_with(&["A"]);
        let mut prefs = PreferenceStore::in_memory();
        let mut sel = SelectionModel::new(4);

        assert_eq!(sel.toggle("Ghost", &registry, &mut prefs), ToggleOutcome::Rejected);
        assert!(sel.is_empty());

        sel.toggle("A", &registry, &mut prefs);
        registry.apply_snapshot(Default::default());
        assert_eq!(sel.toggle("A", &registry, &mut prefs), ToggleOutcome::Removed);
    }

    #[test]
    fn test_reconcile_drops_vanished_and_persists() {
        let mut registry = registry_with(&["A", "B"]);
        let mut prefs = PreferenceStore::in_memory();
        let mut sel = SelectionModel::new(4);
        sel.toggle("A", &registry, &mut prefs);
        sel.toggle("B", &registry, &mut prefs);

        registry.apply_delta(Vec::new(), vec!["A".to_string()]);
        let dropped = sel.reconcile_against_registry(&registry, &mut prefs);

        assert_eq!(dropped, vec!["A"]);
        assert_eq!(sel.names(), ["B"]);
        assert_eq!(prefs.load_selection(4), vec!["B"]);
    }

    #[test]
    fn test_every_mutation_persists() {
        let registry = registry_with(&["A", "B"]);
        let mut prefs = PreferenceStore::in_memory();
        let mut sel = SelectionModel::new(4);

        sel.toggle("A", &registry, &mut prefs);
        assert_eq!(prefs.load_selection(4), vec!["A"]);
        sel.toggle("B", &registry, &mut prefs);
        assert_eq!(prefs.load_selection(4), vec!["A", "B"]);
        sel.toggle("A", &registry, &mut prefs);
        assert_eq!(prefs.load_selection(4), vec!["B"]);
    }

    #[test]
    fn test_load_truncates_and_dedups() {
        let mut prefs = PreferenceStore::in_memory();
        prefs.save(PrefKey::Selection, &vec!["A", "A", "B", "C"]);
        let sel = SelectionModel::load(3, &mut prefs);
        assert_eq!(sel.names(), ["A", "B", "C"]);

        prefs.save(PrefKey::Selection, &vec!["A", "A", "B"]);
        let sel = SelectionModel::load(2, &mut prefs);
        assert_eq!(sel.names(), ["A", "B"]);
    }

    #[test]
    fn test_capacity_minimum_one() {
        assert_eq!(SelectionModel::new(0).capacity(), 1);
    }
}
