//! Process filter
//!
//! The set of known process tags is derived from the store; the current
//! selection narrows each collection to a single tag or shows everything.

use tracing::debug;

use crate::entity::{Entity, EntityKind};
use crate::store::EntityStore;

/// Sentinel filter value matching every process
pub const ALL: &str = "ALL";

#[derive(Debug, Clone)]
pub struct ProcessFilter {
    options: Vec<String>,
    current: String,
    seen_revision: Option<u64>,
}

impl Default for ProcessFilter {
    fn default() -> Self {
        Self {
            options: vec![ALL.to_string()],
            current: ALL.to_string(),
            seen_revision: None,
        }
    }
}

impl ProcessFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `"ALL"` followed by the sorted distinct non-empty process tags
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// The current tag, or `None` when showing everything
    pub fn specific(&self) -> Option<&str> {
        (self.current != ALL).then_some(self.current.as_str())
    }

    /// Recompute the option set if the store changed since the last call.
    ///
    /// Returns `true` only when the option set or the current value actually
    /// changed, so callers can skip a redraw otherwise.
    pub fn refresh(&mut self, store: &EntityStore) -> bool {
        if self.seen_revision == Some(store.revision()) {
            return false;
        }
        self.seen_revision = Some(store.revision());

        let options = derive_options(store);
        if options == self.options {
            return false;
        }
        self.options = options;
        if !self.options.contains(&self.current) {
            debug!(previous = %self.current, "Process filter value disappeared, resetting");
            self.current = ALL.to_string();
        }
        true
    }

    /// Choose a filter value; only `"ALL"` or a known tag is accepted
    pub fn select(&mut self, value: &str) -> bool {
        if self.options.iter().any(|o| o == value) {
            self.current = value.to_string();
            true
        } else {
            false
        }
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.current == ALL || entity.process == self.current
    }

    /// The visible slice of one collection, in store order
    pub fn apply<'a>(&self, store: &'a EntityStore, kind: EntityKind) -> Vec<&'a Entity> {
        store
            .collection(kind)
            .iter()
            .filter(|e| self.matches(e))
            .collect()
    }
}

fn derive_options(store: &EntityStore) -> Vec<String> {
    let mut tags: Vec<String> = store
        .iter()
        .map(|e| e.process.as_str())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    tags.sort();
    tags.dedup();

    let mut options = Vec::with_capacity(tags.len() + 1);
    options.push(ALL.to_string());
    options.extend(tags);
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityPatch;
    use crate::store::AddRequest;

    fn store() -> EntityStore {
        let mut store = EntityStore::new();
        store
            .replace(
                EntityKind::WeldPoint,
                vec![
                    Entity::new(EntityKind::WeldPoint, "W1", [0.0; 3]).with_process("P1"),
                    Entity::new(EntityKind::WeldPoint, "W2", [0.0; 3]).with_process("P2"),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_options_and_apply() {
        let store = store();
        let mut filter = ProcessFilter::new();
        assert!(filter.refresh(&store));
        assert_eq!(filter.options(), ["ALL", "P1", "P2"]);

        assert!(filter.select("P1"));
        let ids: Vec<_> = filter
            .apply(&store, EntityKind::WeldPoint)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, ["W1"]);
        assert!(!filter.select("P9"));
        assert_eq!(filter.current(), "P1");
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let mut store = store();
        let mut filter = ProcessFilter::new();
        assert!(filter.refresh(&store));
        assert!(!filter.refresh(&store));

        // A mutation that does not change tags reports unchanged
        store.update(EntityKind::WeldPoint, "W1", &EntityPatch::position([1.0; 3])).unwrap();
        assert!(!filter.refresh(&store));
    }

    #[test]
    fn test_current_resets_when_tag_disappears() {
        let mut store = store();
        let mut filter = ProcessFilter::new();
        filter.refresh(&store);
        filter.select("P2");

        store.remove(EntityKind::WeldPoint, "W2");
        assert!(filter.refresh(&store));
        assert_eq!(filter.current(), ALL);
        assert_eq!(filter.options(), ["ALL", "P1"]);
    }

    #[test]
    fn test_empty_process_is_not_an_option() {
        let mut store = store();
        store.add(EntityKind::Pin, AddRequest::default());
        let mut filter = ProcessFilter::new();
        filter.refresh(&store);
        assert_eq!(filter.options(), ["ALL", "P1", "P2"]);
        assert_eq!(filter.apply(&store, EntityKind::Pin).len(), 1);
    }
}
