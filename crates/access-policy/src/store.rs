use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// The authoritative set of explicitly blocked application identifiers.
///
/// Identifiers are opaque strings compared by equality; nothing is validated,
/// so empty or malformed identifiers are stored like any other. The store is
/// created empty and lives only as long as the process.
///
/// All operations take `&self` and are safe to call concurrently. Each call is
/// atomic on its own; there are no multi-operation transactions.
#[derive(Debug, Default)]
pub struct RuleStore {
    entries: RwLock<HashSet<String>>,
}

impl RuleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`. Returns `true` if it was not already present.
    pub fn add(&self, id: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(id.to_string())
    }

    /// Remove `id` if present. Returns `true` if an entry was removed; an
    /// absent id leaves the store untouched.
    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(id)
    }

    /// Membership test.
    pub fn contains(&self, id: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the current entries, for diagnostics.
    pub fn snapshot(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = entries.iter().cloned().collect();
        ids.sort();
        ids
    }
}
