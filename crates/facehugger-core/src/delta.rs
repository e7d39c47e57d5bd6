use facehugger_schema::{CacheEntry, CacheSnapshot, RepoId, Revision};
use serde::Serialize;
use std::collections::HashSet;

/// Difference between two cache snapshots, keyed by repository and revision.
///
/// Ref changes on a revision present in both snapshots are not reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheDelta {
    pub added: Vec<CacheEntry>,
    pub removed: Vec<CacheEntry>,
}

impl CacheDelta {
    pub fn between(before: &CacheSnapshot, after: &CacheSnapshot) -> Self {
        Self {
            added: missing_from(after, before),
            removed: missing_from(before, after),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Entries of `from` whose key does not appear in `other`, in `from` order.
fn missing_from(from: &CacheSnapshot, other: &CacheSnapshot) -> Vec<CacheEntry> {
    let keys: HashSet<(&RepoId, &Revision)> = other.iter().map(CacheEntry::key).collect();
    let mut seen = HashSet::new();
    from.iter()
        .filter(|e| !keys.contains(&e.key()) && seen.insert(e.key()))
        .cloned()
        .collect()
}
