//! Open resource handles keyed by canonical path.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe map from canonical path to an open handle.
///
/// Handles are shared as `Arc<H>` so a caller can keep using a handle it
/// got from [`get`](Self::get) while the cache moves on. The cache has its
/// own lock, separate from the coordination lock, because lookups are
/// read-heavy.
#[derive(Debug)]
pub struct ResourceCache<H> {
    entries: RwLock<HashMap<String, Arc<H>>>,
}

impl<H> Default for ResourceCache<H> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<H> ResourceCache<H> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the cached paths, in no particular order.
    pub fn list(&self) -> Vec<String> {
        self.entries
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Handle cached for `path`.
    pub fn get(&self, path: &str) -> Option<Arc<H>> {
        self.entries
            .read()
            .expect("lock poisoned")
            .get(path)
            .cloned()
    }

    /// Cache `handle` for `path`, returning the handle it replaced.
    pub fn insert(&self, path: String, handle: Arc<H>) -> Option<Arc<H>> {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(path, handle)
    }

    /// Remove and return the handle for `path`.
    pub fn remove(&self, path: &str) -> Option<Arc<H>> {
        self.entries.write().expect("lock poisoned").remove(path)
    }

    /// Remove and return every entry.
    pub fn drain(&self) -> Vec<(String, Arc<H>)> {
        self.entries.write().expect("lock poisoned").drain().collect()
    }

    /// Whether `path` is cached.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.read().expect("lock poisoned").contains_key(path)
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
