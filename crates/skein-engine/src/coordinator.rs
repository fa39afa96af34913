//! The process-wide coordination lock.

use std::sync::{Mutex, MutexGuard};

use skein_placement::HashRing;
use skein_shard::Sharder;
use skein_store::Namespace;
use skein_types::{NodeName, ShardIndex};

/// Ownership state that must change atomically: the ring and the shard
/// locks derived from it.
#[derive(Debug)]
pub struct Placement<N: Namespace> {
    /// Current ring.
    pub ring: HashRing,
    /// Shard locks held by this node.
    pub sharder: Sharder<N>,
}

impl<N: Namespace> Placement<N> {
    /// Shard of `key` and the node that owns it.
    pub fn owner_of(&self, key: &str) -> (ShardIndex, &NodeName) {
        let shard = self.sharder.shard_of(key);
        (shard, self.ring.node_of(shard))
    }
}

/// Serializes every facade request and every membership reconciliation.
///
/// "Check ownership, take the shard lock, touch the cache" and "rebuild the
/// ring, release locks, evict" each run entirely under this lock, so a
/// request never sees a half-reconciled node. The lock is not reentrant.
#[derive(Debug)]
pub struct Coordinator<N: Namespace> {
    placement: Mutex<Placement<N>>,
}

impl<N: Namespace> Coordinator<N> {
    /// Wrap the initial ring and sharder.
    pub fn new(ring: HashRing, sharder: Sharder<N>) -> Self {
        Self {
            placement: Mutex::new(Placement { ring, sharder }),
        }
    }

    /// Take the coordination lock.
    pub fn lock(&self) -> MutexGuard<'_, Placement<N>> {
        self.placement.lock().expect("lock poisoned")
    }
}
