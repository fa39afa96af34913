//! Membership-driven reconciliation of shard locks and cached handles.
//!
//! On every join or leave the reconciler rebuilds the ring, then brings the
//! node back in line with the new ownership in two passes that run in
//! parallel:
//!
//! - release: every shard this node no longer owns has its lock released;
//! - evict: every cached path whose shard is foreign is removed from the
//!   cache and its handle closed.
//!
//! Both passes finish before the coordination lock is dropped. Failures are
//! logged and skipped; the next notification of any kind, including a
//! duplicate join or an update, evaluates everything again.

use std::sync::Arc;

use skein_cluster::EventDelegate;
use skein_placement::HashRing;
use skein_shard::{ShardMap, Sharder};
use skein_store::{Namespace, Resource};
use skein_types::{NodeName, ShardIndex};
use tracing::{debug, info, warn};

use crate::cache::ResourceCache;
use crate::coordinator::{Coordinator, Placement};

/// What one reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Shards whose locks were released.
    pub released: Vec<ShardIndex>,
    /// Foreign shards whose locks could not be released.
    pub release_failed: Vec<ShardIndex>,
    /// Paths evicted from the cache.
    pub evicted: Vec<String>,
}

/// Applies membership events to the ring and reconciles locks and cache.
#[derive(Debug)]
pub struct MembershipReconciler<N: Namespace> {
    coordinator: Arc<Coordinator<N>>,
    cache: Arc<ResourceCache<N::Handle>>,
}

impl<N: Namespace> MembershipReconciler<N> {
    /// Create a reconciler over shared node state.
    pub fn new(coordinator: Arc<Coordinator<N>>, cache: Arc<ResourceCache<N::Handle>>) -> Self {
        Self { coordinator, cache }
    }

    /// Add `node` to the ring and reconcile.
    pub fn join(&self, node: &NodeName) -> ReconcileReport {
        let mut placement = self.coordinator.lock();
        placement.ring.add(node.clone());
        self.reconcile_locked(&mut placement)
    }

    /// Remove `node` from the ring and reconcile.
    ///
    /// Removing the local node leaves the ring unchanged.
    pub fn leave(&self, node: &NodeName) -> ReconcileReport {
        let mut placement = self.coordinator.lock();
        placement.ring.remove(node);
        self.reconcile_locked(&mut placement)
    }

    /// Reconcile against the current ring without changing it.
    pub fn reconcile(&self) -> ReconcileReport {
        let mut placement = self.coordinator.lock();
        self.reconcile_locked(&mut placement)
    }

    fn reconcile_locked(&self, placement: &mut Placement<N>) -> ReconcileReport {
        let Placement { ring, sharder } = placement;
        let ring: &HashRing = ring;
        let map = sharder.shard_map();
        let cache = &*self.cache;

        let ((released, release_failed), evicted) = std::thread::scope(|s| {
            let evict = s.spawn(move || evict_foreign(ring, map, cache));
            let released = release_foreign(ring, sharder);
            let evicted = evict
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (released, evicted)
        });

        info!(
            members = ring.member_count(),
            owned = ring.local_shards(map.num_shards()).len(),
            released = released.len(),
            release_failed = release_failed.len(),
            evicted = evicted.len(),
            "reconciled after membership change"
        );
        ReconcileReport {
            released,
            release_failed,
            evicted,
        }
    }
}

/// Release every lock on a shard the ring no longer assigns here.
fn release_foreign<N: Namespace>(
    ring: &HashRing,
    sharder: &mut Sharder<N>,
) -> (Vec<ShardIndex>, Vec<ShardIndex>) {
    let mut released = Vec::new();
    let mut failed = Vec::new();
    for shard in sharder.shard_map().shards() {
        if ring.is_local(shard) {
            continue;
        }
        let was_held = sharder.is_held(shard);
        match sharder.release(shard) {
            Ok(()) if was_held => released.push(shard),
            Ok(()) => {}
            Err(e) => {
                warn!(%shard, error = %e, "failed to release foreign shard lock");
                failed.push(shard);
            }
        }
    }
    if !released.is_empty() {
        debug!(count = released.len(), "released foreign shard locks");
    }
    (released, failed)
}

/// Evict and close every cached handle whose shard the ring no longer
/// assigns here.
fn evict_foreign<H: Resource>(
    ring: &HashRing,
    map: ShardMap,
    cache: &ResourceCache<H>,
) -> Vec<String> {
    let mut evicted = Vec::new();
    for path in cache.list() {
        let shard = map.shard_of(&path);
        if ring.is_local(shard) {
            continue;
        }
        let Some(handle) = cache.remove(&path) else {
            continue;
        };
        if let Err(e) = handle.close() {
            warn!(%path, %shard, error = %e, "failed to close evicted handle");
        }
        debug!(%path, %shard, owner = %ring.node_of(shard), "evicted foreign path");
        evicted.push(path);
    }
    evicted
}

impl<N: Namespace + 'static> EventDelegate for MembershipReconciler<N> {
    fn notify_join(&self, node: &NodeName) {
        info!(%node, "node joined");
        self.join(node);
    }

    fn notify_leave(&self, node: &NodeName) {
        info!(%node, "node left");
        self.leave(node);
    }

    fn notify_update(&self, node: &NodeName) {
        debug!(%node, "node updated");
        self.reconcile();
    }
}
