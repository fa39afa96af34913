//! [`SkeinNode`]: wires the ring, shard locks, cache and facade together.

use std::collections::{BTreeMap, BTreeSet};
use std::num::{NonZeroU8, NonZeroU16};
use std::path::PathBuf;
use std::sync::Arc;

use skein_placement::{HashRing, Ring};
use skein_shard::{LockError, ShardMap, Sharder};
use skein_store::{Namespace, Resource, StoreError, canonical_key};
use skein_types::{DEFAULT_NUM_REPLICAS, DEFAULT_NUM_SHARDS, NodeName, ShardIndex};
use tracing::{info, warn};

use crate::cache::ResourceCache;
use crate::coordinator::Coordinator;
use crate::facade::AccessFacade;
use crate::reconciler::MembershipReconciler;

/// Configuration for creating a [`SkeinNode`].
#[derive(Debug, Clone)]
pub struct SkeinNodeConfig {
    /// This node's name in the cluster.
    pub name: NodeName,
    /// Number of shards. Must agree across the cluster.
    pub num_shards: NonZeroU16,
    /// Virtual ring points per node. Must agree across the cluster.
    pub num_replicas: NonZeroU8,
    /// Logical directory in the namespace holding the lock directory.
    pub lock_base: PathBuf,
}

impl SkeinNodeConfig {
    /// Defaults for a node called `name`.
    pub fn new(name: impl Into<NodeName>) -> Self {
        Self {
            name: name.into(),
            num_shards: DEFAULT_NUM_SHARDS,
            num_replicas: DEFAULT_NUM_REPLICAS,
            lock_base: PathBuf::from("/"),
        }
    }
}

/// What an orderly shutdown left behind.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Handles that were open and have been closed.
    pub closed: usize,
    /// Locks that could not be released.
    pub lock_failures: Vec<LockError>,
}

/// A cluster node serving the shards the ring assigns to it.
///
/// Starts as the only member of its ring, owning every shard. Feed
/// membership changes through [`reconciler`](Self::reconciler) and serve
/// requests through [`facade`](Self::facade).
#[derive(Debug)]
pub struct SkeinNode<N: Namespace> {
    name: NodeName,
    num_shards: NonZeroU16,
    namespace: Arc<N>,
    coordinator: Arc<Coordinator<N>>,
    cache: Arc<ResourceCache<N::Handle>>,
    facade: AccessFacade<N>,
    reconciler: Arc<MembershipReconciler<N>>,
}

impl<N: Namespace> SkeinNode<N> {
    /// Create a node over `namespace`.
    pub fn new(config: SkeinNodeConfig, namespace: Arc<N>) -> Self {
        let ring = HashRing::new(config.name.clone(), config.num_replicas);
        let sharder = Sharder::new(
            ShardMap::new(config.num_shards),
            Arc::clone(&namespace),
            config.lock_base,
        );
        let coordinator = Arc::new(Coordinator::new(ring, sharder));
        let cache = Arc::new(ResourceCache::new());
        let facade = AccessFacade::new(
            Arc::clone(&coordinator),
            Arc::clone(&cache),
            Arc::clone(&namespace),
        );
        let reconciler = Arc::new(MembershipReconciler::new(
            Arc::clone(&coordinator),
            Arc::clone(&cache),
        ));

        info!(
            node = %config.name,
            num_shards = config.num_shards.get(),
            num_replicas = config.num_replicas.get(),
            "node created"
        );
        Self {
            name: config.name,
            num_shards: config.num_shards,
            namespace,
            coordinator,
            cache,
            facade,
            reconciler,
        }
    }

    /// This node's name.
    pub fn name(&self) -> &NodeName {
        &self.name
    }

    /// Configured shard count.
    pub fn num_shards(&self) -> NonZeroU16 {
        self.num_shards
    }

    /// Request entry point.
    pub fn facade(&self) -> &AccessFacade<N> {
        &self.facade
    }

    /// Membership event handler, shareable with a
    /// [`MembershipFeed`](skein_cluster::MembershipFeed).
    pub fn reconciler(&self) -> &Arc<MembershipReconciler<N>> {
        &self.reconciler
    }

    /// The resource cache.
    pub fn cache(&self) -> &Arc<ResourceCache<N::Handle>> {
        &self.cache
    }

    /// The underlying namespace.
    pub fn namespace(&self) -> &Arc<N> {
        &self.namespace
    }

    /// Shard of `path` and the node that currently owns it.
    pub fn owner_of(&self, path: &str) -> Result<(ShardIndex, NodeName), StoreError> {
        let key = canonical_key(path)?;
        let placement = self.coordinator.lock();
        let (shard, owner) = placement.owner_of(&key);
        Ok((shard, owner.clone()))
    }

    /// Current ring snapshot.
    pub fn ring(&self) -> Arc<Ring> {
        self.coordinator.lock().ring.snapshot()
    }

    /// Ring members in name order.
    pub fn members(&self) -> Vec<NodeName> {
        self.coordinator.lock().ring.members().cloned().collect()
    }

    /// Shards the ring currently assigns to this node.
    pub fn owned_shards(&self) -> Vec<ShardIndex> {
        self.coordinator.lock().ring.local_shards(self.num_shards)
    }

    /// Shard ownership grouped by node.
    pub fn assignment(&self) -> BTreeMap<NodeName, Vec<ShardIndex>> {
        self.coordinator.lock().ring.assignment(self.num_shards)
    }

    /// Shards whose locks this node holds.
    pub fn held_locks(&self) -> BTreeSet<ShardIndex> {
        self.coordinator.lock().sharder.held()
    }

    /// Close every cached handle and release every shard lock.
    ///
    /// Runs under the coordination lock, so no request is served halfway
    /// through. The node stays usable: later requests reacquire what they
    /// need.
    pub fn shutdown(&self) -> ShutdownReport {
        let mut placement = self.coordinator.lock();
        let mut closed = 0;
        for (path, handle) in self.cache.drain() {
            if let Err(e) = handle.close() {
                warn!(%path, error = %e, "failed to close handle on shutdown");
            }
            closed += 1;
        }
        let lock_failures = placement.sharder.release_all();
        for e in &lock_failures {
            warn!(shard = %e.shard(), error = %e, "shard lock still held after shutdown");
        }
        info!(node = %self.name, closed, "node shut down");
        ShutdownReport {
            closed,
            lock_failures,
        }
    }
}
