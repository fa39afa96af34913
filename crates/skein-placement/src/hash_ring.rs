//! Live ownership view over the current member set.

use std::collections::{BTreeMap, BTreeSet};
use std::num::{NonZeroU8, NonZeroU16};
use std::sync::Arc;

use skein_types::{NodeName, ShardIndex};
use tracing::{debug, warn};

use crate::ring::Ring;

/// The local node's view of shard ownership.
///
/// Tracks the live member set and the [`Ring`] built from it. Every
/// [`add`](Self::add) or [`remove`](Self::remove) rebuilds the ring from
/// scratch and swaps the new snapshot in.
///
/// `HashRing` does no locking of its own; callers serialize mutation (the
/// engine keeps it behind the node's coordination lock).
#[derive(Debug, Clone)]
pub struct HashRing {
    local: NodeName,
    replicas: NonZeroU8,
    members: BTreeSet<NodeName>,
    ring: Arc<Ring>,
}

impl HashRing {
    /// Create a ring whose only member is the local node.
    pub fn new(local: NodeName, replicas: NonZeroU8) -> Self {
        let members = BTreeSet::from([local.clone()]);
        let ring = Arc::new(Ring::build(&members, replicas));
        Self {
            local,
            replicas,
            members,
            ring,
        }
    }

    /// Add a member and rebuild the ring.
    ///
    /// Returns `true` if the member was not already present.
    pub fn add(&mut self, node: NodeName) -> bool {
        let added = self.members.insert(node.clone());
        self.rebuild();
        debug!(%node, added, "ring add");
        added
    }

    /// Remove a member and rebuild the ring.
    ///
    /// The local node is never removed: the membership layer always lists
    /// it, and a ring without it could be empty. Returns `true` if the
    /// member was present and removed.
    pub fn remove(&mut self, node: &NodeName) -> bool {
        if *node == self.local {
            warn!(%node, "ignoring removal of the local node from the ring");
            return false;
        }
        let removed = self.members.remove(node);
        self.rebuild();
        debug!(%node, removed, "ring remove");
        removed
    }

    fn rebuild(&mut self) {
        self.ring = Arc::new(Ring::build(&self.members, self.replicas));
        debug!(
            members = self.members.len(),
            points = self.ring.point_count(),
            "ring rebuilt"
        );
    }

    /// The local node's name, fixed at construction.
    pub fn local_node(&self) -> &NodeName {
        &self.local
    }

    /// The node that owns `shard` under the current ring.
    pub fn node_of(&self, shard: ShardIndex) -> &NodeName {
        // The local node is always a member, so the ring always has points.
        self.ring.owner(shard).unwrap_or(&self.local)
    }

    /// Whether the local node owns `shard`.
    pub fn is_local(&self, shard: ShardIndex) -> bool {
        *self.node_of(shard) == self.local
    }

    /// Shards in `0..num_shards` owned by the local node.
    pub fn local_shards(&self, num_shards: NonZeroU16) -> Vec<ShardIndex> {
        ShardIndex::all(num_shards)
            .filter(|s| self.is_local(*s))
            .collect()
    }

    /// Ownership of every shard in `0..num_shards`, grouped by node.
    ///
    /// Members that own no shard are listed with an empty vector.
    pub fn assignment(&self, num_shards: NonZeroU16) -> BTreeMap<NodeName, Vec<ShardIndex>> {
        let mut map: BTreeMap<NodeName, Vec<ShardIndex>> = self
            .members
            .iter()
            .map(|m| (m.clone(), Vec::new()))
            .collect();
        for shard in ShardIndex::all(num_shards) {
            map.entry(self.node_of(shard).clone()).or_default().push(shard);
        }
        map
    }

    /// Current ring snapshot.
    pub fn snapshot(&self) -> Arc<Ring> {
        Arc::clone(&self.ring)
    }

    /// Whether `node` is a live member.
    pub fn contains(&self, node: &NodeName) -> bool {
        self.members.contains(node)
    }

    /// Live members in name order.
    pub fn members(&self) -> impl Iterator<Item = &NodeName> {
        self.members.iter()
    }

    /// Number of live members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Virtual replicas per member.
    pub fn replicas(&self) -> NonZeroU8 {
        self.replicas
    }
}
