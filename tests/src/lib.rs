//! Shared test harness for skein integration tests.
//!
//! Provides [`TestCluster`]: N [`SkeinNode`]s in one process sharing a single
//! namespace, so their shard locks genuinely contend the way separate
//! processes on one filesystem would. Membership is delivered by hand
//! through each node's reconciler.

use std::collections::BTreeSet;
use std::num::{NonZeroU8, NonZeroU16};
use std::sync::Arc;

use skein_engine::{SkeinNode, SkeinNodeConfig};
use skein_shard::ShardMap;
use skein_store::{MemoryNamespace, Namespace};
use skein_types::{NodeName, ShardIndex};

/// Shard count used unless a test asks for another.
pub const NUM_SHARDS: u16 = 8;
/// Replica count used unless a test asks for another.
pub const NUM_REPLICAS: u8 = 2;

/// Node configuration shared by every harness node.
pub fn node_config(name: &str, num_shards: u16, num_replicas: u8) -> SkeinNodeConfig {
    SkeinNodeConfig {
        num_shards: NonZeroU16::new(num_shards).expect("num_shards must be non-zero"),
        num_replicas: NonZeroU8::new(num_replicas).expect("num_replicas must be non-zero"),
        ..SkeinNodeConfig::new(name)
    }
}

/// A path that maps to `shard` under `num_shards` shards.
pub fn path_in_shard(shard: ShardIndex, num_shards: u16) -> String {
    let map = ShardMap::new(NonZeroU16::new(num_shards).expect("num_shards must be non-zero"));
    (0..100_000)
        .map(|i| format!("/files/{i}"))
        .find(|p| map.shard_of(p) == shard)
        .expect("no path maps to the shard")
}

/// One path per shard, indexed by shard.
pub fn path_per_shard(num_shards: u16) -> Vec<String> {
    (0..num_shards)
        .map(|i| path_in_shard(ShardIndex::new(i), num_shards))
        .collect()
}

/// In-process cluster over one shared namespace.
pub struct TestCluster<N: Namespace = MemoryNamespace> {
    nodes: Vec<SkeinNode<N>>,
    namespace: Arc<N>,
    num_shards: u16,
}

impl TestCluster<MemoryNamespace> {
    /// Nodes named `names` over a fresh in-memory namespace, each alone in
    /// its ring.
    pub fn new(names: &[&str]) -> Self {
        Self::with_namespace(names, Arc::new(MemoryNamespace::new()), NUM_SHARDS, NUM_REPLICAS)
    }
}

impl<N: Namespace> TestCluster<N> {
    /// Nodes named `names` over `namespace`, each alone in its ring.
    pub fn with_namespace(
        names: &[&str],
        namespace: Arc<N>,
        num_shards: u16,
        num_replicas: u8,
    ) -> Self {
        let nodes = names
            .iter()
            .map(|name| {
                SkeinNode::new(
                    node_config(name, num_shards, num_replicas),
                    Arc::clone(&namespace),
                )
            })
            .collect();
        Self {
            nodes,
            namespace,
            num_shards,
        }
    }

    /// The shared namespace.
    pub fn namespace(&self) -> &Arc<N> {
        &self.namespace
    }

    /// Configured shard count.
    pub fn num_shards(&self) -> u16 {
        self.num_shards
    }

    /// Node `i`.
    pub fn node(&self, i: usize) -> &SkeinNode<N> {
        &self.nodes[i]
    }

    /// The node called `name`.
    pub fn by_name(&self, name: &str) -> &SkeinNode<N> {
        self.nodes
            .iter()
            .find(|n| n.name().as_str() == name)
            .unwrap_or_else(|| panic!("no node named {name}"))
    }

    /// All nodes.
    pub fn nodes(&self) -> &[SkeinNode<N>] {
        &self.nodes
    }

    /// Tell every node about every other node.
    pub fn connect_all(&self) {
        for node in &self.nodes {
            for peer in &self.nodes {
                if peer.name() != node.name() {
                    node.reconciler().join(peer.name());
                }
            }
        }
    }

    /// Tell every node other than `name` that `name` joined.
    pub fn announce_join(&self, name: &str) {
        let subject = NodeName::from(name);
        for node in self.nodes.iter().filter(|n| *n.name() != subject) {
            node.reconciler().join(&subject);
        }
    }

    /// Tell every node other than `name` that `name` left.
    pub fn announce_leave(&self, name: &str) {
        let subject = NodeName::from(name);
        for node in self.nodes.iter().filter(|n| *n.name() != subject) {
            node.reconciler().leave(&subject);
        }
    }

    /// Shut `name` down and tell everyone else it left.
    pub fn depart(&self, name: &str) {
        self.by_name(name).shutdown();
        self.announce_leave(name);
    }

    /// Shards whose locks are held by `node`, for every node.
    pub fn held_by_node(&self) -> Vec<(NodeName, BTreeSet<ShardIndex>)> {
        self.nodes
            .iter()
            .map(|n| (n.name().clone(), n.held_locks()))
            .collect()
    }

    /// Panics if two nodes hold the same shard lock.
    pub fn assert_exclusive_locks(&self) {
        let mut seen: BTreeSet<ShardIndex> = BTreeSet::new();
        for (name, held) in self.held_by_node() {
            for shard in held {
                assert!(seen.insert(shard), "shard {shard} also held by {name}");
            }
        }
    }

    /// Panics if any node holds a lock or caches a path for a shard its
    /// ring does not assign to it.
    pub fn assert_reconciled(&self) {
        for node in &self.nodes {
            let owned: BTreeSet<ShardIndex> = node.owned_shards().into_iter().collect();
            for shard in node.held_locks() {
                assert!(
                    owned.contains(&shard),
                    "{} holds foreign shard {shard}",
                    node.name()
                );
            }
            for path in node.cache().list() {
                let (shard, owner) = node.owner_of(&path).expect("cached path is valid");
                assert_eq!(
                    &owner,
                    node.name(),
                    "{} caches {path} from foreign shard {shard}",
                    node.name()
                );
            }
        }
    }
}
