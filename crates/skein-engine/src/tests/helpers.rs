//! Shared test utilities for skein-engine tests.

use std::num::{NonZeroU8, NonZeroU16};
use std::sync::Arc;

use skein_shard::ShardMap;
use skein_store::MemoryNamespace;
use skein_types::{NodeName, ShardIndex};

use crate::node::{SkeinNode, SkeinNodeConfig};

pub const NUM_SHARDS: u16 = 8;
pub const NUM_REPLICAS: u8 = 2;

pub fn config(name: &str) -> SkeinNodeConfig {
    SkeinNodeConfig {
        num_shards: NonZeroU16::new(NUM_SHARDS).unwrap(),
        num_replicas: NonZeroU8::new(NUM_REPLICAS).unwrap(),
        ..SkeinNodeConfig::new(name)
    }
}

/// A single node over a fresh in-memory namespace.
pub fn single_node(name: &str) -> (SkeinNode<MemoryNamespace>, MemoryNamespace) {
    let ns = MemoryNamespace::new();
    let node = SkeinNode::new(config(name), Arc::new(ns.clone()));
    (node, ns)
}

/// Two nodes sharing one namespace, so their shard locks contend. Neither
/// knows about the other yet.
pub fn node_pair(
    a: &str,
    b: &str,
) -> (
    SkeinNode<MemoryNamespace>,
    SkeinNode<MemoryNamespace>,
    MemoryNamespace,
) {
    let ns = MemoryNamespace::new();
    let shared = Arc::new(ns.clone());
    let node_a = SkeinNode::new(config(a), Arc::clone(&shared));
    let node_b = SkeinNode::new(config(b), shared);
    (node_a, node_b, ns)
}

/// A path whose shard satisfies `pred`.
pub fn path_where(pred: impl Fn(ShardIndex) -> bool) -> String {
    let map = ShardMap::new(NonZeroU16::new(NUM_SHARDS).unwrap());
    (0..10_000)
        .map(|i| format!("/data/file-{i}"))
        .find(|p| pred(map.shard_of(p)))
        .expect("no path maps to a matching shard")
}

/// A path in a shard owned by `owner` according to `node`'s ring.
pub fn path_owned_by(node: &SkeinNode<MemoryNamespace>, owner: &str) -> String {
    let owner = NodeName::from(owner);
    let assignment = node.assignment();
    let shards = assignment.get(&owner).cloned().unwrap_or_default();
    path_where(|s| shards.contains(&s))
}
