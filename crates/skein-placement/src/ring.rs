//! Immutable consistent hashing ring snapshot.

use std::num::NonZeroU8;

use skein_types::{NodeName, ShardIndex};

/// One virtual replica of a node on the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingPoint {
    /// Position on the u64 ring.
    pub position: u64,
    /// The node this point belongs to.
    pub node: NodeName,
}

/// A consistent hashing ring built from a fixed member set.
///
/// A `Ring` is never mutated after [`Ring::build`]: membership changes build
/// a new ring and swap it in. This keeps every ring a pure function of the
/// member set and the replica count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    /// Points sorted by `(position, node)`.
    points: Vec<RingPoint>,
    /// Number of distinct members that contributed points.
    member_count: usize,
}

impl Ring {
    /// Build a ring with `replicas` points per member.
    ///
    /// Duplicate member names contribute their points only once. Points that
    /// collide on the same position are ordered by node name so the result
    /// does not depend on iteration order.
    pub fn build<'a, I>(members: I, replicas: NonZeroU8) -> Self
    where
        I: IntoIterator<Item = &'a NodeName>,
    {
        let mut nodes: Vec<&NodeName> = members.into_iter().collect();
        nodes.sort();
        nodes.dedup();

        let mut points = Vec::with_capacity(nodes.len() * replicas.get() as usize);
        for node in &nodes {
            for replica in 0..replicas.get() {
                points.push(RingPoint {
                    position: vnode_position(node, replica),
                    node: (*node).clone(),
                });
            }
        }
        points.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.node.cmp(&b.node)));

        Self {
            points,
            member_count: nodes.len(),
        }
    }

    /// Return the node owning a shard, or `None` if the ring is empty.
    pub fn owner(&self, shard: ShardIndex) -> Option<&NodeName> {
        self.position_owner(shard_position(shard))
    }

    /// Return the node owning a ring position.
    ///
    /// The owner is the node of the first point strictly greater than
    /// `position`, wrapping to the first point when none is greater.
    pub fn position_owner(&self, position: u64) -> Option<&NodeName> {
        let idx = self.points.partition_point(|p| p.position <= position);
        self.points
            .get(idx)
            .or_else(|| self.points.first())
            .map(|p| &p.node)
    }

    /// All points in ring order.
    pub fn points(&self) -> &[RingPoint] {
        &self.points
    }

    /// Total number of points on the ring.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of distinct members on the ring.
    pub fn member_count(&self) -> usize {
        self.member_count
    }

    /// Whether the ring has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Position of a virtual replica: `blake3(node_name ++ replica)` truncated to u64.
pub fn vnode_position(node: &NodeName, replica: u8) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(node.as_bytes());
    hasher.update(&[replica]);
    truncate(hasher.finalize())
}

/// Position of a shard: `blake3(shard_le_bytes)` truncated to u64.
pub fn shard_position(shard: ShardIndex) -> u64 {
    truncate(blake3::hash(&shard.to_le_bytes()))
}

fn truncate(hash: blake3::Hash) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
