//! Shared types and identifiers for skein.
//!
//! This crate defines the core types used across the skein workspace:
//! identifiers ([`NodeName`], [`ShardIndex`]), membership notifications
//! ([`MembershipEvent`]), and the constants every node in a cluster must
//! agree on ([`DEFAULT_NUM_SHARDS`], [`DEFAULT_NUM_REPLICAS`], [`LOCK_DIR`]).

use std::fmt;
use std::num::{NonZeroU8, NonZeroU16};
use std::sync::Arc;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default number of shards the key space is partitioned into.
pub const DEFAULT_NUM_SHARDS: NonZeroU16 = NonZeroU16::new(8).unwrap();

/// Default number of virtual replicas each node places on the ring.
pub const DEFAULT_NUM_REPLICAS: NonZeroU8 = NonZeroU8::new(2).unwrap();

/// Directory (relative to the storage base) holding one lock file per shard.
pub const LOCK_DIR: &str = ".shards";

// ---------------------------------------------------------------------------
// ID types
// ---------------------------------------------------------------------------

/// Name of a cluster member.
///
/// Names are opaque strings unique per member; the membership layer decides
/// their format (the daemon uses the `host:port` bind address). Cloning is
/// cheap because the string is shared.
#[derive(Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Deserialize)]
#[serde(transparent)]
pub struct NodeName(Arc<str>);

impl NodeName {
    /// Create a node name from any string.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the raw bytes of the name (used for ring hashing).
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for NodeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NodeName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeName({})", self.0)
    }
}

/// Index of one of the fixed partitions of the key space (`0..num_shards`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ShardIndex(u16);

impl ShardIndex {
    /// Wrap a raw shard number.
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Return the raw shard number.
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Little-endian encoding, used as the input of the ring position hash.
    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Iterate every shard index in `0..num_shards`.
    pub fn all(num_shards: NonZeroU16) -> impl Iterator<Item = ShardIndex> + Clone {
        (0..num_shards.get()).map(ShardIndex)
    }
}

impl From<u16> for ShardIndex {
    fn from(index: u16) -> Self {
        Self(index)
    }
}

impl fmt::Display for ShardIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ShardIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardIndex({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// A change in the cluster view, as reported by the membership layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// A node has joined the cluster.
    Join(NodeName),
    /// A node has left the cluster or was declared dead.
    Leave(NodeName),
    /// A node's metadata changed. Never affects ownership.
    Update(NodeName),
}

impl MembershipEvent {
    /// The node this event is about.
    pub fn node(&self) -> &NodeName {
        match self {
            Self::Join(node) | Self::Leave(node) | Self::Update(node) => node,
        }
    }
}

impl fmt::Display for MembershipEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join(node) => write!(f, "join {node}"),
            Self::Leave(node) => write!(f, "leave {node}"),
            Self::Update(node) => write!(f, "update {node}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
