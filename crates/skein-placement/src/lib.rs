//! Consistent hashing ring for shard ownership.
//!
//! This crate maps the fixed shard space onto the live cluster members:
//!
//! - [`Ring`] is an immutable snapshot built from a member set. Each member
//!   contributes `replicas` virtual points at `blake3(name ++ replica)`.
//! - [`HashRing`] is the local node's live view. It owns the member set and
//!   rebuilds the ring wholesale on every join or leave.
//!
//! A shard is owned by the node of the first point strictly greater than
//! `blake3(shard_le_bytes)`, wrapping around to the first point.

mod hash_ring;
mod ring;

pub use hash_ring::HashRing;
pub use ring::{Ring, RingPoint, shard_position, vnode_position};
