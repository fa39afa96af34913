//! Stable mapping from keys to shard indices.

use std::num::NonZeroU16;

use skein_types::ShardIndex;

/// Maps keys onto `0..num_shards`.
///
/// The shard of a key is `blake3(key)` truncated to u64, modulo the shard
/// count. The count is fixed for the life of a map, so the mapping never
/// changes; every node in a cluster must use the same count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardMap {
    num_shards: NonZeroU16,
}

impl ShardMap {
    /// Create a map over `num_shards` shards.
    pub fn new(num_shards: NonZeroU16) -> Self {
        Self { num_shards }
    }

    /// Configured shard count.
    pub fn num_shards(&self) -> NonZeroU16 {
        self.num_shards
    }

    /// Shard owning `key`.
    ///
    /// Keys are hashed verbatim: callers that accept several spellings of a
    /// path should canonicalize first (see [`skein_store::canonical_key`]).
    pub fn shard_of(&self, key: &str) -> ShardIndex {
        let hash = blake3::hash(key.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        let value = u64::from_le_bytes(bytes);
        // The remainder is below num_shards, which fits in u16.
        ShardIndex::new((value % u64::from(self.num_shards.get())) as u16)
    }

    /// Whether `shard` is within range.
    pub fn contains(&self, shard: ShardIndex) -> bool {
        shard.get() < self.num_shards.get()
    }

    /// Every shard index.
    pub fn shards(&self) -> impl Iterator<Item = ShardIndex> + Clone {
        ShardIndex::all(self.num_shards)
    }
}
