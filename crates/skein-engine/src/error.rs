//! Error types for the engine.

use skein_shard::LockError;
use skein_store::StoreError;
use skein_types::{NodeName, ShardIndex};

/// Errors returned by [`AccessFacade`](crate::AccessFacade) operations.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Another node owns the shard for this path. The caller must resolve
    /// ownership again and go there; this node does not forward.
    #[error("wrong node for {path}: shard {shard} is owned by {owner}")]
    WrongNode {
        /// Canonical path of the request.
        path: String,
        /// Shard the path maps to.
        shard: ShardIndex,
        /// Node that owns the shard.
        owner: NodeName,
    },

    /// The shard lock could not be taken. Usually transient.
    #[error("shard {shard} unavailable: {source}")]
    ShardLocked {
        /// Shard the path maps to.
        shard: ShardIndex,
        /// Why the lock could not be taken.
        source: LockError,
    },

    /// A namespace or resource operation failed.
    #[error("io error: {0}")]
    Io(#[from] StoreError),

    /// The path was evicted from the cache but deleting it failed. The
    /// path may still exist; retrying the removal is safe.
    #[error("failed to remove {path}: {source}")]
    RemoveFailed {
        /// Canonical path of the request.
        path: String,
        /// Underlying namespace error.
        source: StoreError,
    },
}

impl AccessError {
    /// Whether retrying the same request on this node may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ShardLocked { .. } | Self::RemoveFailed { .. })
    }
}
