//! Error types for shard lock management.

use std::path::PathBuf;

use skein_store::StoreError;
use skein_types::ShardIndex;

/// Errors from acquiring or releasing a shard lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The shard index is not below the configured shard count.
    #[error("shard {shard} out of range: only {num_shards} shards")]
    OutOfRange {
        /// The rejected shard.
        shard: ShardIndex,
        /// Configured shard count.
        num_shards: u16,
    },

    /// Creating the lock directory failed.
    #[error("failed to prepare lock directory for shard {shard}: {source}")]
    Prepare {
        /// The shard being locked.
        shard: ShardIndex,
        /// Underlying namespace error.
        source: StoreError,
    },

    /// Opening the lock file failed.
    #[error("failed to open lock file for shard {shard}: {source}")]
    Open {
        /// The shard being locked.
        shard: ShardIndex,
        /// Underlying namespace error.
        source: StoreError,
    },

    /// Another process (or node) holds the shard lock.
    #[error("shard {shard} is locked elsewhere ({})", .path.display())]
    Contended {
        /// The shard being locked.
        shard: ShardIndex,
        /// Path of the contended lock file.
        path: PathBuf,
    },

    /// Taking the advisory lock failed for a reason other than contention.
    #[error("failed to lock shard {shard}: {source}")]
    Lock {
        /// The shard being locked.
        shard: ShardIndex,
        /// Underlying handle error.
        source: StoreError,
    },

    /// Releasing the advisory lock failed; the lock is still held.
    #[error("failed to unlock shard {shard}: {source}")]
    Unlock {
        /// The shard being released.
        shard: ShardIndex,
        /// Underlying handle error.
        source: StoreError,
    },
}

impl LockError {
    /// The shard this error is about.
    pub fn shard(&self) -> ShardIndex {
        match self {
            Self::OutOfRange { shard, .. }
            | Self::Prepare { shard, .. }
            | Self::Open { shard, .. }
            | Self::Contended { shard, .. }
            | Self::Lock { shard, .. }
            | Self::Unlock { shard, .. } => *shard,
        }
    }
}
