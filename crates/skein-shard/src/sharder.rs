//! Per-shard advisory lock ownership for the local node.

use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroU16;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use skein_store::{AdvisoryLock, Namespace, Resource, StoreError};
use skein_types::{LOCK_DIR, ShardIndex};
use tracing::{debug, warn};

use crate::error::LockError;
use crate::shard_map::ShardMap;

/// Holds the shard locks owned by this node.
///
/// Each shard has a lock file at `{base}/.shards/{n}` inside the namespace.
/// Holding a shard means holding an open handle on its lock file with the
/// advisory lock taken. The handle stays cached until [`release`] so the
/// lock outlives the call that took it.
///
/// A `Sharder` is not internally synchronized; the coordinator serializes
/// access to it.
///
/// [`release`]: Sharder::release
#[derive(Debug)]
pub struct Sharder<N: Namespace> {
    map: ShardMap,
    base: PathBuf,
    namespace: Arc<N>,
    locks: HashMap<ShardIndex, N::Handle>,
}

impl<N: Namespace> Sharder<N> {
    /// Create a sharder with no locks held.
    pub fn new(map: ShardMap, namespace: Arc<N>, base: impl Into<PathBuf>) -> Self {
        Self {
            map,
            base: base.into(),
            namespace,
            locks: HashMap::new(),
        }
    }

    /// Configured shard count.
    pub fn num_shards(&self) -> NonZeroU16 {
        self.map.num_shards()
    }

    /// The key-to-shard mapping.
    pub fn shard_map(&self) -> ShardMap {
        self.map
    }

    /// Shard owning `key`.
    pub fn shard_of(&self, key: &str) -> ShardIndex {
        self.map.shard_of(key)
    }

    /// Base directory the lock directory lives under.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory holding every lock file: `{base}/.shards`.
    pub fn lock_dir(&self) -> PathBuf {
        self.base.join(LOCK_DIR)
    }

    /// Location of the lock file for `shard`.
    pub fn lock_path(&self, shard: ShardIndex) -> PathBuf {
        self.lock_dir().join(shard.to_string())
    }

    /// Take the lock for `shard`.
    ///
    /// Succeeds immediately if this node already holds it. On any failure
    /// nothing is cached and any handle opened along the way is closed.
    pub fn acquire(&mut self, shard: ShardIndex) -> Result<(), LockError> {
        self.check_range(shard)?;
        if self.locks.contains_key(&shard) {
            return Ok(());
        }

        let path = self.lock_path(shard);
        if let Some(parent) = path.parent() {
            self.namespace
                .create_dir_all(parent)
                .map_err(|source| LockError::Prepare { shard, source })?;
        }
        let handle = self
            .namespace
            .open(&path)
            .map_err(|source| LockError::Open { shard, source })?;

        if let Err(e) = handle.try_lock() {
            if let Err(close_err) = handle.close() {
                warn!(%shard, error = %close_err, "failed to close lock file after failed lock");
            }
            return Err(match e {
                StoreError::LockContended(_) => LockError::Contended { shard, path },
                source => LockError::Lock { shard, source },
            });
        }

        debug!(%shard, path = %path.display(), "acquired shard lock");
        self.locks.insert(shard, handle);
        Ok(())
    }

    /// Give up the lock for `shard`.
    ///
    /// A no-op if the lock is not held. If unlocking fails the handle stays
    /// cached and the lock is still considered held.
    pub fn release(&mut self, shard: ShardIndex) -> Result<(), LockError> {
        self.check_range(shard)?;
        let Some(handle) = self.locks.get(&shard) else {
            return Ok(());
        };
        handle
            .unlock()
            .map_err(|source| LockError::Unlock { shard, source })?;

        if let Some(handle) = self.locks.remove(&shard) {
            if let Err(e) = handle.close() {
                warn!(%shard, error = %e, "failed to close released lock file");
            }
        }
        debug!(%shard, "released shard lock");
        Ok(())
    }

    /// Release every held lock, returning the failures.
    ///
    /// Locks that fail to unlock stay held.
    pub fn release_all(&mut self) -> Vec<LockError> {
        self.held()
            .into_iter()
            .filter_map(|shard| self.release(shard).err())
            .collect()
    }

    /// Whether this node holds the lock for `shard`.
    pub fn is_held(&self, shard: ShardIndex) -> bool {
        self.locks.contains_key(&shard)
    }

    /// Shards whose locks are held, in order.
    pub fn held(&self) -> BTreeSet<ShardIndex> {
        self.locks.keys().copied().collect()
    }

    fn check_range(&self, shard: ShardIndex) -> Result<(), LockError> {
        if self.map.contains(shard) {
            Ok(())
        } else {
            Err(LockError::OutOfRange {
                shard,
                num_shards: self.map.num_shards().get(),
            })
        }
    }
}
