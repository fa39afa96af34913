//! Per-request entry point: ownership check, shard lock, cache.

use std::path::Path;
use std::sync::Arc;

use skein_store::{Namespace, Resource, StoreError, canonical_key};
use skein_types::ShardIndex;
use tracing::{debug, warn};

use crate::cache::ResourceCache;
use crate::coordinator::{Coordinator, Placement};
use crate::error::AccessError;

/// Serves `open`, `close` and `remove` for paths this node owns.
///
/// Every operation runs under the coordination lock: it maps the path to a
/// shard, rejects it with [`AccessError::WrongNode`] if the ring assigns the
/// shard elsewhere, takes the shard lock, and only then touches the cache or
/// the namespace.
///
/// Paths are canonicalized first, so `a/b`, `/a/b` and `./a//b` name the
/// same resource, land on the same shard and share one cache entry. Paths
/// inside the lock directory are rejected.
#[derive(Debug)]
pub struct AccessFacade<N: Namespace> {
    coordinator: Arc<Coordinator<N>>,
    cache: Arc<ResourceCache<N::Handle>>,
    namespace: Arc<N>,
}

impl<N: Namespace> AccessFacade<N> {
    /// Create a facade over shared node state.
    pub fn new(
        coordinator: Arc<Coordinator<N>>,
        cache: Arc<ResourceCache<N::Handle>>,
        namespace: Arc<N>,
    ) -> Self {
        Self {
            coordinator,
            cache,
            namespace,
        }
    }

    /// Open `path` for reading and writing, creating it and any missing
    /// parent directories if absent.
    ///
    /// Returns the cached handle if the path is already open.
    pub fn open(&self, path: &str) -> Result<Arc<N::Handle>, AccessError> {
        let key = canonical_key(path)?;
        let mut placement = self.coordinator.lock();
        let shard = claim(&mut placement, &key)?;

        if let Some(handle) = self.cache.get(&key) {
            if !handle.is_closed() {
                return Ok(handle);
            }
            // Closed behind the cache's back; open a fresh one.
            self.cache.remove(&key);
        }

        let logical = Path::new(&key);
        if let Some(parent) = logical.parent() {
            self.namespace.create_dir_all(parent)?;
        }
        let handle = Arc::new(self.namespace.open(logical)?);
        self.cache.insert(key.clone(), Arc::clone(&handle));
        debug!(path = %key, %shard, "opened");
        Ok(handle)
    }

    /// Close `path` and drop it from the cache. Closing a path that is not
    /// open succeeds.
    ///
    /// Fails only with [`AccessError::WrongNode`] or
    /// [`AccessError::ShardLocked`]. A path that cannot be canonicalized, or
    /// one inside the lock directory, can never have been opened and is
    /// treated as not open.
    pub fn close(&self, path: &str) -> Result<(), AccessError> {
        let Ok(key) = canonical_key(path) else {
            debug!(path, "close of unusable path, nothing cached");
            return Ok(());
        };
        let mut placement = self.coordinator.lock();
        if is_reserved(&placement, &key) {
            return Ok(());
        }
        let shard = claim(&mut placement, &key)?;
        self.evict(&key, shard);
        Ok(())
    }

    /// Close `path` like [`close`](Self::close), then delete it and
    /// everything under it.
    pub fn remove(&self, path: &str) -> Result<(), AccessError> {
        let key = canonical_key(path)?;
        let mut placement = self.coordinator.lock();
        let shard = claim(&mut placement, &key)?;
        self.evict(&key, shard);
        self.namespace
            .remove_all(Path::new(&key))
            .map_err(|source| AccessError::RemoveFailed {
                path: key.clone(),
                source,
            })?;
        debug!(path = %key, %shard, "removed");
        Ok(())
    }

    fn evict(&self, key: &str, shard: ShardIndex) {
        if let Some(handle) = self.cache.remove(key) {
            if let Err(e) = handle.close() {
                warn!(path = %key, %shard, error = %e, "failed to close handle");
            }
            debug!(path = %key, %shard, "closed");
        }
    }
}

/// Whether `key` lies inside the shard lock directory.
fn is_reserved<N: Namespace>(placement: &Placement<N>, key: &str) -> bool {
    let lock_dir = placement.sharder.lock_dir();
    canonical_key(&lock_dir.to_string_lossy()).is_ok_and(|dir| Path::new(key).starts_with(dir))
}

/// Check that this node owns the shard of `key` and hold its lock.
fn claim<N: Namespace>(placement: &mut Placement<N>, key: &str) -> Result<ShardIndex, AccessError> {
    if is_reserved(placement, key) {
        return Err(StoreError::InvalidPath(key.into()).into());
    }

    let (shard, owner) = placement.owner_of(key);
    if *owner != *placement.ring.local_node() {
        return Err(AccessError::WrongNode {
            path: key.to_string(),
            shard,
            owner: owner.clone(),
        });
    }

    placement
        .sharder
        .acquire(shard)
        .map_err(|source| AccessError::ShardLocked { shard, source })?;
    Ok(shard)
}
