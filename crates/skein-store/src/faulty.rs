//! A [`Namespace`] wrapper that injects failures on demand.
//!
//! `FaultyNamespace` wraps any namespace and fails selected operations while
//! the matching switch in [`Faults`] is on. The switches are shared, so a
//! test can flip them after the namespace has been handed to a node.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use skein_store::{FaultyNamespace, MemoryNamespace, Namespace};
//!
//! let ns = FaultyNamespace::new(MemoryNamespace::new());
//! ns.faults().fail_remove(true);
//! assert!(ns.remove_all(Path::new("/x")).is_err());
//! ```

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::StoreError;
use crate::traits::{AdvisoryLock, Namespace, Resource};

/// Shared failure switches.
#[derive(Debug, Default)]
pub struct Faults {
    open: AtomicBool,
    remove: AtomicBool,
    unlock: AtomicBool,
}

impl Faults {
    /// Fail every [`Namespace::open`].
    pub fn fail_open(&self, on: bool) {
        self.open.store(on, Ordering::SeqCst);
    }

    /// Fail every [`Namespace::remove_all`].
    pub fn fail_remove(&self, on: bool) {
        self.remove.store(on, Ordering::SeqCst);
    }

    /// Fail every [`AdvisoryLock::unlock`] on handles from this namespace.
    pub fn fail_unlock(&self, on: bool) {
        self.unlock.store(on, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &'static str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Injected(what));
        }
        Ok(())
    }
}

/// Namespace wrapper with switchable failures.
#[derive(Debug, Clone)]
pub struct FaultyNamespace<N> {
    inner: N,
    faults: Arc<Faults>,
}

impl<N: Namespace> FaultyNamespace<N> {
    /// Wrap `inner` with every fault switched off.
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::default()),
        }
    }

    /// The failure switches.
    pub fn faults(&self) -> &Arc<Faults> {
        &self.faults
    }

    /// The wrapped namespace.
    pub fn inner(&self) -> &N {
        &self.inner
    }
}

impl<N: Namespace> Namespace for FaultyNamespace<N> {
    type Handle = FaultyResource<N::Handle>;

    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
        self.inner.create_dir_all(path)
    }

    fn remove_all(&self, path: &Path) -> Result<(), StoreError> {
        Faults::check(&self.faults.remove, "remove")?;
        self.inner.remove_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), StoreError> {
        self.inner.rename(from, to)
    }

    fn open(&self, path: &Path) -> Result<Self::Handle, StoreError> {
        Faults::check(&self.faults.open, "open")?;
        Ok(FaultyResource {
            inner: self.inner.open(path)?,
            faults: Arc::clone(&self.faults),
        })
    }
}

/// Handle opened through a [`FaultyNamespace`].
#[derive(Debug)]
pub struct FaultyResource<H> {
    inner: H,
    faults: Arc<Faults>,
}

impl<H: Resource> AdvisoryLock for FaultyResource<H> {
    fn try_lock(&self) -> Result<(), StoreError> {
        self.inner.try_lock()
    }

    fn unlock(&self) -> Result<(), StoreError> {
        Faults::check(&self.faults.unlock, "unlock")?;
        self.inner.unlock()
    }
}

impl<H: Resource> Resource for FaultyResource<H> {
    fn path(&self) -> &Path {
        self.inner.path()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, StoreError> {
        self.inner.read(buf)
    }

    fn write(&self, data: &[u8]) -> Result<usize, StoreError> {
        self.inner.write(data)
    }

    fn seek(&self, pos: SeekFrom) -> Result<u64, StoreError> {
        self.inner.seek(pos)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.inner.flush()
    }

    fn size(&self) -> Result<u64, StoreError> {
        self.inner.size()
    }

    fn close(&self) -> Result<(), StoreError> {
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
