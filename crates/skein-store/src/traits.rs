//! Core traits for namespaces and the resource handles they open.

use std::fmt;
use std::io::SeekFrom;
use std::path::Path;

use crate::error::StoreError;

/// Best-effort, non-blocking, exclusive advisory lock on a resource.
///
/// Where the host platform supports it (flock on Unix, `LockFileEx` on
/// Windows) the lock excludes other processes that also check it. On other
/// platforms the file backend treats it as a local no-op marker, so callers
/// must not rely on cross-process exclusion there.
pub trait AdvisoryLock {
    /// Take the lock without waiting.
    ///
    /// Returns [`StoreError::LockContended`] if another handle holds it.
    /// Locking a handle that already holds the lock succeeds.
    fn try_lock(&self) -> Result<(), StoreError>;

    /// Release the lock. Unlocking a handle that holds no lock succeeds.
    fn unlock(&self) -> Result<(), StoreError>;
}

/// An open resource handle.
///
/// All operations take `&self` so a handle can be shared behind an `Arc`
/// between the resource cache and its callers. Reads and writes share one
/// cursor per handle.
pub trait Resource: AdvisoryLock + fmt::Debug + Send + Sync {
    /// Logical path this handle was opened with.
    fn path(&self) -> &Path;

    /// Read into `buf` at the cursor, returning the number of bytes read.
    fn read(&self, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Write `data` at the cursor, returning the number of bytes written.
    fn write(&self, data: &[u8]) -> Result<usize, StoreError>;

    /// Move the cursor.
    fn seek(&self, pos: SeekFrom) -> Result<u64, StoreError>;

    /// Flush written data to durable storage.
    fn flush(&self) -> Result<(), StoreError>;

    /// Current size in bytes.
    fn size(&self) -> Result<u64, StoreError>;

    /// Close the handle, releasing any advisory lock it holds.
    ///
    /// Closing twice is a no-op. Every other operation on a closed handle
    /// fails with [`StoreError::Closed`].
    fn close(&self) -> Result<(), StoreError>;

    /// Whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;

    /// Write all of `data` at the cursor.
    fn write_all(&self, mut data: &[u8]) -> Result<(), StoreError> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                return Err(StoreError::Io(std::io::ErrorKind::WriteZero.into()));
            }
            data = &data[n..];
        }
        Ok(())
    }

    /// Read the whole resource from the start.
    fn read_all(&self) -> Result<Vec<u8>, StoreError> {
        self.seek(SeekFrom::Start(0))?;
        let mut out = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }
}

/// A hierarchical namespace of resources.
///
/// Paths are logical: they are interpreted relative to the namespace root,
/// leading `/` is ignored and `..` components are rejected.
pub trait Namespace: Send + Sync {
    /// The handle type returned by [`open`](Self::open).
    type Handle: Resource;

    /// Create a directory and all missing parents. Existing directories are fine.
    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError>;

    /// Remove a file or a directory tree. A missing path is not an error.
    fn remove_all(&self, path: &Path) -> Result<(), StoreError>;

    /// Rename a file or directory, replacing a file at `to`.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), StoreError>;

    /// Open a resource for reading and writing, creating it if absent.
    ///
    /// The parent directory must exist.
    fn open(&self, path: &Path) -> Result<Self::Handle, StoreError>;
}
