//! Filesystem-backed namespace.
//!
//! Every logical path maps to `{root}/{path}`. Directories are created with
//! mode `0755` and files with mode `0644` on Unix.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::error::StoreError;
use crate::path::{normalize, normalize_entry};
use crate::traits::{AdvisoryLock, Namespace, Resource};

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Namespace rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsNamespace {
    root: PathBuf,
}

impl FsNamespace {
    /// Create a namespace rooted at `root`.
    ///
    /// The directory is created if it does not exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The root directory on disk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Physical location of a logical path.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(normalize(path)?))
    }

    fn resolve_entry(&self, path: &Path) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(normalize_entry(path)?))
    }
}

impl Namespace for FsNamespace {
    type Handle = FileResource;

    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
        create_dir_all(&self.resolve(path)?)?;
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<(), StoreError> {
        let target = self.resolve_entry(path)?;
        let result = match fs::symlink_metadata(&target) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&target),
            Ok(_) => fs::remove_file(&target),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                debug!(path = %target.display(), "removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), StoreError> {
        let src = self.resolve_entry(from)?;
        let dst = self.resolve_entry(to)?;
        match fs::rename(&src, &dst) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(from.to_path_buf()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn open(&self, path: &Path) -> Result<FileResource, StoreError> {
        let target = self.resolve_entry(path)?;
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }
        let file = match options.open(&target) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(FileResource {
            path: path.to_path_buf(),
            file: RwLock::new(Some(file)),
        })
    }
}

fn create_dir_all(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path)
}

/// An open file in an [`FsNamespace`].
#[derive(Debug)]
pub struct FileResource {
    path: PathBuf,
    /// `None` once closed. Reads and writes go through `&File`, so they only
    /// need the shared side of the lock.
    file: RwLock<Option<File>>,
}

impl FileResource {
    fn with_file<T>(&self, f: impl FnOnce(&File) -> io::Result<T>) -> Result<T, StoreError> {
        let guard = self.file.read().expect("lock poisoned");
        let file = guard
            .as_ref()
            .ok_or_else(|| StoreError::Closed(self.path.clone()))?;
        Ok(f(file)?)
    }
}

#[cfg(any(unix, windows))]
impl AdvisoryLock for FileResource {
    fn try_lock(&self) -> Result<(), StoreError> {
        let guard = self.file.read().expect("lock poisoned");
        let file = guard
            .as_ref()
            .ok_or_else(|| StoreError::Closed(self.path.clone()))?;
        match fs4::FileExt::try_lock_exclusive(file) {
            Ok(()) => Ok(()),
            Err(e) if is_contended(&e) => Err(StoreError::LockContended(self.path.clone())),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn unlock(&self) -> Result<(), StoreError> {
        self.with_file(<File as fs4::FileExt>::unlock)
    }
}

#[cfg(not(any(unix, windows)))]
impl AdvisoryLock for FileResource {
    fn try_lock(&self) -> Result<(), StoreError> {
        self.with_file(|_| Ok(()))?;
        tracing::warn!(
            path = %self.path.display(),
            "advisory locks unsupported on this platform, lock is local only"
        );
        Ok(())
    }

    fn unlock(&self) -> Result<(), StoreError> {
        self.with_file(|_| Ok(()))
    }
}

#[cfg(any(unix, windows))]
fn is_contended(e: &io::Error) -> bool {
    // ERROR_LOCK_VIOLATION
    const WINDOWS_LOCK_VIOLATION: i32 = 33;
    e.kind() == io::ErrorKind::WouldBlock
        || (cfg!(windows) && e.raw_os_error() == Some(WINDOWS_LOCK_VIOLATION))
}

impl Resource for FileResource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, StoreError> {
        self.with_file(|mut f| f.read(buf))
    }

    fn write(&self, data: &[u8]) -> Result<usize, StoreError> {
        self.with_file(|mut f| f.write(data))
    }

    fn seek(&self, pos: SeekFrom) -> Result<u64, StoreError> {
        self.with_file(|mut f| f.seek(pos))
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.with_file(File::sync_all)
    }

    fn size(&self) -> Result<u64, StoreError> {
        self.with_file(|f| f.metadata().map(|m| m.len()))
    }

    fn close(&self) -> Result<(), StoreError> {
        let file = self.file.write().expect("lock poisoned").take();
        if let Some(file) = file {
            // Dropping the descriptor also drops any flock it holds.
            drop(file);
            debug!(path = %self.path.display(), "closed file");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.file.read().expect("lock poisoned").is_none()
    }
}
