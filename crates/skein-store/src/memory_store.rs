//! In-memory namespace.
//!
//! Cloning a [`MemoryNamespace`] shares its contents, so several nodes in one
//! test process can open the same lock files and genuinely contend for them.

use std::collections::{BTreeSet, HashMap};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::StoreError;
use crate::path::{normalize, normalize_entry};
use crate::traits::{AdvisoryLock, Namespace, Resource};

type Contents = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Default)]
struct MemoryState {
    /// Normalized file path -> contents.
    files: HashMap<PathBuf, Contents>,
    /// Normalized directory paths. The root (empty path) is implicit.
    dirs: BTreeSet<PathBuf>,
    /// Normalized file path -> id of the handle holding its advisory lock.
    locks: HashMap<PathBuf, u64>,
    next_handle: u64,
}

impl MemoryState {
    fn dir_exists(&self, path: &Path) -> bool {
        path.as_os_str().is_empty() || self.dirs.contains(path)
    }
}

/// Namespace held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryNamespace {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryNamespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a file exists at `path`.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        let Ok(key) = normalize(path.as_ref()) else {
            return false;
        };
        let state = self.state.lock().expect("lock poisoned");
        state.files.contains_key(&key) || state.dir_exists(&key)
    }

    /// Whether some handle holds the advisory lock on `path`.
    pub fn is_locked(&self, path: impl AsRef<Path>) -> bool {
        let Ok(key) = normalize(path.as_ref()) else {
            return false;
        };
        self.state
            .lock()
            .expect("lock poisoned")
            .locks
            .contains_key(&key)
    }

    /// Number of files in the namespace.
    pub fn file_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").files.len()
    }
}

impl Namespace for MemoryNamespace {
    type Handle = MemoryResource;

    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
        let key = normalize(path)?;
        let mut state = self.state.lock().expect("lock poisoned");
        for ancestor in key.ancestors() {
            if state.files.contains_key(ancestor) {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("{} is a file", ancestor.display()),
                )));
            }
        }
        for ancestor in key.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                state.dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<(), StoreError> {
        let key = normalize_entry(path)?;
        let mut state = self.state.lock().expect("lock poisoned");
        state.files.retain(|p, _| !p.starts_with(&key));
        state.dirs.retain(|p| !p.starts_with(&key));
        // A new file at the same path is a different file, so it must not
        // inherit the old one's lock.
        state.locks.retain(|p, _| !p.starts_with(&key));
        debug!(path = %key.display(), "removed from memory namespace");
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), StoreError> {
        let src = normalize_entry(from)?;
        let dst = normalize_entry(to)?;
        let mut state = self.state.lock().expect("lock poisoned");

        if !state.files.contains_key(&src) && !state.dirs.contains(&src) {
            return Err(StoreError::NotFound(from.to_path_buf()));
        }
        if let Some(parent) = dst.parent()
            && !state.dir_exists(parent)
        {
            return Err(StoreError::NotFound(to.to_path_buf()));
        }

        let moved = |p: &Path| -> Option<PathBuf> {
            p.strip_prefix(&src).ok().map(|rest| {
                if rest.as_os_str().is_empty() {
                    dst.clone()
                } else {
                    dst.join(rest)
                }
            })
        };

        let files: Vec<(PathBuf, Contents)> = state.files.drain().collect();
        for (p, contents) in files {
            let target = moved(&p).unwrap_or(p);
            state.files.insert(target, contents);
        }
        let dirs: Vec<PathBuf> = std::mem::take(&mut state.dirs).into_iter().collect();
        for p in dirs {
            let target = moved(&p).unwrap_or(p);
            state.dirs.insert(target);
        }
        let locks: Vec<(PathBuf, u64)> = state.locks.drain().collect();
        for (p, holder) in locks {
            let target = moved(&p).unwrap_or(p);
            state.locks.insert(target, holder);
        }
        Ok(())
    }

    fn open(&self, path: &Path) -> Result<MemoryResource, StoreError> {
        let key = normalize_entry(path)?;
        let mut state = self.state.lock().expect("lock poisoned");

        if state.dirs.contains(&key) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::IsADirectory,
                format!("{} is a directory", key.display()),
            )));
        }
        let parent = key.parent().unwrap_or(Path::new(""));
        if !state.dir_exists(parent) {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let data = state.files.entry(key.clone()).or_default().clone();
        let id = state.next_handle;
        state.next_handle += 1;

        Ok(MemoryResource {
            id,
            path: path.to_path_buf(),
            key,
            data,
            cursor: Mutex::new(0),
            closed: AtomicBool::new(false),
            state: Arc::clone(&self.state),
        })
    }
}

/// An open resource in a [`MemoryNamespace`].
///
/// Advisory locks are tracked in the namespace, so two handles to the same
/// path exclude each other the way two flock'd descriptors do.
#[derive(Debug)]
pub struct MemoryResource {
    id: u64,
    path: PathBuf,
    key: PathBuf,
    data: Contents,
    cursor: Mutex<u64>,
    closed: AtomicBool,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryResource {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed(self.path.clone()));
        }
        Ok(())
    }

    fn release_lock(&self, state: &mut MemoryState) {
        if state.locks.get(&self.key) == Some(&self.id) {
            state.locks.remove(&self.key);
        }
    }
}

impl AdvisoryLock for MemoryResource {
    fn try_lock(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut state = self.state.lock().expect("lock poisoned");
        match state.locks.get(&self.key) {
            Some(holder) if *holder != self.id => Err(StoreError::LockContended(self.path.clone())),
            _ => {
                state.locks.insert(self.key.clone(), self.id);
                Ok(())
            }
        }
    }

    fn unlock(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut state = self.state.lock().expect("lock poisoned");
        self.release_lock(&mut state);
        Ok(())
    }
}

impl Resource for MemoryResource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let data = self.data.lock().expect("lock poisoned");
        let mut cursor = self.cursor.lock().expect("lock poisoned");
        let start = usize::try_from(*cursor).unwrap_or(usize::MAX).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        *cursor += n as u64;
        Ok(n)
    }

    fn write(&self, bytes: &[u8]) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let mut data = self.data.lock().expect("lock poisoned");
        let mut cursor = self.cursor.lock().expect("lock poisoned");
        let start = usize::try_from(*cursor)
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;
        let end = start + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        *cursor = end as u64;
        Ok(bytes.len())
    }

    fn seek(&self, pos: SeekFrom) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let len = self.data.lock().expect("lock poisoned").len() as i128;
        let mut cursor = self.cursor.lock().expect("lock poisoned");
        let next = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::End(delta) => len + delta as i128,
            SeekFrom::Current(delta) => *cursor as i128 + delta as i128,
        };
        let next = u64::try_from(next).map_err(|_| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start",
            ))
        })?;
        *cursor = next;
        Ok(next)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.ensure_open()
    }

    fn size(&self) -> Result<u64, StoreError> {
        self.ensure_open()?;
        Ok(self.data.lock().expect("lock poisoned").len() as u64)
    }

    fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut state = self.state.lock().expect("lock poisoned");
        self.release_lock(&mut state);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
