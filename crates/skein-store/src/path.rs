//! Logical path normalization shared by every backend.

use std::path::{Component, Path, PathBuf};

use crate::error::StoreError;

/// Normalize a logical namespace path into a relative path.
///
/// Leading `/` and `.` components are dropped, so `/a/b`, `a/b` and
/// `./a//b` all name the same entry. `..` and platform prefixes are
/// rejected. The empty result denotes the namespace root.
pub(crate) fn normalize(path: &Path) -> Result<PathBuf, StoreError> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(part) => out.push(part),
            Component::ParentDir | Component::Prefix(_) => {
                return Err(StoreError::InvalidPath(path.to_path_buf()));
            }
        }
    }
    Ok(out)
}

/// Like [`normalize`], but rejects the namespace root itself.
pub(crate) fn normalize_entry(path: &Path) -> Result<PathBuf, StoreError> {
    let out = normalize(path)?;
    if out.as_os_str().is_empty() {
        return Err(StoreError::InvalidPath(path.to_path_buf()));
    }
    Ok(out)
}

/// Canonical spelling of a logical path: `/` followed by the normalized
/// components joined with `/`.
///
/// Every spelling of the same entry (`a/b`, `/a/b`, `./a//b`) has the same
/// canonical key, so keys can be hashed and cached without aliasing.
pub fn canonical_key(path: &str) -> Result<String, StoreError> {
    let normalized = normalize_entry(Path::new(path))?;
    let mut key = String::with_capacity(path.len() + 1);
    for part in normalized.iter() {
        key.push('/');
        key.push_str(&part.to_string_lossy());
    }
    Ok(key)
}
