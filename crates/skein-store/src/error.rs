//! Error types for namespace and resource operations.

use std::path::PathBuf;

/// Errors that can occur during namespace or resource operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The path does not exist in the namespace.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The path escapes the namespace root or names the root itself where
    /// a file is required.
    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Another handle holds the advisory lock.
    #[error("lock contended: {}", .0.display())]
    LockContended(PathBuf),

    /// The handle was already closed.
    #[error("handle closed: {}", .0.display())]
    Closed(PathBuf),

    /// A failure injected by [`FaultyNamespace`](crate::FaultyNamespace).
    #[error("injected fault: {0}")]
    Injected(&'static str),
}
