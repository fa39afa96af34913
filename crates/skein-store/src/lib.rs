//! Storage namespace abstraction and backends.
//!
//! This crate defines the [`Namespace`] trait (make-directory-recursive,
//! remove-recursive, rename, open-or-create) and the [`Resource`] handles it
//! returns, with [`AdvisoryLock`] as the locking capability. Backends:
//!
//! - [`FsNamespace`]: a directory on the local filesystem, with flock-style
//!   advisory locks where the platform provides them.
//! - [`MemoryNamespace`]: shared in-memory contents and lock table, for tests
//!   and for running several nodes in one process.
//! - [`FaultyNamespace`]: wraps another namespace and injects failures.

mod error;
mod faulty;
mod file_store;
mod memory_store;
mod path;
mod traits;

pub use error::StoreError;
pub use faulty::{FaultyNamespace, FaultyResource, Faults};
pub use file_store::{FileResource, FsNamespace};
pub use memory_store::{MemoryNamespace, MemoryResource};
pub use path::canonical_key;
pub use traits::{AdvisoryLock, Namespace, Resource};
