//! Node core for skein.
//!
//! A [`SkeinNode`] owns the consistent-hash ring, the shard locks held by
//! this process and a cache of open resource handles, and keeps them in
//! agreement:
//!
//! - [`AccessFacade`] serves open/close/remove for paths whose shard the
//!   ring assigns to this node.
//! - [`MembershipReconciler`] applies join/leave events to the ring, then
//!   releases locks and evicts handles for shards that moved away.
//! - [`Coordinator`] is the single lock both of them run under.

pub mod cache;
pub mod coordinator;
pub mod error;
pub mod facade;
pub mod node;
pub mod reconciler;

pub use cache::ResourceCache;
pub use coordinator::{Coordinator, Placement};
pub use error::AccessError;
pub use facade::AccessFacade;
pub use node::{ShutdownReport, SkeinNode, SkeinNodeConfig};
pub use reconciler::{MembershipReconciler, ReconcileReport};

#[cfg(test)]
mod tests;
