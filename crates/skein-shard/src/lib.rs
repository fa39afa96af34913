//! Sharding for skein.
//!
//! [`ShardMap`] assigns every key to one of a fixed number of shards, and
//! [`Sharder`] takes and releases the advisory lock that marks a shard as
//! owned by this node.

mod error;
mod shard_map;
mod sharder;

pub use error::LockError;
pub use shard_map::ShardMap;
pub use sharder::Sharder;
