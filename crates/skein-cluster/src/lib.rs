//! Membership seam between a cluster membership layer and the node core.
//!
//! The membership protocol itself lives outside this workspace. This crate
//! defines what the core consumes from it:
//!
//! - [`EventDelegate`]: the join/leave/update callback interface.
//! - [`MemberView`]: the locally believed member set, used to turn full
//!   member lists into events.
//! - [`MembershipFeed`]: an ordered async channel that calls a delegate on
//!   the blocking pool, one event at a time.

mod delegate;
mod error;
mod feed;
mod view;


pub use delegate::EventDelegate;
pub use error::ClusterError;
pub use feed::{DEFAULT_FEED_CAPACITY, FeedSender, MembershipFeed};
pub use view::MemberView;
