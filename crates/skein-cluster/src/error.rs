//! Error types for the cluster crate.

/// Errors produced when feeding membership events.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The feed's dispatch loop has stopped.
    #[error("membership feed closed")]
    FeedClosed,

    /// The feed's queue is full.
    #[error("membership feed full")]
    FeedFull,
}
