//! Ordered delivery of membership events to an [`EventDelegate`].
//!
//! A [`MembershipFeed`] owns a bounded channel. Producers (a gossip layer,
//! the daemon's boot-peer list, tests) send through a [`FeedSender`]; the
//! feed's [`run`](MembershipFeed::run) loop tracks the events in a
//! [`MemberView`] and hands every one of them to the delegate on the
//! blocking pool, waiting for it to finish before taking the next one.
//! Events that leave the member set unchanged are still delivered: the
//! delegate re-evaluates on each notification, which is how a failed lock
//! release gets retried.

use std::sync::Arc;

use skein_types::{MembershipEvent, NodeName};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::delegate::EventDelegate;
use crate::error::ClusterError;
use crate::view::MemberView;

/// Default queue depth.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Debug)]
enum FeedMessage {
    Event(MembershipEvent),
    Snapshot(Vec<NodeName>),
}

/// Producer side of a [`MembershipFeed`].
#[derive(Debug, Clone)]
pub struct FeedSender {
    tx: mpsc::Sender<FeedMessage>,
}

impl FeedSender {
    /// Queue a single event, waiting for space.
    pub async fn send(&self, event: MembershipEvent) -> Result<(), ClusterError> {
        self.tx
            .send(FeedMessage::Event(event))
            .await
            .map_err(|_| ClusterError::FeedClosed)
    }

    /// Queue a single event without waiting.
    pub fn try_send(&self, event: MembershipEvent) -> Result<(), ClusterError> {
        self.tx
            .try_send(FeedMessage::Event(event))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => ClusterError::FeedFull,
                mpsc::error::TrySendError::Closed(_) => ClusterError::FeedClosed,
            })
    }

    /// Queue a full member list. The feed diffs it against its view and
    /// delivers the resulting joins and leaves.
    pub async fn snapshot(&self, members: Vec<NodeName>) -> Result<(), ClusterError> {
        self.tx
            .send(FeedMessage::Snapshot(members))
            .await
            .map_err(|_| ClusterError::FeedClosed)
    }

    /// Queue `Join(node)`.
    pub async fn join(&self, node: impl Into<NodeName>) -> Result<(), ClusterError> {
        self.send(MembershipEvent::Join(node.into())).await
    }

    /// Queue `Leave(node)`.
    pub async fn leave(&self, node: impl Into<NodeName>) -> Result<(), ClusterError> {
        self.send(MembershipEvent::Leave(node.into())).await
    }
}

/// Bounded, ordered membership event feed.
#[derive(Debug)]
pub struct MembershipFeed {
    view: MemberView,
    tx: mpsc::Sender<FeedMessage>,
    rx: mpsc::Receiver<FeedMessage>,
}

impl MembershipFeed {
    /// Create a feed for `local` with room for `capacity` queued messages.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(local: NodeName, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            view: MemberView::new(local),
            tx,
            rx,
        }
    }

    /// A new producer handle.
    pub fn sender(&self) -> FeedSender {
        FeedSender {
            tx: self.tx.clone(),
        }
    }

    /// Deliver events to `delegate` until every [`FeedSender`] is dropped.
    ///
    /// Returns the final member view.
    pub async fn run<D: EventDelegate>(self, delegate: Arc<D>) -> MemberView {
        let Self {
            mut view,
            tx,
            mut rx,
        } = self;
        // Only external senders keep the loop alive.
        drop(tx);
        info!(local = %view.local(), "membership feed started");

        while let Some(message) = rx.recv().await {
            let events = match message {
                FeedMessage::Event(event) => {
                    if !view.apply(&event) {
                        debug!(%event, "member set unchanged, delivering for re-evaluation");
                    }
                    vec![event]
                }
                FeedMessage::Snapshot(members) => view.sync(members),
            };
            for event in events {
                dispatch(&delegate, event).await;
            }
        }

        info!(members = view.len(), "membership feed stopped: all senders dropped");
        view
    }
}

async fn dispatch<D: EventDelegate>(delegate: &Arc<D>, event: MembershipEvent) {
    let delegate = Arc::clone(delegate);
    let label = event.to_string();
    if let Err(e) = tokio::task::spawn_blocking(move || delegate.notify(&event)).await {
        error!(event = %label, error = %e, "membership delegate panicked");
    }
}
