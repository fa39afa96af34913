//! Callback interface invoked on membership changes.

use skein_types::{MembershipEvent, NodeName};

/// Receives membership notifications.
///
/// Implementations may block: the feed calls them on the blocking pool, one
/// event at a time and in delivery order.
pub trait EventDelegate: Send + Sync + 'static {
    /// `node` joined the cluster.
    fn notify_join(&self, node: &NodeName);

    /// `node` left the cluster or was declared dead.
    fn notify_leave(&self, node: &NodeName);

    /// `node` changed metadata only.
    fn notify_update(&self, node: &NodeName);

    /// Route `event` to the matching `notify_*` method.
    fn notify(&self, event: &MembershipEvent) {
        match event {
            MembershipEvent::Join(node) => self.notify_join(node),
            MembershipEvent::Leave(node) => self.notify_leave(node),
            MembershipEvent::Update(node) => self.notify_update(node),
        }
    }
}
