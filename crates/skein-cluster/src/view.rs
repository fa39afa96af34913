//! Locally believed member set.

use std::collections::BTreeSet;

use skein_types::{MembershipEvent, NodeName};

/// The set of members this node believes are live.
///
/// The local node is always a member. Events that would not change the set
/// (a join of a known member, a leave of an unknown one) report no change.
#[derive(Debug, Clone)]
pub struct MemberView {
    local: NodeName,
    members: BTreeSet<NodeName>,
}

impl MemberView {
    /// A view containing only `local`.
    pub fn new(local: NodeName) -> Self {
        let members = BTreeSet::from([local.clone()]);
        Self { local, members }
    }

    /// The local node.
    pub fn local(&self) -> &NodeName {
        &self.local
    }

    /// Apply `event`, returning whether the member set changed.
    ///
    /// `Leave` of the local node and `Update` never change the set.
    pub fn apply(&mut self, event: &MembershipEvent) -> bool {
        match event {
            MembershipEvent::Join(node) => self.members.insert(node.clone()),
            MembershipEvent::Leave(node) if *node == self.local => false,
            MembershipEvent::Leave(node) => self.members.remove(node),
            MembershipEvent::Update(_) => false,
        }
    }

    /// Replace the view with `snapshot` (plus the local node), returning the
    /// events that describe the change.
    ///
    /// Joins come before leaves so that a consumer applying them in order
    /// never sees fewer members than either end state.
    pub fn sync<I>(&mut self, snapshot: I) -> Vec<MembershipEvent>
    where
        I: IntoIterator<Item = NodeName>,
    {
        let mut target: BTreeSet<NodeName> = snapshot.into_iter().collect();
        target.insert(self.local.clone());

        let mut events: Vec<MembershipEvent> = target
            .difference(&self.members)
            .cloned()
            .map(MembershipEvent::Join)
            .collect();
        events.extend(
            self.members
                .difference(&target)
                .cloned()
                .map(MembershipEvent::Leave),
        );
        self.members = target;
        events
    }

    /// Whether `node` is in the view.
    pub fn contains(&self, node: &NodeName) -> bool {
        self.members.contains(node)
    }

    /// Members in name order.
    pub fn members(&self) -> impl Iterator<Item = &NodeName> {
        self.members.iter()
    }

    /// Number of members, including the local node.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false: the local node is a member.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
