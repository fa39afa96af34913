//! Integration test: ownership converges after membership changes.

use skein_engine::AccessError;
use skein_integration_tests::{NUM_SHARDS, TestCluster, path_per_shard};
use skein_types::NodeName;

/// Every node computes the same assignment once connected.
#[test]
fn test_connected_nodes_agree_on_assignment() {
    let c = TestCluster::new(&["a", "b", "c"]);
    c.connect_all();

    let expected = c.node(0).assignment();
    assert_eq!(expected.len(), 3);
    for node in c.nodes() {
        assert_eq!(node.assignment(), expected, "{} disagrees", node.name());
        assert_eq!(node.members().len(), 3);
    }
    let total: usize = expected.values().map(Vec::len).sum();
    assert_eq!(total, NUM_SHARDS as usize);
}

/// Every path is served by exactly one node.
#[test]
fn test_each_path_served_by_exactly_one_node() {
    let c = TestCluster::new(&["a", "b", "c"]);
    c.connect_all();

    for path in path_per_shard(NUM_SHARDS) {
        let mut served = 0;
        for node in c.nodes() {
            match node.facade().open(&path) {
                Ok(_) => served += 1,
                Err(AccessError::WrongNode { owner, .. }) => {
                    assert_ne!(&owner, node.name());
                }
                Err(e) => panic!("{} failed on {path}: {e}", node.name()),
            }
        }
        assert_eq!(served, 1, "{path} served by {served} nodes");
    }
    c.assert_exclusive_locks();
    c.assert_reconciled();
}

/// After the only other member leaves, its shards come back with no stale
/// `WrongNode`.
#[test]
fn test_leave_of_sole_peer_returns_all_shards() {
    let c = TestCluster::new(&["a", "b"]);
    c.connect_all();
    let a = c.by_name("a");
    let paths = path_per_shard(NUM_SHARDS);

    let b_shards = a
        .assignment()
        .get(&NodeName::from("b"))
        .cloned()
        .unwrap_or_default();
    assert!(!b_shards.is_empty());
    for shard in &b_shards {
        c.by_name("b")
            .facade()
            .open(&paths[shard.get() as usize])
            .unwrap();
    }

    c.depart("b");
    assert_eq!(a.owned_shards().len(), NUM_SHARDS as usize);
    for shard in &b_shards {
        a.facade().open(&paths[shard.get() as usize]).unwrap();
    }
    c.assert_reconciled();
}

/// A departed node's locks do not linger when it shuts down cleanly, so the
/// survivors can take over every shard.
#[test]
fn test_three_nodes_one_departs() {
    let c = TestCluster::new(&["a", "b", "c"]);
    c.connect_all();
    let paths = path_per_shard(NUM_SHARDS);
    for path in &paths {
        for node in c.nodes() {
            let _ = node.facade().open(path);
        }
    }
    c.assert_exclusive_locks();

    c.depart("c");
    for path in &paths {
        let owner = c.by_name("a").owner_of(path).unwrap().1;
        assert_ne!(owner.as_str(), "c");
        c.by_name(owner.as_str()).facade().open(path).unwrap();
    }
    c.assert_exclusive_locks();
    c.assert_reconciled();
}
