//! Integration test: membership delivered through `MembershipFeed`.

use std::sync::Arc;

use skein_cluster::MembershipFeed;
use skein_integration_tests::{NUM_SHARDS, TestCluster, path_per_shard};
use skein_types::NodeName;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30000)]
async fn test_snapshots_drive_every_node() {
    let c = Arc::new(TestCluster::new(&["a", "b", "c"]));

    let mut senders = Vec::new();
    let mut tasks = Vec::new();
    for node in c.nodes() {
        let feed = MembershipFeed::new(node.name().clone(), 16);
        senders.push(feed.sender());
        tasks.push(tokio::spawn(feed.run(Arc::clone(node.reconciler()))));
    }

    let everyone: Vec<NodeName> = ["a", "b", "c"].into_iter().map(NodeName::from).collect();
    for tx in &senders {
        tx.snapshot(everyone.clone()).await.unwrap();
    }
    // "c" drops out of everyone's view.
    let survivors: Vec<NodeName> = ["a", "b"].into_iter().map(NodeName::from).collect();
    for tx in &senders[..2] {
        tx.snapshot(survivors.clone()).await.unwrap();
    }
    drop(senders);
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(c.node(0).assignment(), c.node(1).assignment());
    assert_eq!(c.node(0).members().len(), 2);
    assert_eq!(c.node(2).members().len(), 3);

    for path in path_per_shard(NUM_SHARDS) {
        let owner = c.node(0).owner_of(&path).unwrap().1;
        assert_ne!(owner.as_str(), "c");
        c.by_name(owner.as_str()).facade().open(&path).unwrap();
    }
    c.assert_exclusive_locks();
}
