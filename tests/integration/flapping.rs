//! Integration test: rapid join/leave churn.
//!
//! Every event triggers a full reconciliation; there is no debouncing.
//! These tests check that churn never leaves a node holding foreign locks
//! or serving foreign paths.

use std::sync::Arc;

use skein_engine::AccessError;
use skein_integration_tests::{NUM_SHARDS, TestCluster, path_per_shard};
use skein_types::NodeName;

#[test]
fn test_flapping_peer_settles() {
    let c = TestCluster::new(&["a", "b"]);
    let a = c.by_name("a");
    let paths = path_per_shard(NUM_SHARDS);
    let b = NodeName::from("b");

    for round in 0..20 {
        for p in &paths {
            let _ = a.facade().open(p);
        }
        if round % 2 == 0 {
            a.reconciler().join(&b);
        } else {
            a.reconciler().leave(&b);
        }
        c.assert_reconciled();
    }

    // 20 rounds end on a leave: a owns and can serve everything again.
    assert_eq!(a.members(), vec![NodeName::from("a")]);
    for p in &paths {
        a.facade().open(p).unwrap();
    }
    assert_eq!(a.held_locks().len(), NUM_SHARDS as usize);
}

#[test]
fn test_churn_under_concurrent_requests() {
    let c = Arc::new(TestCluster::new(&["a", "b", "c"]));
    let paths = path_per_shard(NUM_SHARDS);

    std::thread::scope(|s| {
        let churn = {
            let c = Arc::clone(&c);
            s.spawn(move || {
                for i in 0..30 {
                    let peer = if i % 2 == 0 { "b" } else { "c" };
                    c.node(0).reconciler().join(&NodeName::from(peer));
                    c.node(0).reconciler().leave(&NodeName::from(peer));
                }
            })
        };
        for _ in 0..3 {
            let c = Arc::clone(&c);
            let paths = &paths;
            s.spawn(move || {
                for p in paths.iter().cycle().take(300) {
                    match c.node(0).facade().open(p) {
                        Ok(_) | Err(AccessError::WrongNode { .. }) => {}
                        Err(e) => panic!("unexpected error on {p}: {e}"),
                    }
                }
            });
        }
        churn.join().unwrap();
    });

    c.assert_reconciled();
    assert_eq!(c.node(0).members().len(), 1);
}
