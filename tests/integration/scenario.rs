//! Integration test: the two-node join/leave scenario.
//!
//! Node "A" boots alone with 8 shards and 2 replicas, "B" joins and later
//! leaves, and A's locks and cache follow ownership at every step.

use skein_engine::AccessError;
use skein_integration_tests::{NUM_SHARDS, TestCluster, path_per_shard};
use skein_store::Resource;
use skein_types::{NodeName, ShardIndex};

#[test]
fn test_join_then_leave_scenario() {
    let c = TestCluster::new(&["A", "B"]);
    let a = c.by_name("A");
    let paths = path_per_shard(NUM_SHARDS);

    // A alone owns every shard.
    assert_eq!(a.ring().point_count(), 2);
    for shard in ShardIndex::all(a.num_shards()) {
        assert_eq!(a.owner_of(&paths[shard.get() as usize]).unwrap().1.as_str(), "A");
    }
    let handles: Vec<_> = paths.iter().map(|p| a.facade().open(p).unwrap()).collect();
    assert_eq!(a.held_locks().len(), NUM_SHARDS as usize);

    // B joins: 4 ring points, and whatever moved to B is released and
    // evicted on A.
    let report = a.reconciler().join(&NodeName::from("B"));
    assert_eq!(a.ring().point_count(), 4);
    let assignment = a.assignment();
    let moved = assignment
        .get(&NodeName::from("B"))
        .cloned()
        .unwrap_or_default();
    assert_eq!(report.released, moved);
    for shard in ShardIndex::all(a.num_shards()) {
        let i = shard.get() as usize;
        let lock_file = format!("/.shards/{shard}");
        if moved.contains(&shard) {
            assert!(!a.held_locks().contains(&shard));
            assert!(!c.namespace().is_locked(&lock_file));
            assert!(!a.cache().contains(&paths[i]));
            assert!(handles[i].is_closed());
            assert!(matches!(
                a.facade().open(&paths[i]),
                Err(AccessError::WrongNode { .. })
            ));
        } else {
            assert!(a.held_locks().contains(&shard));
            assert!(a.cache().contains(&paths[i]));
        }
    }

    // B leaves: everything is A's again and the moved paths open.
    a.reconciler().leave(&NodeName::from("B"));
    assert_eq!(a.ring().point_count(), 2);
    assert_eq!(a.owned_shards().len(), NUM_SHARDS as usize);
    for shard in &moved {
        let handle = a.facade().open(&paths[shard.get() as usize]).unwrap();
        assert!(!handle.is_closed());
    }
    assert!(a.facade().open("/x").is_ok());
}

#[test]
fn test_moved_shards_become_available_to_new_owner() {
    let c = TestCluster::new(&["a", "b"]);
    let paths = path_per_shard(NUM_SHARDS);
    let a = c.by_name("a");
    let b = c.by_name("b");

    for p in &paths {
        a.facade().open(p).unwrap();
    }
    c.connect_all();
    c.assert_reconciled();

    for p in &paths {
        let (_, owner) = a.owner_of(p).unwrap();
        let node = c.by_name(owner.as_str());
        let handle = node.facade().open(p).unwrap();
        assert!(!handle.is_closed());
    }
    c.assert_exclusive_locks();
    assert!(!a.held_locks().is_empty());
    assert!(!b.held_locks().is_empty());
}

#[test]
fn test_round_trip_keeps_data() {
    let c = TestCluster::new(&["a"]);
    let a = c.node(0);

    let first = a.facade().open("/journal").unwrap();
    first.write_all(b"entry-1").unwrap();
    a.facade().close("/journal").unwrap();

    let second = a.facade().open("/journal").unwrap();
    assert!(!std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(second.read_all().unwrap(), b"entry-1");
}
