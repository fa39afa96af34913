//! Integration test: shard locks exclude other nodes.

use std::sync::Arc;

use skein_engine::AccessError;
use skein_integration_tests::{NUM_REPLICAS, NUM_SHARDS, TestCluster, path_per_shard};
use skein_shard::LockError;
use skein_store::FsNamespace;
use tempfile::TempDir;

/// Two nodes that have not heard of each other both believe they own every
/// shard; the lock makes sure only one of them serves it.
#[test]
fn test_split_brain_is_fenced_by_locks() {
    let c = TestCluster::new(&["a", "b"]);
    let paths = path_per_shard(NUM_SHARDS);
    for p in &paths {
        c.node(0).facade().open(p).unwrap();
    }
    for p in &paths {
        let err = c.node(1).facade().open(p).unwrap_err();
        assert!(
            matches!(
                err,
                AccessError::ShardLocked {
                    source: LockError::Contended { .. },
                    ..
                }
            ),
            "{err}"
        );
    }
    c.assert_exclusive_locks();
    assert!(c.node(1).cache().is_empty());
}

/// Same as above on a real directory, where the locks are flock-style file
/// locks on `<root>/.shards/<n>`.
#[test]
fn test_lock_files_on_disk() {
    let dir = TempDir::new().unwrap();
    let ns = Arc::new(FsNamespace::new(dir.path()).unwrap());
    let c = TestCluster::with_namespace(&["a", "b"], ns, NUM_SHARDS, NUM_REPLICAS);
    let paths = path_per_shard(NUM_SHARDS);

    for p in &paths {
        c.node(0).facade().open(p).unwrap();
    }
    for shard in 0..NUM_SHARDS {
        assert!(dir.path().join(".shards").join(shard.to_string()).is_file());
    }
    assert!(matches!(
        c.node(1).facade().open(&paths[0]),
        Err(AccessError::ShardLocked { .. })
    ));

    // Once the nodes know about each other, a releases what moved to b
    // and b can take it.
    c.connect_all();
    for p in &paths {
        let owner = c.node(0).owner_of(p).unwrap().1;
        c.by_name(owner.as_str()).facade().open(p).unwrap();
    }
    c.assert_exclusive_locks();
    c.assert_reconciled();
}

/// Closing or removing a path keeps the shard lock: ownership, not use,
/// decides who holds it.
#[test]
fn test_close_and_remove_keep_shard_lock() {
    let c = TestCluster::new(&["a", "b"]);
    let a = c.node(0);
    let (shard, _) = a.owner_of("/kept").unwrap();

    a.facade().open("/kept").unwrap();
    a.facade().close("/kept").unwrap();
    assert!(a.held_locks().contains(&shard));

    a.facade().remove("/kept").unwrap();
    assert!(a.held_locks().contains(&shard));
    assert!(c.node(1).facade().open("/kept").is_err());
}
