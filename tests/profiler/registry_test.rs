/*!
 * Process Registry Tests
 * Identity assignment and pid reuse
 */

use insnmix::process::name_hash;
use insnmix::ProcessRegistry;
use pretty_assertions::assert_eq;

#[test]
fn test_pid_reuse_creates_distinct_identities() {
    let mut registry = ProcessRegistry::new();

    let first = registry.resolve(100, "a").clone();
    let second = registry.resolve(100, "b").clone();
    let again = registry.resolve(100, "a").clone();

    assert_eq!(first.pid, 100);
    assert_eq!(second.pid, 100);
    assert_ne!(first.dense_index, second.dense_index);
    assert_ne!(first.name_hash, second.name_hash);
    assert_eq!(again, first);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_latest_follows_newest_binding() {
    let mut registry = ProcessRegistry::new();
    registry.resolve(7, "sh");
    registry.resolve(7, "cc1");
    // going back to an old name does not make it the latest
    registry.resolve(7, "sh");

    assert_eq!(registry.latest(7).unwrap().name.as_str(), "cc1");
    assert!(registry.latest(8).is_none());
}

#[test]
fn test_dense_indices_are_sequential_and_reversible() {
    let mut registry = ProcessRegistry::new();
    for pid in [30, 10, 20] {
        registry.resolve(pid, "worker");
    }

    let pids: Vec<u32> = (0..3)
        .map(|i| registry.by_dense_index(i).unwrap().pid)
        .collect();
    assert_eq!(pids, vec![30, 10, 20]);
    assert!(registry.by_dense_index(3).is_none());
}

#[test]
fn test_djb2_hash() {
    assert_eq!(name_hash(b""), 5381);
    // 5381 * 33 + 'a'
    assert_eq!(name_hash(b"a"), 177_670);
    assert_eq!(name_hash(b"a\0junk"), name_hash(b"a"));
}
