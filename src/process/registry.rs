/*!
 * Process Registry
 * Maps sampled pids to dense, never-reused identities
 *
 * Lookup by pid is O(1) amortized through a sparse map; every pid keeps the
 * list of identities created under it in creation order, so the newest name
 * binding is always the last entry.
 */

use super::types::{name_hash, ProcessIdentity};
use crate::core::types::{CommName, DenseIndex, Pid};
use ahash::AHashMap;
use tracing::trace;

/// Registry of every (pid, name) pair seen during the run
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    /// Identities indexed by dense index
    identities: Vec<ProcessIdentity>,
    /// Dense indices created under each pid, oldest first
    by_pid: AHashMap<Pid, Vec<DenseIndex>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or create the identity for `(pid, name)`
    ///
    /// A pid seen with a different name gets a new identity appended under
    /// it. Never fails.
    pub fn resolve(&mut self, pid: Pid, name: &str) -> &ProcessIdentity {
        let hash = name_hash(name.as_bytes());
        let bindings = self.by_pid.entry(pid).or_default();

        let found = bindings
            .iter()
            .copied()
            .find(|&index| self.identities[index].name_hash == hash);

        let index = match found {
            Some(index) => index,
            None => {
                let index = self.identities.len();
                trace!(pid, name, dense_index = index, "new process identity");
                self.identities.push(ProcessIdentity {
                    dense_index: index,
                    pid,
                    name: CommName::from(name),
                    name_hash: hash,
                });
                bindings.push(index);
                index
            }
        };

        &self.identities[index]
    }

    /// Most recently created identity under `pid`
    pub fn latest(&self, pid: Pid) -> Option<&ProcessIdentity> {
        self.by_pid
            .get(&pid)
            .and_then(|bindings| bindings.last())
            .map(|&index| &self.identities[index])
    }

    /// Reverse lookup used by lifetime summaries
    pub fn by_dense_index(&self, index: DenseIndex) -> Option<&ProcessIdentity> {
        self.identities.get(index)
    }

    /// Number of identities created so far
    #[inline]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Iterate identities in dense-index order
    pub fn iter(&self) -> impl Iterator<Item = &ProcessIdentity> {
        self.identities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_resolve_creates_identity() {
        let mut registry = ProcessRegistry::new();
        let identity = registry.resolve(42, "worker").clone();

        assert_eq!(identity.dense_index, 0);
        assert_eq!(identity.pid, 42);
        assert_eq!(identity.name.as_str(), "worker");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_repeat_resolve_is_stable() {
        let mut registry = ProcessRegistry::new();
        let first = registry.resolve(7, "sh").dense_index;
        let second = registry.resolve(7, "sh").dense_index;

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_pid_reuse_creates_new_identity() {
        let mut registry = ProcessRegistry::new();
        let a = registry.resolve(100, "a").clone();
        let b = registry.resolve(100, "b").clone();
        let again = registry.resolve(100, "a").clone();

        assert_eq!(a.pid, b.pid);
        assert_ne!(a.dense_index, b.dense_index);
        assert_ne!(a.name_hash, b.name_hash);
        assert_eq!(again, a);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_latest_returns_newest_binding() {
        let mut registry = ProcessRegistry::new();
        registry.resolve(100, "a");
        registry.resolve(100, "b");
        registry.resolve(100, "a");

        assert_eq!(registry.latest(100).map(|p| p.name.as_str()), Some("b"));
        assert!(registry.latest(101).is_none());
    }

    #[test]
    fn test_by_dense_index() {
        let mut registry = ProcessRegistry::new();
        registry.resolve(1, "init");
        registry.resolve(2, "kthreadd");

        assert_eq!(registry.by_dense_index(1).map(|p| p.pid), Some(2));
        assert!(registry.by_dense_index(2).is_none());
    }
}
