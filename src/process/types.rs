/*!
 * Process Types
 * Identity records for sampled processes
 */

use crate::core::types::{CommName, DenseIndex, Pid};
use serde::{Deserialize, Serialize};

/// Seed of the djb2 name hash
const NAME_HASH_SEED: u32 = 5381;

/// A stable (pid, name) binding
///
/// Several identities may share a pid when the kernel recycles it for a
/// different program; they are told apart by `name_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIdentity {
    /// Assigned at first sight, never reused
    pub dense_index: DenseIndex,
    pub pid: Pid,
    pub name: CommName,
    pub name_hash: u32,
}

/// djb2 over the bytes of a comm name, stopping at the first NUL
///
/// Collisions are tolerated: two programs with colliding names reusing the
/// same pid are merged into one identity.
#[inline]
pub fn name_hash(name: &[u8]) -> u32 {
    name.iter()
        .take_while(|&&b| b != 0)
        .fold(NAME_HASH_SEED, |hash, &b| {
            hash.wrapping_mul(33).wrapping_add(u32::from(b))
        })
}
