/*!
 * Core Types
 * Common types used across the profiler
 */

use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmartString;
use std::fmt;

/// Process ID type
pub type Pid = u32;

/// Process short name (fits inline, comm names are at most 15 bytes)
pub type CommName = SmartString;

/// Dense, never-reused index of a (pid, name) binding
pub type DenseIndex = usize;

/// Position of a process within the current interval's tables
pub type IntervalSlot = usize;

/// Classification domain a counter column belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Instruction categories (one or more per instruction)
    #[default]
    Category,
    /// Instruction mnemonics (exactly one per instruction)
    Mnemonic,
    /// ISA extensions (zero or more per instruction)
    Extension,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Category, Dimension::Mnemonic, Dimension::Extension];

    /// Array index for per-dimension storage
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Normalize a user-supplied column name to the casing this dimension uses
    pub fn normalize(self, name: &str) -> String {
        match self {
            Dimension::Mnemonic => name.to_lowercase(),
            Dimension::Category | Dimension::Extension => name.to_uppercase(),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dimension::Category => "category",
            Dimension::Mnemonic => "mnemonic",
            Dimension::Extension => "extension",
        };
        f.write_str(s)
    }
}

/// Decode a NUL-terminated, fixed-size comm buffer
pub fn comm_from_bytes(bytes: &[u8]) -> CommName {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    SmartString::from(String::from_utf8_lossy(&bytes[..end]).as_ref())
}
