/*!
 * Sampling Types
 * Fixed-layout sample records handed from a transport to ingestion
 */

use crate::core::limits::{COMM_LEN, MAX_INSN_BYTES};
use crate::core::types::{comm_from_bytes, CommName, Pid};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One captured sample: owning pid, instruction bytes at the sampled IP
/// and the task's short name
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub pid: Pid,
    insn: [u8; MAX_INSN_BYTES],
    insn_len: u8,
    comm: [u8; COMM_LEN],
}

impl RawSample {
    /// Build a record, truncating bytes and name to the fixed layout
    pub fn new(pid: Pid, insn: &[u8], comm: &[u8]) -> Self {
        let mut sample = Self {
            pid,
            insn: [0; MAX_INSN_BYTES],
            insn_len: 0,
            comm: [0; COMM_LEN],
        };
        let len = insn.len().min(MAX_INSN_BYTES);
        sample.insn[..len].copy_from_slice(&insn[..len]);
        sample.insn_len = len as u8;
        // Keep room for the terminating NUL
        let name_len = comm.len().min(COMM_LEN - 1);
        sample.comm[..name_len].copy_from_slice(&comm[..name_len]);
        sample
    }

    /// Captured instruction bytes
    #[inline]
    pub fn insn(&self) -> &[u8] {
        &self.insn[..self.insn_len as usize]
    }

    /// Raw NUL-terminated comm buffer
    #[inline]
    pub fn comm_bytes(&self) -> &[u8; COMM_LEN] {
        &self.comm
    }

    pub fn comm(&self) -> CommName {
        comm_from_bytes(&self.comm)
    }
}

impl fmt::Debug for RawSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSample")
            .field("pid", &self.pid)
            .field("comm", &self.comm())
            .field("insn", &format_args!("{:02x?}", self.insn()))
            .finish()
    }
}

/// Transport selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Hardware/software perf events with per-CPU ring buffers
    #[default]
    Perf,
    /// Synthetic workload for machines without perf access
    Simulate,
}

impl SourceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Perf => "perf",
            SourceKind::Simulate => "simulate",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "perf" => Ok(Self::Perf),
            "simulate" | "sim" => Ok(Self::Simulate),
            _ => Err(format!("Invalid source '{}'. Valid: perf, simulate", s)),
        }
    }
}
