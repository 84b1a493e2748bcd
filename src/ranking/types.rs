/*!
 * Ranking Types
 * Snapshot views handed to render sinks
 */

use crate::core::types::{CommName, Dimension, Pid};
use serde::{Deserialize, Serialize};

/// How columns are selected and ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrder {
    /// Every domain entry in domain order, unfiltered
    Domain,
    /// Non-zero entries passing the filter, highest percentage first
    ByPercent,
}

/// How process rows are selected and ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOrder {
    /// Processes with samples, in slot (first seen) order
    Slot,
    /// Processes with samples, most samples first
    BySamples,
}

/// One column of the system-wide row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStat {
    pub index: usize,
    pub name: String,
    pub percent: f64,
    pub count: u64,
}

/// One process row; `values` is aligned with the view's columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRow {
    /// Interval slot, or dense index for lifetime views
    pub row: usize,
    pub pid: Pid,
    pub name: CommName,
    pub num_samples: u64,
    pub sample_percent: f64,
    pub failed_percent: f64,
    pub values: Vec<f64>,
}

/// A complete, owned snapshot of one finalized interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalView {
    pub interval: u64,
    pub dimension: Dimension,
    pub num_samples: u64,
    pub num_failed: u64,
    pub failed_percent: f64,
    /// Records the transport dropped so far
    pub lost: u64,
    pub columns: Vec<ColumnStat>,
    pub processes: Vec<ProcessRow>,
}

impl IntervalView {
    pub fn is_empty(&self) -> bool {
        self.num_samples == 0
    }
}
