/*!
 * Per-process Table
 * Growable struct-of-arrays holding one row per process slot
 *
 * Each matrix is stored slot-major (`slot * width + column`), so growing
 * the slot dimension is a plain resize: existing rows keep their values
 * and new rows arrive zeroed.
 */

use crate::core::limits::INITIAL_PROC_CAPACITY;
use crate::core::types::Dimension;
use crate::decode::Outcome;

#[derive(Debug, Clone, Default)]
pub struct ProcTable {
    widths: [usize; 3],
    capacity: usize,
    counts: [Vec<u64>; 3],
    percents: [Vec<f64>; 3],
    num_samples: Vec<u64>,
    num_failed: Vec<u64>,
    sample_percent: Vec<f64>,
    failed_percent: Vec<f64>,
}

impl ProcTable {
    pub fn with_capacity(widths: [usize; 3], capacity: usize) -> Self {
        let mut table = Self {
            widths,
            ..Default::default()
        };
        table.resize(capacity);
        table
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Double the slot dimension (or allocate the initial size when empty)
    pub fn grow(&mut self) {
        let next = if self.capacity == 0 {
            INITIAL_PROC_CAPACITY
        } else {
            self.capacity * 2
        };
        self.resize(next);
    }

    /// Grow until `slot` is addressable
    #[inline]
    pub fn ensure(&mut self, slot: usize) {
        while slot >= self.capacity {
            self.grow();
        }
    }

    fn resize(&mut self, capacity: usize) {
        for dim in Dimension::ALL {
            let i = dim.index();
            let cells = capacity * self.widths[i];
            self.counts[i].resize(cells, 0);
            self.percents[i].resize(cells, 0.0);
        }
        self.num_samples.resize(capacity, 0);
        self.num_failed.resize(capacity, 0);
        self.sample_percent.resize(capacity, 0.0);
        self.failed_percent.resize(capacity, 0.0);
        self.capacity = capacity;
    }

    #[inline]
    fn row_range(&self, slot: usize, dimension: Dimension) -> std::ops::Range<usize> {
        let width = self.widths[dimension.index()];
        slot * width..(slot + 1) * width
    }

    /// Fold one sample into `slot`; the slot must already be addressable
    #[inline]
    pub fn record(&mut self, slot: usize, outcome: &Outcome) {
        self.ensure(slot);
        self.num_samples[slot] += 1;
        match outcome {
            Outcome::Decoded(c) => {
                for dim in Dimension::ALL {
                    let range = self.row_range(slot, dim);
                    let row = &mut self.counts[dim.index()][range];
                    for col in c.indices(dim) {
                        if let Some(cell) = row.get_mut(col) {
                            *cell += 1;
                        }
                    }
                }
            }
            Outcome::Failed => self.num_failed[slot] += 1,
        }
    }

    /// Derive per-process percentages for the first `rows` slots
    ///
    /// Sample share and failure rate are relative to `total_samples`;
    /// column percentages are relative to the process's own samples.
    /// Slots with no samples keep whatever percentages they had.
    pub fn finalize(&mut self, rows: usize, total_samples: u64) {
        if total_samples == 0 {
            return;
        }
        let total = total_samples as f64;
        for slot in 0..rows.min(self.capacity) {
            let own = self.num_samples[slot];
            self.sample_percent[slot] = own as f64 / total * 100.0;
            self.failed_percent[slot] = self.num_failed[slot] as f64 / total * 100.0;
            if own == 0 {
                continue;
            }
            for dim in Dimension::ALL {
                let i = dim.index();
                let range = self.row_range(slot, dim);
                let (counts, percents) = (&self.counts[i][range.clone()], &mut self.percents[i][range]);
                for (percent, &count) in percents.iter_mut().zip(counts) {
                    *percent = count as f64 / own as f64 * 100.0;
                }
            }
        }
    }

    /// Zero every cell, keeping capacity
    pub fn clear(&mut self) {
        for i in 0..3 {
            self.counts[i].fill(0);
            self.percents[i].fill(0.0);
        }
        self.num_samples.fill(0);
        self.num_failed.fill(0);
        self.sample_percent.fill(0.0);
        self.failed_percent.fill(0.0);
    }

    pub fn counts(&self, slot: usize, dimension: Dimension) -> &[u64] {
        if slot >= self.capacity {
            return &[];
        }
        &self.counts[dimension.index()][self.row_range(slot, dimension)]
    }

    pub fn percents(&self, slot: usize, dimension: Dimension) -> &[f64] {
        if slot >= self.capacity {
            return &[];
        }
        &self.percents[dimension.index()][self.row_range(slot, dimension)]
    }

    #[inline]
    pub fn count(&self, slot: usize, dimension: Dimension, col: usize) -> u64 {
        self.counts(slot, dimension).get(col).copied().unwrap_or(0)
    }

    #[inline]
    pub fn percent(&self, slot: usize, dimension: Dimension, col: usize) -> f64 {
        self.percents(slot, dimension).get(col).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn num_samples(&self, slot: usize) -> u64 {
        self.num_samples.get(slot).copied().unwrap_or(0)
    }

    #[inline]
    pub fn num_failed(&self, slot: usize) -> u64 {
        self.num_failed.get(slot).copied().unwrap_or(0)
    }

    #[inline]
    pub fn sample_percent(&self, slot: usize) -> f64 {
        self.sample_percent.get(slot).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn failed_percent(&self, slot: usize) -> f64 {
        self.failed_percent.get(slot).copied().unwrap_or(0.0)
    }
}
