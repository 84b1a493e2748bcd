/*!
 * System-wide Counters
 * Per-column sample counts and derived percentages
 */

use crate::core::types::Dimension;
use crate::decode::Outcome;

/// Counts and percentages for one aggregate, across all processes
#[derive(Debug, Clone, Default)]
pub struct Counters {
    counts: [Vec<u64>; 3],
    percents: [Vec<f64>; 3],
    num_samples: u64,
    num_failed: u64,
    failed_percent: f64,
}

impl Counters {
    /// Allocate zeroed counters for domains of the given widths
    pub fn new(widths: [usize; 3]) -> Self {
        Self {
            counts: widths.map(|w| vec![0; w]),
            percents: widths.map(|w| vec![0.0; w]),
            num_samples: 0,
            num_failed: 0,
            failed_percent: 0.0,
        }
    }

    /// Fold one classified sample in
    #[inline]
    pub fn record(&mut self, outcome: &Outcome) {
        self.num_samples += 1;
        match outcome {
            Outcome::Decoded(c) => {
                for dim in Dimension::ALL {
                    let counts = &mut self.counts[dim.index()];
                    for col in c.indices(dim) {
                        if let Some(slot) = counts.get_mut(col) {
                            *slot += 1;
                        }
                    }
                }
            }
            Outcome::Failed => self.num_failed += 1,
        }
    }

    /// Derive percentages of `num_samples`; no-op with zero samples
    pub fn finalize(&mut self) -> bool {
        if self.num_samples == 0 {
            return false;
        }
        let total = self.num_samples as f64;
        self.failed_percent = self.num_failed as f64 / total * 100.0;
        for dim in Dimension::ALL {
            let i = dim.index();
            for (percent, &count) in self.percents[i].iter_mut().zip(&self.counts[i]) {
                *percent = count as f64 / total * 100.0;
            }
        }
        true
    }

    /// Zero every counter and percentage
    pub fn clear(&mut self) {
        for i in 0..3 {
            self.counts[i].fill(0);
            self.percents[i].fill(0.0);
        }
        self.num_samples = 0;
        self.num_failed = 0;
        self.failed_percent = 0.0;
    }

    #[inline]
    pub fn counts(&self, dimension: Dimension) -> &[u64] {
        &self.counts[dimension.index()]
    }

    #[inline]
    pub fn percents(&self, dimension: Dimension) -> &[f64] {
        &self.percents[dimension.index()]
    }

    #[inline]
    pub fn count(&self, dimension: Dimension, col: usize) -> u64 {
        self.counts[dimension.index()].get(col).copied().unwrap_or(0)
    }

    #[inline]
    pub fn percent(&self, dimension: Dimension, col: usize) -> f64 {
        self.percents[dimension.index()].get(col).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn num_samples(&self) -> u64 {
        self.num_samples
    }

    #[inline]
    pub fn num_failed(&self) -> u64 {
        self.num_failed
    }

    #[inline]
    pub fn failed_percent(&self) -> f64 {
        self.failed_percent
    }
}
