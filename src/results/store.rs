/*!
 * Aggregate Store
 * Lifetime and current-interval counters, system-wide and per process
 *
 * The lifetime aggregate is keyed by the registry's dense index and only
 * ever grows. The interval aggregate is keyed by interval slot, assigned
 * on first sight of a pid within the interval, and is zeroed at every
 * interval boundary while keeping its capacity.
 */

use super::counters::Counters;
use super::table::ProcTable;
use crate::core::limits::INITIAL_PROC_CAPACITY;
use crate::core::types::{DenseIndex, Dimension, IntervalSlot, Pid};
use crate::decode::{Domains, Outcome};
use ahash::AHashMap;
use tracing::{debug, trace};

/// One half of the store: system-wide counters plus a per-process table
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub system: Counters,
    pub procs: ProcTable,
}

impl Aggregate {
    fn new(widths: [usize; 3], capacity: usize) -> Self {
        Self {
            system: Counters::new(widths),
            procs: ProcTable::with_capacity(widths, capacity),
        }
    }

    #[inline]
    fn record(&mut self, row: usize, outcome: &Outcome) {
        self.system.record(outcome);
        self.procs.record(row, outcome);
    }

    fn finalize(&mut self, rows: usize) -> bool {
        let total = self.system.num_samples();
        if !self.system.finalize() {
            return false;
        }
        self.procs.finalize(rows, total);
        true
    }
}

/// Owner of every counter the profiler keeps
#[derive(Debug)]
pub struct AggregateStore {
    lifetime: Aggregate,
    interval: Aggregate,
    /// pid -> slot for the current interval
    slots: AHashMap<Pid, IntervalSlot>,
    /// slot -> pid for the current interval
    slot_pids: Vec<Pid>,
    /// Highest dense index recorded, plus one
    lifetime_rows: usize,
    interval_num: u64,
}

impl AggregateStore {
    /// Allocate both halves sized to the decoder's domains
    pub fn new(domains: &Domains) -> Self {
        let widths = Dimension::ALL.map(|d| domains.len(d));
        Self::with_widths(widths)
    }

    pub fn with_widths(widths: [usize; 3]) -> Self {
        Self {
            lifetime: Aggregate::new(widths, 0),
            interval: Aggregate::new(widths, INITIAL_PROC_CAPACITY),
            slots: AHashMap::with_capacity(INITIAL_PROC_CAPACITY),
            slot_pids: Vec::with_capacity(INITIAL_PROC_CAPACITY),
            lifetime_rows: 0,
            interval_num: 0,
        }
    }

    /// Slot for `pid` in the current interval, assigning the next free one
    /// on first sight
    ///
    /// Capacity is grown before the new slot is handed out.
    pub fn interval_slot(&mut self, pid: Pid) -> IntervalSlot {
        if let Some(&slot) = self.slots.get(&pid) {
            return slot;
        }
        let slot = self.slot_pids.len();
        if slot >= self.interval.procs.capacity() {
            self.grow_interval_capacity();
        }
        self.slots.insert(pid, slot);
        self.slot_pids.push(pid);
        trace!(pid, slot, "interval slot assigned");
        slot
    }

    /// Double the interval slot capacity, preserving existing rows
    pub fn grow_interval_capacity(&mut self) {
        let before = self.interval.procs.capacity();
        self.interval.procs.grow();
        debug!(
            from = before,
            to = self.interval.procs.capacity(),
            "interval process capacity grown"
        );
    }

    /// Count one sample in both halves
    ///
    /// Callers hold the profiler's write lock.
    #[inline]
    pub fn record(&mut self, dense_index: DenseIndex, slot: IntervalSlot, outcome: &Outcome) {
        self.interval.record(slot, outcome);
        self.lifetime.record(dense_index, outcome);
        if dense_index >= self.lifetime_rows {
            self.lifetime_rows = dense_index + 1;
        }
    }

    /// Derive interval percentages; returns false when the interval is empty
    pub fn finalize_percentages(&mut self) -> bool {
        let rows = self.slot_pids.len();
        self.interval.finalize(rows)
    }

    /// Derive lifetime percentages for the end-of-run summary
    pub fn finalize_lifetime_percentages(&mut self) -> bool {
        let rows = self.lifetime_rows;
        self.lifetime.finalize(rows)
    }

    /// Zero the interval half and start the next interval
    pub fn clear_interval(&mut self) {
        self.interval.system.clear();
        self.interval.procs.clear();
        self.slots.clear();
        self.slot_pids.clear();
        self.interval_num += 1;
    }

    #[inline]
    pub fn interval(&self) -> &Aggregate {
        &self.interval
    }

    #[inline]
    pub fn lifetime(&self) -> &Aggregate {
        &self.lifetime
    }

    /// Number of slots assigned in the current interval
    #[inline]
    pub fn interval_pid_count(&self) -> usize {
        self.slot_pids.len()
    }

    #[inline]
    pub fn slot_pids(&self) -> &[Pid] {
        &self.slot_pids
    }

    #[inline]
    pub fn slot_pid(&self, slot: IntervalSlot) -> Option<Pid> {
        self.slot_pids.get(slot).copied()
    }

    #[inline]
    pub fn interval_capacity(&self) -> usize {
        self.interval.procs.capacity()
    }

    #[inline]
    pub fn lifetime_rows(&self) -> usize {
        self.lifetime_rows
    }

    /// Number of completed intervals
    #[inline]
    pub fn interval_num(&self) -> u64 {
        self.interval_num
    }
}
