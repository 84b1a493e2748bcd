/*!
 * Profiler Context
 * Explicit owner of all shared profiling state
 *
 * The registry and the aggregate store sit behind one coarse lock so that
 * the interval boundary (finalize, render, clear) is atomic with respect
 * to ingestion. The classifier is stateless and used outside the lock.
 */

use crate::decode::{Domains, Outcome, SampleClassifier};
use crate::process::ProcessRegistry;
use crate::results::AggregateStore;
use crate::sampling::RawSample;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Everything guarded by the profiler lock
#[derive(Debug)]
pub struct ProfileState {
    pub registry: ProcessRegistry,
    pub store: AggregateStore,
}

/// Shared between the ingestion loop and the interval scheduler
#[derive(Debug)]
pub struct ProfilerContext {
    state: RwLock<ProfileState>,
    classifier: SampleClassifier,
    stopping: AtomicBool,
    /// Last reported transport loss
    lost: AtomicU64,
}

impl ProfilerContext {
    pub fn new(classifier: SampleClassifier) -> Self {
        let store = AggregateStore::new(classifier.domains());
        Self {
            state: RwLock::new(ProfileState {
                registry: ProcessRegistry::new(),
                store,
            }),
            classifier,
            stopping: AtomicBool::new(false),
            lost: AtomicU64::new(0),
        }
    }

    /// Fold one raw sample into both aggregates
    ///
    /// Classification happens before the lock is taken; identity
    /// resolution, slot assignment and the counter update happen under it.
    #[inline]
    pub fn ingest(&self, sample: &RawSample) -> Outcome {
        let outcome = self.classifier.classify(sample.insn());
        let comm = sample.comm();

        let mut state = self.state.write();
        let ProfileState { registry, store } = &mut *state;
        let dense_index = registry.resolve(sample.pid, &comm).dense_index;
        let slot = store.interval_slot(sample.pid);
        store.record(dense_index, slot, &outcome);

        outcome
    }

    /// Exclusive access for the interval boundary
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, ProfileState> {
        self.state.write()
    }

    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, ProfileState> {
        self.state.read()
    }

    #[inline]
    pub fn classifier(&self) -> &SampleClassifier {
        &self.classifier
    }

    #[inline]
    pub fn domains(&self) -> &Domains {
        self.classifier.domains()
    }

    /// Ask the ingestion loop to exit after its current poll
    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    pub fn set_lost(&self, lost: u64) {
        self.lost.store(lost, Ordering::Relaxed);
    }

    #[inline]
    pub fn lost(&self) -> u64 {
        self.lost.load(Ordering::Relaxed)
    }
}
