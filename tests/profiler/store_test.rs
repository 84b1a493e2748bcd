/*!
 * Aggregate Store Tests
 * Additivity, growth, reset and percentage invariants
 */

use insnmix::core::types::Dimension;
use insnmix::decode::{Classification, GroupSet, Outcome};
use insnmix::AggregateStore;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const WIDTHS: [usize; 3] = [4, 6, 2];

fn outcome(category: usize, mnemonic: usize) -> Outcome {
    if category == WIDTHS[0] {
        return Outcome::Failed;
    }
    Outcome::Decoded(Classification {
        mnemonic,
        categories: GroupSet::from_iter([category]),
        extensions: GroupSet::from_iter([mnemonic % WIDTHS[2]]),
    })
}

/// (pid, category or WIDTHS[0] for a failure, mnemonic)
fn sample_strategy() -> impl Strategy<Value = (u32, usize, usize)> {
    (0u32..200, 0..=WIDTHS[0], 0..WIDTHS[1])
}

fn feed(store: &mut AggregateStore, samples: &[(u32, usize, usize)]) {
    for &(pid, category, mnemonic) in samples {
        let slot = store.interval_slot(pid);
        store.record(pid as usize, slot, &outcome(category, mnemonic));
    }
}

fn assert_additive(store: &AggregateStore) {
    let interval = store.interval();
    for dim in Dimension::ALL {
        for col in 0..WIDTHS[dim.index()] {
            let per_process: u64 = (0..store.interval_pid_count())
                .map(|slot| interval.procs.count(slot, dim, col))
                .sum();
            assert_eq!(interval.system.count(dim, col), per_process);
        }
    }
    let samples: u64 = (0..store.interval_pid_count())
        .map(|slot| interval.procs.num_samples(slot))
        .sum();
    assert_eq!(interval.system.num_samples(), samples);
}

proptest! {
    #[test]
    fn prop_system_counts_equal_process_sums(samples in prop::collection::vec(sample_strategy(), 0..600)) {
        let mut store = AggregateStore::with_widths(WIDTHS);
        feed(&mut store, &samples);
        assert_additive(&store);
        prop_assert!(store.interval_capacity() >= store.interval_pid_count());
    }

    #[test]
    fn prop_finalize_is_idempotent(samples in prop::collection::vec(sample_strategy(), 1..300)) {
        let mut store = AggregateStore::with_widths(WIDTHS);
        feed(&mut store, &samples);

        store.finalize_percentages();
        let first = store.interval().clone();
        store.finalize_percentages();
        let second = store.interval();

        for dim in Dimension::ALL {
            prop_assert_eq!(first.system.percents(dim), second.system.percents(dim));
            for slot in 0..store.interval_pid_count() {
                prop_assert_eq!(first.procs.percents(slot, dim), second.procs.percents(slot, dim));
            }
        }
    }

    #[test]
    fn prop_failures_never_touch_columns(failed in 0usize..100, decoded in 0usize..100) {
        let mut store = AggregateStore::with_widths(WIDTHS);
        let mut samples = vec![(1, WIDTHS[0], 0); failed];
        samples.extend(std::iter::repeat((1, 2, 3)).take(decoded));
        feed(&mut store, &samples);

        let system = &store.interval().system;
        prop_assert_eq!(system.num_samples(), (failed + decoded) as u64);
        prop_assert_eq!(system.num_failed(), failed as u64);
        prop_assert_eq!(system.counts(Dimension::Category).iter().sum::<u64>(), decoded as u64);
        prop_assert_eq!(system.counts(Dimension::Mnemonic).iter().sum::<u64>(), decoded as u64);
    }
}

#[test]
fn test_growth_preserves_existing_slots() {
    let mut store = AggregateStore::with_widths(WIDTHS);
    let initial = store.interval_capacity();

    for pid in 0..initial as u32 {
        let slot = store.interval_slot(pid);
        for _ in 0..=pid % 3 {
            store.record(pid as usize, slot, &outcome((pid % 4) as usize, 1));
        }
    }
    let before: Vec<(u64, u64)> = (0..initial)
        .map(|slot| {
            let procs = &store.interval().procs;
            (procs.num_samples(slot), procs.count(slot, Dimension::Category, slot % 4))
        })
        .collect();

    // one more pid than the capacity holds
    let slot = store.interval_slot(10_000);
    assert_eq!(slot, initial);
    assert_eq!(store.interval_capacity(), initial * 2);

    let procs = &store.interval().procs;
    for (slot, expected) in before.iter().enumerate() {
        assert_eq!((procs.num_samples(slot), procs.count(slot, Dimension::Category, slot % 4)), *expected);
    }
    for slot in initial..initial * 2 {
        assert_eq!(procs.num_samples(slot), 0);
        assert!(procs.counts(slot, Dimension::Mnemonic).iter().all(|&c| c == 0));
    }
}

#[test]
fn test_clear_resets_interval_only() {
    let mut store = AggregateStore::with_widths(WIDTHS);
    feed(&mut store, &[(1, 0, 0), (2, 1, 1), (2, WIDTHS[0], 0)]);
    store.finalize_percentages();
    let capacity = store.interval_capacity();

    store.clear_interval();

    let interval = store.interval();
    assert_eq!(interval.system.num_samples(), 0);
    assert_eq!(interval.system.num_failed(), 0);
    for dim in Dimension::ALL {
        assert!(interval.system.counts(dim).iter().all(|&c| c == 0));
        for slot in 0..capacity {
            assert!(interval.procs.counts(slot, dim).iter().all(|&c| c == 0));
        }
    }
    assert_eq!(store.interval_pid_count(), 0);
    assert_eq!(store.interval_capacity(), capacity);
    assert_eq!(store.interval_num(), 1);

    assert_eq!(store.lifetime().system.num_samples(), 3);
    assert_eq!(store.lifetime().system.num_failed(), 1);
    assert_eq!(store.lifetime().procs.num_samples(2), 2);
}

#[test]
fn test_empty_interval_finalize_is_noop() {
    let mut store = AggregateStore::with_widths(WIDTHS);
    assert!(!store.finalize_percentages());
    assert_eq!(store.interval().system.percent(Dimension::Category, 0), 0.0);
}
