/*!
 * Selection
 * Column filtering and ranking of columns and processes
 *
 * Sorting uses the standard stable sort with an explicit tie-break on the
 * domain index (columns) or row (processes), so equal keys always come out
 * in the same order for the same input.
 */

use super::types::{ColumnOrder, ColumnStat, IntervalView, ProcessOrder, ProcessRow};
use crate::context::ProfileState;
use crate::core::types::{CommName, Dimension, Pid};
use crate::decode::Domains;
use crate::results::{Counters, ProcTable};
use std::cmp::Ordering;
use tracing::warn;

/// User column filters resolved against the decoder's domains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilter {
    /// Sorted domain indices; `None` keeps every column
    allowed: Option<Vec<usize>>,
}

impl ColumnFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve names; unknown names are warned about and ignored
    pub fn resolve(domains: &Domains, dimension: Dimension, filters: &[String]) -> Self {
        let mut allowed = Vec::new();
        for filter in filters {
            let matched = domains.resolve_filter(dimension, filter);
            if matched.is_empty() {
                warn!(filter = %filter, %dimension, "unrecognized filter, ignoring");
            }
            allowed.extend(matched);
        }
        if allowed.is_empty() {
            return Self::all();
        }
        allowed.sort_unstable();
        allowed.dedup();
        Self {
            allowed: Some(allowed),
        }
    }

    #[inline]
    pub fn allows(&self, index: usize) -> bool {
        match &self.allowed {
            Some(allowed) => allowed.binary_search(&index).is_ok(),
            None => true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.allowed.is_some()
    }
}

/// Produces views for one dimension
#[derive(Debug, Clone)]
pub struct Ranker {
    dimension: Dimension,
    filter: ColumnFilter,
}

impl Ranker {
    pub fn new(dimension: Dimension, filter: ColumnFilter) -> Self {
        Self { dimension, filter }
    }

    #[inline]
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Select and order columns from system-wide counters
    pub fn rank_columns(
        &self,
        counters: &Counters,
        domains: &Domains,
        order: ColumnOrder,
    ) -> Vec<ColumnStat> {
        let dim = self.dimension;
        let stat = |index: usize| ColumnStat {
            index,
            name: domains.name(dim, index).unwrap_or_default().to_string(),
            percent: counters.percent(dim, index),
            count: counters.count(dim, index),
        };

        match order {
            ColumnOrder::Domain => (0..domains.len(dim)).map(stat).collect(),
            ColumnOrder::ByPercent => {
                let mut columns: Vec<ColumnStat> = counters
                    .counts(dim)
                    .iter()
                    .enumerate()
                    .filter(|&(index, &count)| count > 0 && self.filter.allows(index))
                    .map(|(index, _)| stat(index))
                    .collect();
                columns.sort_by(|a, b| by_percent_desc(a.percent, b.percent).then(a.index.cmp(&b.index)));
                columns
            }
        }
    }

    /// Select and order process rows of `table`
    ///
    /// `identity` maps a row to the pid and name to print; rows it cannot
    /// resolve are skipped.
    pub fn rank_processes(
        &self,
        table: &ProcTable,
        rows: usize,
        columns: &[ColumnStat],
        order: ProcessOrder,
        identity: impl Fn(usize) -> Option<(Pid, CommName)>,
    ) -> Vec<ProcessRow> {
        let dim = self.dimension;
        let mut processes: Vec<ProcessRow> = (0..rows)
            .filter(|&row| table.num_samples(row) > 0)
            .filter_map(|row| {
                let (pid, name) = identity(row)?;
                Some(ProcessRow {
                    row,
                    pid,
                    name,
                    num_samples: table.num_samples(row),
                    sample_percent: table.sample_percent(row),
                    failed_percent: table.failed_percent(row),
                    values: columns
                        .iter()
                        .map(|c| table.percent(row, dim, c.index))
                        .collect(),
                })
            })
            .collect();

        if order == ProcessOrder::BySamples {
            processes.sort_by(|a, b| b.num_samples.cmp(&a.num_samples).then(a.row.cmp(&b.row)));
        }
        processes
    }

    /// Snapshot the current interval of a finalized store
    pub fn interval_view(
        &self,
        state: &ProfileState,
        domains: &Domains,
        lost: u64,
        columns: ColumnOrder,
        processes: ProcessOrder,
    ) -> IntervalView {
        let store = &state.store;
        let interval = store.interval();
        let columns = self.rank_columns(&interval.system, domains, columns);
        let processes = self.rank_processes(
            &interval.procs,
            store.interval_pid_count(),
            &columns,
            processes,
            |slot| {
                let pid = store.slot_pid(slot)?;
                let name = state
                    .registry
                    .latest(pid)
                    .map(|identity| identity.name.clone())
                    .unwrap_or_default();
                Some((pid, name))
            },
        );

        IntervalView {
            interval: store.interval_num(),
            dimension: self.dimension,
            num_samples: interval.system.num_samples(),
            num_failed: interval.system.num_failed(),
            failed_percent: interval.system.failed_percent(),
            lost,
            columns,
            processes,
        }
    }

    /// Snapshot the lifetime half, keyed by dense index
    pub fn lifetime_view(&self, state: &ProfileState, domains: &Domains, lost: u64) -> IntervalView {
        let store = &state.store;
        let lifetime = store.lifetime();
        let columns = self.rank_columns(&lifetime.system, domains, ColumnOrder::ByPercent);
        let processes = self.rank_processes(
            &lifetime.procs,
            store.lifetime_rows(),
            &columns,
            ProcessOrder::BySamples,
            |dense_index| {
                state
                    .registry
                    .by_dense_index(dense_index)
                    .map(|identity| (identity.pid, identity.name.clone()))
            },
        );

        IntervalView {
            interval: store.interval_num(),
            dimension: self.dimension,
            num_samples: lifetime.system.num_samples(),
            num_failed: lifetime.system.num_failed(),
            failed_percent: lifetime.system.failed_percent(),
            lost,
            columns,
            processes,
        }
    }
}

#[inline]
fn by_percent_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Classification, GroupSet, Outcome};
    use crate::process::ProcessRegistry;
    use crate::results::AggregateStore;

    fn domains() -> Domains {
        Domains::new(
            vec!["BASE".into(), "SSE".into(), "SSE2".into(), "AVX".into()],
            vec!["add".into(), "mov".into()],
            vec![],
        )
    }

    fn category(cat: usize, mnemonic: usize) -> Outcome {
        Outcome::Decoded(Classification {
            mnemonic,
            categories: GroupSet::from_iter([cat]),
            extensions: GroupSet::new(),
        })
    }

    fn state_with(samples: &[(u32, &str, usize, usize)]) -> ProfileState {
        let domains = domains();
        let mut state = ProfileState {
            registry: ProcessRegistry::new(),
            store: AggregateStore::new(&domains),
        };
        for &(pid, name, cat, count) in samples {
            for _ in 0..count {
                let dense = state.registry.resolve(pid, name).dense_index;
                let slot = state.store.interval_slot(pid);
                state.store.record(dense, slot, &category(cat, 0));
            }
        }
        state.store.finalize_percentages();
        state
    }

    #[test]
    fn test_filter_prefix_and_unknown() {
        let domains = domains();
        let filter = ColumnFilter::resolve(
            &domains,
            Dimension::Category,
            &["sse".to_string(), "nope".to_string()],
        );
        assert!(filter.is_active());
        assert!(filter.allows(1));
        assert!(!filter.allows(2));

        let prefix = ColumnFilter::resolve(&domains, Dimension::Category, &["SS".to_string()]);
        assert!(prefix.allows(1) && prefix.allows(2) && !prefix.allows(0));

        let none = ColumnFilter::resolve(&domains, Dimension::Category, &["zzz".to_string()]);
        assert!(!none.is_active());
    }

    #[test]
    fn test_columns_by_percent_skip_zero() {
        let state = state_with(&[(1, "a", 0, 3), (2, "b", 3, 6)]);
        let ranker = Ranker::new(Dimension::Category, ColumnFilter::all());
        let columns = ranker.rank_columns(&state.store.interval().system, &domains(), ColumnOrder::ByPercent);

        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["AVX", "BASE"]);
    }

    #[test]
    fn test_columns_ties_are_deterministic() {
        let state = state_with(&[(1, "a", 3, 2), (1, "a", 1, 2)]);
        let ranker = Ranker::new(Dimension::Category, ColumnFilter::all());
        let columns = ranker.rank_columns(&state.store.interval().system, &domains(), ColumnOrder::ByPercent);
        assert_eq!(columns[0].index, 1);
        assert_eq!(columns[1].index, 3);
    }

    #[test]
    fn test_domain_order_includes_every_column() {
        let state = state_with(&[(1, "a", 0, 1)]);
        let ranker = Ranker::new(Dimension::Category, ColumnFilter::all());
        let columns = ranker.rank_columns(&state.store.interval().system, &domains(), ColumnOrder::Domain);
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0].percent, 100.0);
        assert_eq!(columns[3].percent, 0.0);
    }

    #[test]
    fn test_processes_by_samples() {
        let state = state_with(&[(7, "small", 0, 1), (9, "big", 0, 5)]);
        let ranker = Ranker::new(Dimension::Category, ColumnFilter::all());
        let view = ranker.interval_view(&state, &domains(), 0, ColumnOrder::ByPercent, ProcessOrder::BySamples);

        assert_eq!(view.processes.len(), 2);
        assert_eq!(view.processes[0].pid, 9);
        assert_eq!(view.processes[0].name.as_str(), "big");
        assert_eq!(view.processes[1].pid, 7);

        let by_slot = ranker.interval_view(&state, &domains(), 0, ColumnOrder::Domain, ProcessOrder::Slot);
        assert_eq!(by_slot.processes[0].pid, 7);
    }

    #[test]
    fn test_lifetime_view_uses_dense_index() {
        let mut state = state_with(&[(5, "first", 0, 2)]);
        state.store.clear_interval();
        let dense = state.registry.resolve(5, "second").dense_index;
        let slot = state.store.interval_slot(5);
        state.store.record(dense, slot, &category(1, 1));
        state.store.finalize_lifetime_percentages();

        let ranker = Ranker::new(Dimension::Category, ColumnFilter::all());
        let view = ranker.lifetime_view(&state, &domains(), 0);
        let names: Vec<_> = view.processes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(view.num_samples, 3);
    }
}
