/*!
 * Ranking Module
 * Filtered, sorted views over a finalized aggregate
 */

pub mod selection;
pub mod types;

pub use selection::{ColumnFilter, Ranker};
pub use types::{ColumnOrder, ColumnStat, IntervalView, ProcessOrder, ProcessRow};
