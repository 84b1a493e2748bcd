/*!
 * Results Module
 * Aggregation of classified samples
 */

pub mod counters;
pub mod store;
pub mod table;

// Re-export for convenience
pub use counters::Counters;
pub use store::{Aggregate, AggregateStore};
pub use table::ProcTable;
