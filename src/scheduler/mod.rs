/*!
 * Scheduler Module
 * Timer-driven interval boundary and user/OS control input
 */

pub mod signals;
pub mod task;
pub mod types;

// Re-export public API
pub use signals::{map_key, spawn_key_reader, spawn_signal_listener};
pub use task::{IntervalScheduler, IntervalTask};
pub use types::{IntervalCommand, RunBounds, SchedulerReport, SchedulerState, StopReason};
