/*!
 * Interval Scheduler Types
 * Commands, states and run bounds
 */

use crate::sampling::IngestStats;
use crate::ui::ViewCommand;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Messages consumed by the interval scheduler loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalCommand {
    /// Close the current interval immediately
    Tick,
    /// Navigation for the interactive view
    View(ViewCommand),
    /// End the run
    Stop(StopReason),
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// SIGINT or SIGTERM
    Signal,
    /// `q` in the interactive view
    User,
    RuntimeElapsed,
    IntervalLimit,
    /// Every command sender was dropped
    Disconnected,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Signal => "signal",
            StopReason::User => "user",
            StopReason::RuntimeElapsed => "runtime elapsed",
            StopReason::IntervalLimit => "interval limit",
            StopReason::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Interval boundary state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    #[default]
    Idle,
    Finalizing,
    Rendering,
    Clearing,
    Terminal,
}

impl SchedulerState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Finalizing => "finalizing",
            SchedulerState::Rendering => "rendering",
            SchedulerState::Clearing => "clearing",
            SchedulerState::Terminal => "terminal",
        }
    }
}

/// Optional limits on how long a run lasts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunBounds {
    pub max_intervals: Option<u64>,
    pub runtime: Option<Duration>,
}

impl RunBounds {
    pub fn unbounded() -> Self {
        Self::default()
    }

    #[inline]
    pub fn intervals_reached(&self, completed: u64) -> bool {
        self.max_intervals.is_some_and(|max| completed >= max)
    }
}

/// Outcome of a finished scheduler loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerReport {
    pub intervals: u64,
    pub reason: StopReason,
    pub ingest: Option<IngestStats>,
}
