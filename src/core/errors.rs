/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 *
 * Decode failures are not errors: they are counted as data
 * (see `decode::Outcome::Failed`). Everything here ends the run.
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while bringing up the sampling transport
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SetupError {
    #[error("Permission denied opening performance counters: {0}")]
    #[diagnostic(
        code(setup::permission_denied),
        help("Run as root or lower /proc/sys/kernel/perf_event_paranoid.")
    )]
    PermissionDenied(String),

    #[error("Failed to open perf event on CPU {cpu}: {reason}")]
    #[diagnostic(
        code(setup::perf_open_failed),
        help("Check that the kernel supports perf events for the detected PMU.")
    )]
    PerfOpen { cpu: i32, reason: String },

    #[error("Failed to map perf ring buffer: {0}")]
    #[diagnostic(code(setup::mmap_failed))]
    RingMap(String),

    #[error("No online CPU could be sampled")]
    #[diagnostic(
        code(setup::no_cpus),
        help("Every CPU reported offline; nothing can be profiled.")
    )]
    NoCpus,

    #[error("Failed to read system topology: {0}")]
    #[diagnostic(code(setup::topology))]
    Topology(String),

    #[error("Sample transport not supported: {0}")]
    #[diagnostic(
        code(setup::unsupported),
        help("Use --source simulate on platforms without perf events.")
    )]
    Unsupported(String),
}

/// Invalid option values
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Interval length must be greater than zero")]
    #[diagnostic(code(config::zero_interval))]
    ZeroInterval,

    #[error("Sample period must be greater than zero")]
    #[diagnostic(code(config::zero_sample_period))]
    ZeroSamplePeriod,

    #[error("Invalid value for {option}: {reason}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { option: String, reason: String },
}

/// Failures writing an interval to an output sink
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum RenderError {
    #[error("Failed to create CSV file {path}: {reason}")]
    #[diagnostic(code(render::csv_create), help("Check that the directory exists and is writable."))]
    CsvCreate { path: String, reason: String },

    #[error("Failed to write output: {0}")]
    #[diagnostic(code(render::write))]
    Write(String),

    #[error("Terminal error: {0}")]
    #[diagnostic(code(render::terminal), help("The interactive view needs a TTY; use --csv otherwise."))]
    Terminal(String),
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Write(err.to_string())
    }
}

/// Unified profiler error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum InsnmixError {
    #[error("Setup error: {0}")]
    #[diagnostic(transparent)]
    Setup(#[from] SetupError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(insnmix::io))]
    Io(String),

    #[error("Worker failed: {0}")]
    #[diagnostic(
        code(insnmix::worker),
        help("A profiling thread terminated abnormally; the run cannot continue.")
    )]
    Worker(String),
}

impl From<std::io::Error> for InsnmixError {
    fn from(err: std::io::Error) -> Self {
        InsnmixError::Io(err.to_string())
    }
}

/// Result type for profiler operations
pub type Result<T> = std::result::Result<T, InsnmixError>;
