/*!
 * insnmix
 * Instruction-mix profiler driven by performance-counter sampling
 *
 * Samples flow from a transport (`sampling`) through the classifier
 * (`decode`) and the process registry (`process`) into the aggregate
 * store (`results`). The interval scheduler (`scheduler`) finalizes,
 * ranks (`ranking`) and renders (`ui`) each interval.
 */

pub mod app;
pub mod config;
pub mod context;
pub mod core;
pub mod decode;
pub mod monitoring;
pub mod process;
pub mod ranking;
pub mod results;
pub mod sampling;
pub mod scheduler;
pub mod ui;

// Re-exports
pub use app::{run, RunSummary};
pub use config::{Cli, Options, OutputMode};
pub use context::{ProfileState, ProfilerContext};
pub use core::errors::{ConfigError, InsnmixError, RenderError, Result, SetupError};
pub use core::types::{CommName, DenseIndex, Dimension, IntervalSlot, Pid};
pub use decode::{DecoderKind, Domains, InstructionDecoder, Outcome, SampleClassifier};
pub use monitoring::init_tracing;
pub use process::{ProcessIdentity, ProcessRegistry};
pub use ranking::{ColumnFilter, IntervalView, Ranker};
pub use results::AggregateStore;
pub use sampling::{RawSample, SampleSource, SourceKind};
pub use scheduler::{IntervalScheduler, IntervalTask, StopReason};
