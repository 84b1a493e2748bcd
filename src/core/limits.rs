/*!
 * Profiler Limits and Constants
 *
 * Centralized location for sizes, defaults and timing constants.
 * Organized by subsystem so the hot path and the setup path can be
 * tuned independently.
 *
 * - Performance-critical constants are marked with [PERF]
 * - Values mirrored from the kernel ABI are marked with [LINUX-COMPAT]
 */

use std::time::Duration;

// =============================================================================
// SAMPLE RECORD LAYOUT
// =============================================================================

/// Length of a task comm name including the NUL terminator
/// [LINUX-COMPAT] TASK_COMM_LEN
pub const COMM_LEN: usize = 16;

/// Maximum instruction length captured per sample
/// Longest legal x86 instruction; fixed-width ISAs use a prefix of it
pub const MAX_INSN_BYTES: usize = 15;

/// Instruction width on AArch64
pub const AARCH64_INSN_BYTES: usize = 4;

// =============================================================================
// AGGREGATION
// =============================================================================

/// First capacity of the per-process slot dimension
/// Doubles on every growth after this
pub const INITIAL_PROC_CAPACITY: usize = 64;

/// Maximum categories / extensions a single instruction can belong to
pub const MAX_GROUPS_PER_INSN: usize = 8;

// =============================================================================
// TIMING
// =============================================================================

/// Default interval length (2 seconds)
pub const DEFAULT_INTERVAL_MS: u64 = 2000;

/// Default sampling period (one sample every 10000 events)
pub const DEFAULT_SAMPLE_PERIOD: u64 = 10_000;

/// Sleep between drains of the sample transport
/// [PERF] Long enough to avoid spinning, short enough to keep rings from filling
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Keyboard poll timeout for the interactive view
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// TRANSPORT
// =============================================================================

/// Data pages per perf ring buffer (must be a power of 2)
/// [PERF] 512KB per CPU absorbs a full poll interval at high sample rates
pub const PERF_RING_PAGES: usize = 128;

/// Capacity of the in-process sample channel
pub const SAMPLE_CHANNEL_CAPACITY: usize = 64 * 1024;

/// File-descriptor soft limit requested before opening per-CPU events
pub const DESIRED_NOFILE_LIMIT: u64 = 65_536;

// =============================================================================
// RENDERING
// =============================================================================

/// Width of a percentage column in the interactive view
pub const COLUMN_WIDTH: usize = 8;

/// Width of the PID column
pub const PID_COLUMN_WIDTH: usize = 8;

/// Width of the process name column
pub const NAME_COLUMN_WIDTH: usize = 16;

/// Number of rows printed per table in the end-of-run summary
pub const SUMMARY_TOP_N: usize = 10;
