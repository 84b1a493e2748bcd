/*!
 * Sampling Module
 * Sample transports, PMU probing and the ingestion loop
 */

pub mod channel;
pub mod ingest;
#[cfg(target_os = "linux")]
pub mod perf;
pub mod pmu;
pub mod simulation;
pub mod traits;
pub mod types;

// Re-export public API
pub use channel::{sample_channel, ChannelSampleSource, SampleSender};
pub use ingest::{IngestStats, IngestionLoop};
pub use pmu::{PmuEvent, PmuProbe};
pub use simulation::{SimulatedWorkload, SimulationHandle};
pub use traits::SampleSource;
pub use types::{RawSample, SourceKind};

use crate::core::errors::Result;
use crate::core::limits::SAMPLE_CHANNEL_CAPACITY;
use crate::core::types::Pid;
use crate::decode::DecoderKind;

/// An opened transport plus whatever keeps its producer alive
pub struct ActiveSource {
    pub source: Box<dyn SampleSource>,
    /// Present only for the simulated transport
    pub simulation: Option<SimulationHandle>,
}

/// Open the transport selected at startup
pub fn open_source(
    kind: SourceKind,
    decoder: DecoderKind,
    sample_period: u64,
    pid: Option<Pid>,
    max_insn_len: usize,
) -> Result<ActiveSource> {
    match kind {
        SourceKind::Perf => open_perf(decoder, sample_period, pid, max_insn_len),
        SourceKind::Simulate => {
            let (sender, source) = sample_channel(SAMPLE_CHANNEL_CAPACITY);
            let handle = SimulatedWorkload::new(decoder).only_pid(pid).spawn(sender)?;
            Ok(ActiveSource {
                source: Box::new(source),
                simulation: Some(handle),
            })
        }
    }
}

#[cfg(target_os = "linux")]
fn open_perf(
    decoder: DecoderKind,
    sample_period: u64,
    pid: Option<Pid>,
    max_insn_len: usize,
) -> Result<ActiveSource> {
    let event = PmuProbe::default().detect(decoder);
    let source = perf::PerfSampleSource::open(&event, sample_period, pid, max_insn_len)?;
    Ok(ActiveSource {
        source: Box::new(source),
        simulation: None,
    })
}

#[cfg(not(target_os = "linux"))]
fn open_perf(
    _decoder: DecoderKind,
    _sample_period: u64,
    _pid: Option<Pid>,
    _max_insn_len: usize,
) -> Result<ActiveSource> {
    Err(crate::core::errors::SetupError::Unsupported(
        "perf events are only available on Linux".into(),
    )
    .into())
}
