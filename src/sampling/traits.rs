/*!
 * Sampling Traits
 * Platform-agnostic abstraction over sample transports
 */

use super::types::RawSample;
use crate::core::errors::Result;

/// Producer side of the sample pipeline
///
/// `poll` drains whatever is available without blocking and hands each
/// record to `sink`. Records the transport had to discard under
/// backpressure are reported through `lost`, never as errors.
pub trait SampleSource: Send {
    /// Short transport name for logs
    fn name(&self) -> &'static str;

    /// Drain pending samples, returning how many were delivered
    fn poll(&mut self, sink: &mut dyn FnMut(RawSample)) -> Result<usize>;

    /// Total records dropped before reaching `poll`
    fn lost(&self) -> u64;
}
