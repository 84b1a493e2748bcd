/*!
 * Sample Ingestion Loop
 * Consumer side of the sample transport
 *
 * Drains the transport, folds every sample into the shared context and
 * sleeps briefly between drains until a stop is requested. Once a sample
 * has been dequeued it is always counted.
 */

use super::traits::SampleSource;
use crate::context::ProfilerContext;
use crate::core::errors::Result;
use crate::core::limits::POLL_INTERVAL;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Totals reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub samples: u64,
    pub failed: u64,
    pub polls: u64,
    pub lost: u64,
}

pub struct IngestionLoop {
    context: Arc<ProfilerContext>,
    source: Box<dyn SampleSource>,
    poll_interval: Duration,
    stats: IngestStats,
}

impl IngestionLoop {
    pub fn new(context: Arc<ProfilerContext>, source: Box<dyn SampleSource>) -> Self {
        Self {
            context,
            source,
            poll_interval: POLL_INTERVAL,
            stats: IngestStats::default(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Drain everything currently available
    pub fn drain_once(&mut self) -> Result<usize> {
        let context = &self.context;
        let stats = &mut self.stats;
        let delivered = self.source.poll(&mut |sample| {
            if context.ingest(&sample).is_failed() {
                stats.failed += 1;
            }
        })?;

        self.stats.samples += delivered as u64;
        self.stats.polls += 1;
        self.stats.lost = self.source.lost();
        self.context.set_lost(self.stats.lost);
        Ok(delivered)
    }

    /// Poll until the context's stop flag is raised
    ///
    /// A final drain after the stop picks up samples already buffered.
    pub fn run(mut self) -> Result<IngestStats> {
        info!(source = self.source.name(), "ingestion loop started");
        while !self.context.is_stopping() {
            let delivered = self.drain_once()?;
            if delivered > 0 {
                debug!(delivered, "drained samples");
            }
            std::thread::sleep(self.poll_interval);
        }
        self.drain_once()?;

        info!(
            samples = self.stats.samples,
            failed = self.stats.failed,
            lost = self.stats.lost,
            "ingestion loop stopped"
        );
        Ok(self.stats)
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }
}
