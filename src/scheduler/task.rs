/*!
 * Interval Scheduler Task
 * Periodic finalize, render and clear under the profiler lock
 *
 * Runs as a tokio task driven by an interval timer and a command channel.
 * Ticks, navigation and stop requests all arrive through the same loop, so
 * an interval boundary never interleaves with a scroll or a shutdown. The
 * current state is published on a watch channel.
 */

use super::types::{IntervalCommand, RunBounds, SchedulerReport, SchedulerState, StopReason};
use crate::context::ProfilerContext;
use crate::core::errors::{InsnmixError, Result};
use crate::monitoring::BoundarySpan;
use crate::ranking::Ranker;
use crate::sampling::IngestStats;
use crate::ui::RenderSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Owns the render sink and performs interval boundaries
pub struct IntervalScheduler {
    context: Arc<ProfilerContext>,
    sink: Box<dyn RenderSink>,
    ranker: Ranker,
    period: Duration,
    bounds: RunBounds,
    state: watch::Sender<SchedulerState>,
    completed: u64,
    ingestion: Option<JoinHandle<Result<IngestStats>>>,
}

impl IntervalScheduler {
    pub fn new(
        context: Arc<ProfilerContext>,
        sink: Box<dyn RenderSink>,
        ranker: Ranker,
        period: Duration,
    ) -> Self {
        Self {
            context,
            sink,
            ranker,
            period,
            bounds: RunBounds::unbounded(),
            state: watch::channel(SchedulerState::Idle).0,
            completed: 0,
            ingestion: None,
        }
    }

    pub fn with_bounds(mut self, bounds: RunBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Ingestion worker to stop and join before the final interval
    pub fn with_ingestion(mut self, handle: JoinHandle<Result<IngestStats>>) -> Self {
        self.ingestion = Some(handle);
        self
    }

    #[inline]
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Follow state changes from outside the loop
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn transition(&self, next: SchedulerState) {
        self.state.send_replace(next);
    }

    /// One interval boundary: finalize, render, clear
    ///
    /// The write lock is held across all three steps so that no sample can
    /// land between the percentage pass and the reset.
    pub fn tick(&mut self) -> Result<()> {
        let domains = self.context.domains();
        let lost = self.context.lost();
        let mut state = self.context.write();
        let boundary = BoundarySpan::new(state.store.interval_num());

        self.transition(SchedulerState::Finalizing);
        boundary.phase(SchedulerState::Finalizing.as_str());
        state.store.finalize_percentages();

        self.transition(SchedulerState::Rendering);
        boundary.phase(SchedulerState::Rendering.as_str());
        let view = self.ranker.interval_view(
            &state,
            domains,
            lost,
            self.sink.column_order(),
            self.sink.process_order(),
        );
        let rendered = self.sink.render(&view);

        self.transition(SchedulerState::Clearing);
        boundary.phase(SchedulerState::Clearing.as_str());
        state.store.clear_interval();
        drop(state);

        self.transition(SchedulerState::Idle);
        self.completed += 1;
        boundary.finish(view.num_samples);
        rendered?;

        debug!(
            interval = view.interval,
            samples = view.num_samples,
            failed = view.num_failed,
            processes = view.processes.len(),
            "interval completed"
        );
        Ok(())
    }

    /// Stop ingestion, guarantee one interval, release the sink
    async fn shutdown(&mut self, reason: StopReason) -> Result<SchedulerReport> {
        info!(%reason, intervals = self.completed, "stopping profiler");
        self.context.request_stop();

        let ingest = match self.ingestion.take() {
            Some(handle) => Some(
                handle
                    .await
                    .map_err(|e| InsnmixError::Worker(format!("ingestion loop: {}", e)))??,
            ),
            None => None,
        };

        if self.context.read().store.interval_num() == 0 {
            self.tick()?;
        }
        self.sink.finish()?;
        self.transition(SchedulerState::Terminal);

        Ok(SchedulerReport {
            intervals: self.completed,
            reason,
            ingest,
        })
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<IntervalCommand>) -> Result<SchedulerReport> {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let deadline = self.bounds.runtime.map(|runtime| Instant::now() + runtime);

        info!(
            period_ms = self.period.as_millis() as u64,
            sink = self.sink.name(),
            "interval scheduler started"
        );

        let reason = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick() {
                        self.abort_ingestion();
                        return Err(e);
                    }
                    if self.bounds.intervals_reached(self.completed) {
                        break StopReason::IntervalLimit;
                    }
                }

                _ = wait_until(deadline) => break StopReason::RuntimeElapsed,

                command = commands.recv() => match command {
                    Some(IntervalCommand::Tick) => {
                        if let Err(e) = self.tick() {
                            self.abort_ingestion();
                            return Err(e);
                        }
                        if self.bounds.intervals_reached(self.completed) {
                            break StopReason::IntervalLimit;
                        }
                    }
                    Some(IntervalCommand::View(view_command)) => {
                        if let Err(e) = self.sink.handle_command(view_command) {
                            warn!(error = %e, "view command failed");
                        }
                    }
                    Some(IntervalCommand::Stop(reason)) => break reason,
                    None => break StopReason::Disconnected,
                },
            }
        };

        self.shutdown(reason).await
    }

    fn abort_ingestion(&mut self) {
        self.context.request_stop();
        self.ingestion.take();
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Handle to the running scheduler loop
pub struct IntervalTask {
    command_tx: mpsc::UnboundedSender<IntervalCommand>,
    state: watch::Receiver<SchedulerState>,
    handle: Option<JoinHandle<Result<SchedulerReport>>>,
}

impl IntervalTask {
    pub fn spawn(scheduler: IntervalScheduler) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = scheduler.subscribe();
        let handle = tokio::spawn(scheduler.run(command_rx));
        Self {
            command_tx,
            state,
            handle: Some(handle),
        }
    }

    /// Sender for input sources (keyboard, signals)
    pub fn commands(&self) -> mpsc::UnboundedSender<IntervalCommand> {
        self.command_tx.clone()
    }

    /// Last state published by the loop
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Close the current interval now
    pub fn tick(&self) {
        let _ = self.command_tx.send(IntervalCommand::Tick);
    }

    pub fn stop(&self, reason: StopReason) {
        let _ = self.command_tx.send(IntervalCommand::Stop(reason));
    }

    /// Wait for the loop to finish on its own (bound reached or stop sent)
    pub async fn join(mut self) -> Result<SchedulerReport> {
        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| InsnmixError::Worker(format!("interval scheduler: {}", e)))?,
            None => Err(InsnmixError::Worker("interval scheduler already joined".into())),
        }
    }

    /// Stop and wait for the final report
    pub async fn shutdown(self, reason: StopReason) -> Result<SchedulerReport> {
        self.stop(reason);
        self.join().await
    }
}

impl Drop for IntervalTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.command_tx.send(IntervalCommand::Stop(StopReason::Disconnected));
        }
    }
}
