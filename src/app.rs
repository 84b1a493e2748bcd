/*!
 * Application
 * Wires the transport, context, scheduler and sinks for one run
 *
 * Startup order: options, context, transport, sink, ingestion, scheduler,
 * input. Shutdown runs in reverse through the scheduler: ingestion stops
 * first, the last interval is rendered, then the sink is released.
 */

use crate::config::{Options, OutputMode};
use crate::context::ProfilerContext;
use crate::core::errors::Result;
use crate::core::limits::SUMMARY_TOP_N;
use crate::decode::SampleClassifier;
use crate::ranking::{ColumnFilter, IntervalView, Ranker};
use crate::sampling::{open_source, ActiveSource, IngestionLoop};
use crate::scheduler::{
    spawn_key_reader, spawn_signal_listener, IntervalScheduler, IntervalTask, RunBounds,
    SchedulerReport,
};
use crate::ui::{write_summary, CsvSink, RenderSink, TerminalSink};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: SchedulerReport,
    pub lifetime: IntervalView,
}

fn open_sink(options: &Options, context: &ProfilerContext) -> Result<Box<dyn RenderSink>> {
    let sink: Box<dyn RenderSink> = match &options.output {
        OutputMode::Csv(path) => Box::new(CsvSink::create(
            path,
            context.domains().names(options.dimension),
        )?),
        OutputMode::Interactive => Box::new(TerminalSink::new(
            options.sample_period,
            options.interval_ms,
            options.debug,
        )?),
    };
    Ok(sink)
}

/// Profile until a bound is reached or a stop is requested
pub async fn run(options: Options) -> Result<RunSummary> {
    match serde_json::to_string(&options) {
        Ok(json) => info!(options = %json, "starting insnmix"),
        Err(e) => warn!(error = %e, "could not serialize options"),
    }

    let classifier = SampleClassifier::new(options.decoder);
    let context = Arc::new(ProfilerContext::new(classifier));
    let filter = ColumnFilter::resolve(context.domains(), options.dimension, &options.filters);
    let ranker = Ranker::new(options.dimension, filter);

    let ActiveSource { source, simulation } = open_source(
        options.source,
        options.decoder,
        options.sample_period,
        options.pid,
        context.classifier().max_insn_len(),
    )?;

    // Opened after the transport so a setup failure leaves the terminal alone
    let sink = open_sink(&options, &context)?;
    let interactive = sink.handles_input();

    let ingest = IngestionLoop::new(Arc::clone(&context), source);
    let ingestion = tokio::task::spawn_blocking(move || ingest.run());

    let scheduler = IntervalScheduler::new(Arc::clone(&context), sink, ranker.clone(), options.interval())
        .with_bounds(RunBounds {
            max_intervals: options.max_intervals,
            runtime: options.runtime(),
        })
        .with_ingestion(ingestion);
    let task = IntervalTask::spawn(scheduler);

    let signals = spawn_signal_listener(task.commands());
    let keys = if interactive {
        match spawn_key_reader(Arc::clone(&context), task.commands()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "keyboard input unavailable");
                None
            }
        }
    } else {
        None
    };

    let report = task.join().await;

    context.request_stop();
    signals.abort();
    if let Some(keys) = keys {
        let _ = keys.join();
    }
    drop(simulation);
    let report = report?;

    let lifetime = {
        let mut state = context.write();
        state.store.finalize_lifetime_percentages();
        ranker.lifetime_view(&state, context.domains(), context.lost())
    };
    info!(
        reason = %report.reason,
        intervals = report.intervals,
        samples = lifetime.num_samples,
        lost = lifetime.lost,
        "profiler stopped"
    );

    let mut stdout = std::io::stdout().lock();
    write_summary(&mut stdout, &lifetime, SUMMARY_TOP_N)?;

    Ok(RunSummary { report, lifetime })
}
