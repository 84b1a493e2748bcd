/*!
 * Pipeline Tests
 * Transport to ingestion to scheduler, end to end
 */

use crate::common::{
    fixture_context, sample, RecordingSink, ARITHMETIC_INSN, CONTROL_FLOW_INSN, GARBAGE_INSN,
};
use insnmix::core::types::Dimension;
use insnmix::ranking::{ColumnFilter, Ranker};
use insnmix::sampling::{sample_channel, IngestionLoop};
use insnmix::scheduler::{IntervalScheduler, IntervalTask, RunBounds, StopReason};
use std::sync::Arc;
use std::time::Duration;

fn ranker() -> Ranker {
    Ranker::new(Dimension::Category, ColumnFilter::all())
}

#[test]
fn test_two_process_interval() {
    let context = fixture_context();
    let (tx, source) = sample_channel(4096);
    for _ in 0..1000 {
        assert!(tx.publish(sample(42, "worker", ARITHMETIC_INSN)));
    }
    for _ in 0..500 {
        assert!(tx.publish(sample(43, "idle", CONTROL_FLOW_INSN)));
    }

    let mut ingest = IngestionLoop::new(Arc::clone(&context), Box::new(source));
    assert_eq!(ingest.drain_once().unwrap(), 1500);

    let sink = RecordingSink::default();
    let mut scheduler = IntervalScheduler::new(
        Arc::clone(&context),
        Box::new(sink.clone()),
        ranker(),
        Duration::from_millis(2000),
    );
    scheduler.tick().unwrap();

    {
        let views = sink.views.lock();
        let view = &views[0];
        assert_eq!(view.num_samples, 1500);

        let arithmetic = &view.columns[0];
        let control = &view.columns[1];
        assert_eq!(arithmetic.name, "ARITHMETIC");
        assert_eq!(control.name, "CONTROL_FLOW");
        assert!((arithmetic.percent - 66.67).abs() < 0.01);
        assert!((control.percent - 33.33).abs() < 0.01);

        assert_eq!(view.processes[0].pid, 42);
        assert_eq!(view.processes[1].pid, 43);
        assert_eq!(view.processes[0].values[0], 100.0);
        assert_eq!(view.processes[1].values[1], 100.0);
    }

    // next interval has nothing in it
    scheduler.tick().unwrap();
    let views = sink.views.lock();
    assert_eq!(views[1].num_samples, 0);
    assert!(views[1].columns.is_empty());
    assert!(views[1].processes.is_empty());
    assert_eq!(views[1].interval, 1);
}

#[test]
fn test_failed_samples_count_in_denominator() {
    let context = fixture_context();
    for _ in 0..3 {
        context.ingest(&sample(9, "jit", ARITHMETIC_INSN));
    }
    context.ingest(&sample(9, "jit", GARBAGE_INSN));

    let sink = RecordingSink::default();
    let mut scheduler =
        IntervalScheduler::new(Arc::clone(&context), Box::new(sink.clone()), ranker(), Duration::from_secs(1));
    scheduler.tick().unwrap();

    let views = sink.views.lock();
    assert_eq!(views[0].num_failed, 1);
    assert_eq!(views[0].failed_percent, 25.0);
    assert_eq!(views[0].columns[0].percent, 75.0);
    assert_eq!(views[0].processes[0].failed_percent, 25.0);
}

#[test]
fn test_renamed_pid_shows_latest_name() {
    let context = fixture_context();
    context.ingest(&sample(5, "sh", ARITHMETIC_INSN));
    context.ingest(&sample(5, "cc1", ARITHMETIC_INSN));

    let sink = RecordingSink::default();
    let mut scheduler =
        IntervalScheduler::new(Arc::clone(&context), Box::new(sink.clone()), ranker(), Duration::from_secs(1));
    scheduler.tick().unwrap();

    let views = sink.views.lock();
    assert_eq!(views[0].processes.len(), 1);
    assert_eq!(views[0].processes[0].name.as_str(), "cc1");
    assert_eq!(context.read().registry.len(), 2);
}

#[tokio::test]
async fn test_concurrent_run_counts_every_sample_once() {
    let context = fixture_context();
    let (tx, source) = sample_channel(8192);

    let ingest = IngestionLoop::new(Arc::clone(&context), Box::new(source))
        .with_poll_interval(Duration::from_millis(2));
    let ingestion = tokio::task::spawn_blocking(move || ingest.run());

    let sink = RecordingSink::default();
    let scheduler = IntervalScheduler::new(
        Arc::clone(&context),
        Box::new(sink.clone()),
        ranker(),
        Duration::from_millis(15),
    )
    .with_bounds(RunBounds {
        max_intervals: Some(4),
        runtime: None,
    })
    .with_ingestion(ingestion);
    let task = IntervalTask::spawn(scheduler);

    let producer = std::thread::spawn(move || {
        for i in 0..3000u32 {
            let insn = if i % 3 == 0 { CONTROL_FLOW_INSN } else { ARITHMETIC_INSN };
            tx.publish(sample(100 + i % 7, "load", insn));
            if i % 500 == 0 {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    });
    producer.join().unwrap();

    let report = task.join().await.unwrap();
    assert_eq!(report.reason, StopReason::IntervalLimit);
    assert_eq!(report.intervals, 4);
    let ingest = report.ingest.unwrap();
    assert_eq!(ingest.samples, 3000);
    assert_eq!(ingest.lost, 0);

    let state = context.read();
    let lifetime = &state.store.lifetime().system;
    assert_eq!(lifetime.num_samples(), 3000);
    assert_eq!(lifetime.count(Dimension::Category, 1), 1000);

    // everything rendered plus whatever arrived after the last boundary
    let rendered: u64 = sink.views.lock().iter().map(|v| v.num_samples).sum();
    let pending = state.store.interval().system.num_samples();
    assert_eq!(rendered + pending, 3000);
}
