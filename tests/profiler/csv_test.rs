/*!
 * CSV Output Tests
 * File layout produced across interval boundaries
 */

use crate::common::{fixture_context, sample, ARITHMETIC_INSN, CONTROL_FLOW_INSN};
use insnmix::core::types::Dimension;
use insnmix::ranking::{ColumnFilter, Ranker};
use insnmix::scheduler::IntervalScheduler;
use insnmix::ui::CsvSink;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_csv_intervals() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mix.csv");
    let context = fixture_context();

    let sink = CsvSink::create(&path, context.domains().names(Dimension::Category)).unwrap();
    let mut scheduler = IntervalScheduler::new(
        Arc::clone(&context),
        Box::new(sink),
        // filters only apply to the interactive view
        Ranker::new(
            Dimension::Category,
            ColumnFilter::resolve(context.domains(), Dimension::Category, &["CONTROL".to_string()]),
        ),
        Duration::from_secs(2),
    );

    for _ in 0..1000 {
        context.ingest(&sample(42, "worker", ARITHMETIC_INSN));
    }
    for _ in 0..500 {
        context.ingest(&sample(43, "idle", CONTROL_FLOW_INSN));
    }
    scheduler.tick().unwrap();
    scheduler.tick().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "interval,pid,name,ARITHMETIC,CONTROL_FLOW\n\
         0,ALL,ALL,66.666667,33.333333\n\
         0,42,worker,100.000000,0.000000\n\
         0,43,idle,0.000000,100.000000\n\
         \n\
         1,ALL,ALL,0.000000,0.000000\n"
    );
}

#[test]
fn test_every_all_row_matches_header_width() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mnemonics.csv");
    let context = fixture_context();
    let columns = context.domains().names(Dimension::Mnemonic);

    let sink = CsvSink::create(&path, columns).unwrap();
    let mut scheduler = IntervalScheduler::new(
        Arc::clone(&context),
        Box::new(sink),
        Ranker::new(Dimension::Mnemonic, ColumnFilter::all()),
        Duration::from_secs(2),
    );
    for round in 0..3 {
        for _ in 0..=round {
            context.ingest(&sample(1, "a", CONTROL_FLOW_INSN));
        }
        scheduler.tick().unwrap();
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    let header_fields = lines.next().unwrap().split(',').count();
    assert_eq!(header_fields, 3 + columns.len());

    let all_rows: Vec<&str> = lines.filter(|l| l.contains(",ALL,ALL,")).collect();
    assert_eq!(all_rows.len(), 3);
    for row in all_rows {
        assert_eq!(row.split(',').count(), header_fields);
    }
}

#[test]
fn test_unwritable_path_is_a_render_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("out.csv");
    let result = CsvSink::create(&path, &["A"]);
    assert!(matches!(
        result,
        Err(insnmix::RenderError::CsvCreate { .. })
    ));
}
