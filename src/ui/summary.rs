/*!
 * Run Summary
 * Lifetime totals printed after the interactive view is torn down
 */

use crate::core::limits::{COLUMN_WIDTH, NAME_COLUMN_WIDTH, PID_COLUMN_WIDTH};
use crate::ranking::IntervalView;
use std::io::{self, Write};

/// Write the top columns and processes of a lifetime view
pub fn write_summary<W: Write>(out: &mut W, view: &IntervalView, top_n: usize) -> io::Result<()> {
    writeln!(
        out,
        "Lifetime: {} intervals | {} samples | {:.2}% failed | {} lost",
        view.interval, view.num_samples, view.failed_percent, view.lost
    )?;
    if view.is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "Top {}s:", view.dimension)?;
    for column in view.columns.iter().take(top_n) {
        writeln!(
            out,
            "  {:<name$} {:>w$.2}% {:>12}",
            column.name,
            column.percent,
            column.count,
            name = NAME_COLUMN_WIDTH,
            w = COLUMN_WIDTH
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Top processes:")?;
    for process in view.processes.iter().take(top_n) {
        writeln!(
            out,
            "  {:>pid$} {:<name$} {:>12} {:>w$.2}%",
            process.pid,
            process.name,
            process.num_samples,
            process.sample_percent,
            pid = PID_COLUMN_WIDTH,
            name = NAME_COLUMN_WIDTH,
            w = COLUMN_WIDTH
        )?;
    }
    out.flush()
}
