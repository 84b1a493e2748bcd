/*!
 * CSV Sink
 * One header, then an ALL row and per-process rows per interval
 */

use super::traits::RenderSink;
use crate::core::errors::RenderError;
use crate::ranking::{ColumnOrder, IntervalView, ProcessOrder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub struct CsvSink<W: Write + Send> {
    out: W,
    rows_written: u64,
}

impl CsvSink<BufWriter<File>> {
    /// Create `path` and write the header row
    pub fn create<S: AsRef<str>>(path: &Path, columns: &[S]) -> Result<Self, RenderError> {
        let file = File::create(path).map_err(|e| RenderError::CsvCreate {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(path = %path.display(), columns = columns.len(), "writing CSV output");
        Self::new(BufWriter::new(file), columns)
    }
}

impl<W: Write + Send> CsvSink<W> {
    pub fn new<S: AsRef<str>>(mut out: W, columns: &[S]) -> Result<Self, RenderError> {
        write!(out, "interval,pid,name")?;
        for column in columns {
            write!(out, ",{}", column.as_ref())?;
        }
        writeln!(out)?;
        Ok(Self {
            out,
            rows_written: 0,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> RenderSink for CsvSink<W> {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn column_order(&self) -> ColumnOrder {
        ColumnOrder::Domain
    }

    fn process_order(&self) -> ProcessOrder {
        ProcessOrder::Slot
    }

    fn render(&mut self, view: &IntervalView) -> Result<(), RenderError> {
        let out = &mut self.out;

        write!(out, "{},ALL,ALL", view.interval)?;
        for column in &view.columns {
            write!(out, ",{:.6}", column.percent)?;
        }
        writeln!(out)?;
        self.rows_written += 1;

        for process in &view.processes {
            write!(out, "{},{},{}", view.interval, process.pid, process.name)?;
            for value in &process.values {
                write!(out, ",{:.6}", value)?;
            }
            writeln!(out)?;
            self.rows_written += 1;
        }
        if !view.processes.is_empty() {
            writeln!(out)?;
        }

        out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.out.flush()?;
        Ok(())
    }
}
