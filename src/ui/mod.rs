/*!
 * UI Module
 * Render sinks for finalized intervals and the end-of-run summary
 */

pub mod csv;
pub mod summary;
pub mod terminal;
pub mod traits;

pub use csv::CsvSink;
pub use summary::write_summary;
pub use terminal::{Layout, TerminalSink};
pub use traits::{RenderSink, ViewCommand};
