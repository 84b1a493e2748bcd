/*!
 * Render Traits
 * Output sinks consuming interval snapshots
 */

use crate::core::errors::RenderError;
use crate::ranking::{ColumnOrder, IntervalView, ProcessOrder};

/// User navigation delivered to interactive sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    ScrollLeft,
    ScrollRight,
    ScrollUp,
    ScrollDown,
    Resume,
}

/// Consumer of finalized intervals
///
/// `render` is called with the profiler lock held, once per interval.
pub trait RenderSink: Send {
    fn name(&self) -> &'static str;

    /// Column selection this sink wants in its views
    fn column_order(&self) -> ColumnOrder;

    /// Process selection this sink wants in its views
    fn process_order(&self) -> ProcessOrder;

    fn render(&mut self, view: &IntervalView) -> Result<(), RenderError>;

    /// Apply a navigation command; non-interactive sinks ignore it
    fn handle_command(&mut self, _command: ViewCommand) -> Result<(), RenderError> {
        Ok(())
    }

    /// Whether this sink wants keyboard input
    fn handles_input(&self) -> bool {
        false
    }

    /// Flush and release output resources
    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}
