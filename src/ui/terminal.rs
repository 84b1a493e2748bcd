/*!
 * Terminal Sink
 * Live table on an alternate screen with pause and scroll
 *
 * Arrow keys freeze the current view (ordering and values) and scroll it;
 * `r` resumes live updates. While paused, new intervals are still stored
 * and become visible on resume.
 */

use super::traits::{RenderSink, ViewCommand};
use crate::core::errors::RenderError;
use crate::core::limits::{COLUMN_WIDTH, NAME_COLUMN_WIDTH, PID_COLUMN_WIDTH};
use crate::ranking::{ColumnOrder, IntervalView, ProcessOrder};
use crossterm::{
    cursor, queue,
    style::Print,
    terminal::{self, disable_raw_mode, enable_raw_mode, ClearType},
};
use std::fmt::Write as _;
use std::io::{self, Stdout, Write};

const PAUSED_HINT: &str = "Press 'r' to resume";
const LIVE_HINT: &str = "Press an arrow key to pause";

/// Visible area and static header values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    pub sample_period: u64,
    pub interval_ms: u64,
    pub debug: bool,
}

impl Layout {
    fn fixed_width(&self) -> usize {
        let debug = if self.debug { 2 * COLUMN_WIDTH } else { 0 };
        PID_COLUMN_WIDTH + 1 + NAME_COLUMN_WIDTH + debug
    }

    /// Data columns that fit beside the pid and name columns
    pub fn visible_columns(&self) -> usize {
        (self.width.saturating_sub(self.fixed_width()) / COLUMN_WIDTH).max(1)
    }

    /// Lines left for process rows after the headers and the ALL row
    pub fn visible_processes(&self) -> usize {
        let header = if self.debug { 4 } else { 3 };
        self.height.saturating_sub(header)
    }
}

/// Scroll position within a frozen view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scroll {
    pub column: usize,
    pub row: usize,
}

/// Format one screen; pure so it can be checked without a TTY
pub fn format_view(view: &IntervalView, layout: &Layout, scroll: Scroll, paused: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(layout.height);
    lines.push(format!(
        "Sample Rate: {} | Interval Time: {} | {}",
        layout.sample_period,
        layout.interval_ms,
        if paused { PAUSED_HINT } else { LIVE_HINT }
    ));
    if layout.debug {
        lines.push(format!(
            "Interval: {} | Samples: {} | Failed: {:.2}% | Lost: {}",
            view.interval, view.num_samples, view.failed_percent, view.lost
        ));
    }

    let first = scroll.column.min(view.columns.len().saturating_sub(1));
    let last = (first + layout.visible_columns()).min(view.columns.len());
    let columns = first..last;

    let mut header = format!(
        "{:>pid$} {:<name$}",
        "PID",
        "NAME",
        pid = PID_COLUMN_WIDTH,
        name = NAME_COLUMN_WIDTH
    );
    if layout.debug {
        let _ = write!(header, "{:>w$}{:>w$}", "SAMP%", "FAIL%", w = COLUMN_WIDTH);
    }
    for column in &view.columns[columns.clone()] {
        let name: String = column.name.chars().take(COLUMN_WIDTH - 1).collect();
        let _ = write!(header, "{:>w$}", name, w = COLUMN_WIDTH);
    }
    lines.push(header);

    let mut all = format!("{:>pid$} {:<name$}", "ALL", "ALL", pid = PID_COLUMN_WIDTH, name = NAME_COLUMN_WIDTH);
    if layout.debug {
        let _ = write!(all, "{:>w$.2}{:>w$.2}", 100.0, view.failed_percent, w = COLUMN_WIDTH);
    }
    for column in &view.columns[columns.clone()] {
        let _ = write!(all, "{:>w$.2}", column.percent, w = COLUMN_WIDTH);
    }
    lines.push(all);

    let skip = scroll.row.min(view.processes.len().saturating_sub(1));
    for process in view.processes.iter().skip(skip).take(layout.visible_processes()) {
        let name: String = process.name.chars().take(NAME_COLUMN_WIDTH).collect();
        let mut line = format!(
            "{:>pid$} {:<name$}",
            process.pid,
            name,
            pid = PID_COLUMN_WIDTH,
            name = NAME_COLUMN_WIDTH
        );
        if layout.debug {
            let _ = write!(
                line,
                "{:>w$.2}{:>w$.2}",
                process.sample_percent,
                process.failed_percent,
                w = COLUMN_WIDTH
            );
        }
        for value in process.values.get(columns.clone()).unwrap_or_default() {
            let _ = write!(line, "{:>w$.2}", value, w = COLUMN_WIDTH);
        }
        lines.push(line);
    }

    lines
}

/// Live/paused display state, independent of the terminal
#[derive(Debug, Default)]
pub struct PauseState {
    latest: Option<IntervalView>,
    frozen: Option<IntervalView>,
    scroll: Scroll,
}

impl PauseState {
    pub fn is_paused(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn scroll(&self) -> Scroll {
        self.scroll
    }

    /// View currently on screen
    pub fn displayed(&self) -> Option<&IntervalView> {
        self.frozen.as_ref().or(self.latest.as_ref())
    }

    /// Store a new interval; returns whether the screen should redraw
    pub fn update(&mut self, view: &IntervalView) -> bool {
        self.latest = Some(view.clone());
        !self.is_paused()
    }

    /// Apply a key command; any scroll freezes the current view
    pub fn apply(&mut self, command: ViewCommand) {
        if command == ViewCommand::Resume {
            self.frozen = None;
            self.scroll = Scroll::default();
            return;
        }

        if self.frozen.is_none() {
            self.frozen = self.latest.clone();
        }
        let (columns, rows) = self
            .frozen
            .as_ref()
            .map(|v| (v.columns.len(), v.processes.len()))
            .unwrap_or_default();

        match command {
            ViewCommand::ScrollLeft => self.scroll.column = self.scroll.column.saturating_sub(1),
            ViewCommand::ScrollRight => {
                self.scroll.column = (self.scroll.column + 1).min(columns.saturating_sub(1))
            }
            ViewCommand::ScrollUp => self.scroll.row = self.scroll.row.saturating_sub(1),
            ViewCommand::ScrollDown => {
                self.scroll.row = (self.scroll.row + 1).min(rows.saturating_sub(1))
            }
            ViewCommand::Resume => {}
        }
    }
}

pub struct TerminalSink {
    out: Stdout,
    sample_period: u64,
    interval_ms: u64,
    debug: bool,
    state: PauseState,
    active: bool,
}

impl TerminalSink {
    /// Enter raw mode on the alternate screen
    pub fn new(sample_period: u64, interval_ms: u64, debug: bool) -> Result<Self, RenderError> {
        enable_raw_mode().map_err(|e| RenderError::Terminal(e.to_string()))?;
        let mut out = io::stdout();
        if let Err(e) = crossterm::execute!(out, terminal::EnterAlternateScreen, cursor::Hide) {
            let _ = disable_raw_mode();
            return Err(RenderError::Terminal(e.to_string()));
        }
        Ok(Self {
            out,
            sample_period,
            interval_ms,
            debug,
            state: PauseState::default(),
            active: true,
        })
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    fn layout(&self) -> Layout {
        let (width, height) = terminal::size().unwrap_or((80, 24));
        Layout {
            width: usize::from(width),
            height: usize::from(height),
            sample_period: self.sample_period,
            interval_ms: self.interval_ms,
            debug: self.debug,
        }
    }

    fn draw(&mut self) -> Result<(), RenderError> {
        let layout = self.layout();
        let Some(view) = self.state.displayed() else {
            return Ok(());
        };
        let lines = format_view(view, &layout, self.state.scroll(), self.state.is_paused());

        queue!(self.out, terminal::Clear(ClearType::All))?;
        for (y, line) in lines.iter().take(layout.height).enumerate() {
            let line: String = line.chars().take(layout.width).collect();
            queue!(self.out, cursor::MoveTo(0, y as u16), Print(line))?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn restore(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let _ = crossterm::execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

impl RenderSink for TerminalSink {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn column_order(&self) -> ColumnOrder {
        ColumnOrder::ByPercent
    }

    fn process_order(&self) -> ProcessOrder {
        ProcessOrder::BySamples
    }

    fn render(&mut self, view: &IntervalView) -> Result<(), RenderError> {
        if self.state.update(view) {
            self.draw()?;
        }
        Ok(())
    }

    fn handle_command(&mut self, command: ViewCommand) -> Result<(), RenderError> {
        self.state.apply(command);
        self.draw()
    }

    fn handles_input(&self) -> bool {
        true
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.restore();
        Ok(())
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        self.restore();
    }
}
