/*!
 * Control Input
 * OS signals and keyboard events delivered as scheduler commands
 */

use super::types::{IntervalCommand, StopReason};
use crate::context::ProfilerContext;
use crate::core::limits::INPUT_POLL_INTERVAL;
use crate::ui::ViewCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Forward SIGINT and SIGTERM as a stop command
pub fn spawn_signal_listener(commands: UnboundedSender<IntervalCommand>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        let _ = commands.send(IntervalCommand::Stop(StopReason::Signal));
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "could not install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Translate a key press into a command
///
/// Raw mode swallows SIGINT, so Ctrl-C is handled here as well.
pub fn map_key(key: KeyEvent) -> Option<IntervalCommand> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let command = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            IntervalCommand::Stop(StopReason::Signal)
        }
        KeyCode::Left => IntervalCommand::View(ViewCommand::ScrollLeft),
        KeyCode::Right => IntervalCommand::View(ViewCommand::ScrollRight),
        KeyCode::Up => IntervalCommand::View(ViewCommand::ScrollUp),
        KeyCode::Down => IntervalCommand::View(ViewCommand::ScrollDown),
        KeyCode::Char('r') | KeyCode::Char('R') => IntervalCommand::View(ViewCommand::Resume),
        KeyCode::Char('q') | KeyCode::Char('Q') => IntervalCommand::Stop(StopReason::User),
        _ => return None,
    };
    Some(command)
}

/// Read keys on a dedicated thread until the profiler stops
pub fn spawn_key_reader(
    context: Arc<ProfilerContext>,
    commands: UnboundedSender<IntervalCommand>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("insnmix-input".into())
        .spawn(move || {
            while !context.is_stopping() {
                match event::poll(INPUT_POLL_INTERVAL) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        warn!(error = %e, "keyboard poll failed");
                        break;
                    }
                }
                let Ok(Event::Key(key)) = event::read() else {
                    continue;
                };
                if let Some(command) = map_key(key) {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
            }
            debug!("keyboard reader stopped");
        })
}
