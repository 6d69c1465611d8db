//! Receive loop: reads server lines and dispatches them to callbacks.
//!
//! The loop runs on its own thread for the lifetime of a connection. It moves
//! through [`LoopState::Running`], [`LoopState::Stopping`] and
//! [`LoopState::Stopped`]; the last transition is announced on a condition
//! variable so callers can wait for it instead of sleeping.

use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::RECEIVE_TARGET;
use crate::message::Message;
use crate::registry::{CallbackAction, TagRegistry};
use crate::transport::LineReader;

/// Phase of a connection's receive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Reading and dispatching lines.
    Running,
    /// Asked to stop; no further callbacks are invoked.
    Stopping,
    /// The loop has exited.
    Stopped,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoopExit {
    /// The client closed the connection.
    Closed,
    /// The stream ended or failed underneath the loop.
    Lost(String),
}

#[derive(Debug)]
struct MonitorState {
    phase: LoopState,
    exit: Option<LoopExit>,
}

/// Shared view of the loop's phase, written by both the loop and the client.
#[derive(Debug)]
pub(crate) struct LoopMonitor {
    state: Mutex<MonitorState>,
    stopped: Condvar,
}

impl LoopMonitor {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MonitorState {
                phase: LoopState::Running,
                exit: None,
            }),
            stopped: Condvar::new(),
        }
    }

    pub(crate) fn phase(&self) -> LoopState {
        self.lock().phase
    }

    pub(crate) fn is_running(&self) -> bool {
        self.phase() == LoopState::Running
    }

    pub(crate) fn exit(&self) -> Option<LoopExit> {
        self.lock().exit.clone()
    }

    /// Moves a running loop to `Stopping` on behalf of the client.
    pub(crate) fn request_stop(&self) {
        let mut state = self.lock();
        if state.phase == LoopState::Running {
            state.phase = LoopState::Stopping;
            state.exit = Some(LoopExit::Closed);
        }
    }

    /// Records the loop's exit and wakes every waiter.
    fn finish(&self, exit: LoopExit) {
        let mut state = self.lock();
        if state.phase == LoopState::Running {
            state.phase = LoopState::Stopping;
        }
        let exit = state.exit.get_or_insert(exit).clone();
        state.phase = LoopState::Stopped;
        drop(state);
        self.stopped.notify_all();
        match exit {
            LoopExit::Closed => info!(target: RECEIVE_TARGET, "receive loop stopped"),
            LoopExit::Lost(reason) => {
                info!(target: RECEIVE_TARGET, reason = %reason, "connection lost");
            }
        }
    }

    /// Blocks until the loop is stopped or `timeout` elapses.
    pub(crate) fn wait_stopped(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (state, _) = self
            .stopped
            .wait_timeout_while(guard, timeout, |state| state.phase != LoopState::Stopped)
            .unwrap_or_else(|poison| poison.into_inner());
        state.phase == LoopState::Stopped
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Starts the receive loop on a dedicated thread.
pub(crate) fn spawn<R>(
    reader: LineReader<R>,
    registry: Arc<TagRegistry>,
    monitor: Arc<LoopMonitor>,
) -> io::Result<thread::JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(String::from("urbi-receive"))
        .spawn(move || run(reader, &registry, &monitor))
}

/// Reads and dispatches lines until the stream ends or a stop is requested.
pub(crate) fn run<R: Read>(
    mut reader: LineReader<R>,
    registry: &TagRegistry,
    monitor: &LoopMonitor,
) {
    info!(target: RECEIVE_TARGET, "receive loop running");
    let exit = loop {
        if !monitor.is_running() {
            break LoopExit::Closed;
        }
        match reader.read_line() {
            // A close requested while the read was parked wins over the line.
            Ok(_) if !monitor.is_running() => break LoopExit::Closed,
            Ok(line) => dispatch(registry, &Message::parse(line)),
            Err(_) if !monitor.is_running() => break LoopExit::Closed,
            Err(error) => break LoopExit::Lost(error.to_string()),
        }
    };
    // No callback runs after this point; releasing them closes any channels
    // they captured before waiters are woken.
    registry.clear();
    monitor.finish(exit);
}

fn dispatch(registry: &TagRegistry, message: &Message) {
    debug!(target: RECEIVE_TARGET, tag = ?message.tag(), line = message.raw(), "line received");
    let Some(callback) = registry.resolve(message.tag()) else {
        debug!(target: RECEIVE_TARGET, tag = ?message.tag(), "no callback registered; message dropped");
        return;
    };

    match panic::catch_unwind(AssertUnwindSafe(|| callback.on_message(message))) {
        Ok(Ok(CallbackAction::Continue)) => {}
        Ok(Ok(CallbackAction::Remove)) => {
            if registry.remove_resolved(message.tag(), &callback) {
                debug!(target: RECEIVE_TARGET, tag = ?message.tag(), "callback unregistered itself");
            }
        }
        Ok(Err(error)) => {
            warn!(
                target: RECEIVE_TARGET,
                tag = ?message.tag(),
                error = %error,
                "callback failed"
            );
        }
        Err(_) => {
            warn!(target: RECEIVE_TARGET, tag = ?message.tag(), "callback panicked");
        }
    }
}
