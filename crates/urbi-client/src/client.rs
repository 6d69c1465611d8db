//! Client facade composing transport, sender, registry, and receive loop.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use urbi_config::ServerEndpoint;

use crate::CLIENT_TARGET;
use crate::errors::ClientError;
use crate::receiver::{self, LoopExit, LoopMonitor, LoopState};
use crate::registry::{Callback, TagRegistry};
use crate::sender::CommandSender;
use crate::transport::{self, Connection, StreamCloser, Transport};

/// Prefix of tags handed out by [`Client::fresh_tag`].
pub const FRESH_TAG_PREFIX: &str = "URBI_";

/// Observable state of a client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Connected; commands can be sent.
    Open,
    /// Closed by [`Client::close`].
    Closed,
    /// The server closed the stream or it failed.
    Lost {
        /// Description of the failure seen by the receive loop.
        reason: String,
    },
}

/// Connection to an Urbi server.
///
/// Connecting starts a background receive loop that dispatches each incoming
/// line to the callback registered for its tag, or to the wildcard callback.
/// Sending never waits for replies; correlate them by tag.
///
/// Once the server closes the stream, [`Client::status`] reports
/// [`ConnectionStatus::Lost`] and [`Client::send`] fails with
/// [`ClientError::Closed`]. Registered callbacks are dropped when the receive
/// loop stops, whether through loss or [`Client::close`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::mpsc;
/// use std::time::Duration;
///
/// use urbi_client::{CallbackAction, CallbackResult, Client, Message};
/// use urbi_config::ServerEndpoint;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::connect(&ServerEndpoint::tcp("localhost", 54000))?;
/// let (replies, inbox) = mpsc::channel();
/// client.send_command("1 + 1;", move |message: &Message| -> CallbackResult {
///     replies.send(message.payload().to_owned())?;
///     Ok(CallbackAction::Remove)
/// })?;
/// let reply = inbox.recv_timeout(Duration::from_secs(1))?;
/// println!("{reply}");
/// client.close();
/// # Ok(())
/// # }
/// ```
pub struct Client {
    endpoint: ServerEndpoint,
    registry: Arc<TagRegistry>,
    monitor: Arc<LoopMonitor>,
    sender: Mutex<Option<CommandSender<Connection>>>,
    closer: StreamCloser,
    receiver: Mutex<Option<thread::JoinHandle<()>>>,
    tag_counter: AtomicU64,
}

impl Client {
    /// Connects to `endpoint` and starts the receive loop.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Resolve`] or [`ClientError::Connect`] when the
    /// server cannot be reached. No receive loop is started in that case.
    pub fn connect(endpoint: &ServerEndpoint) -> Result<Self, ClientError> {
        let Transport {
            reader,
            writer,
            closer,
        } = transport::open(endpoint)?;
        let registry = Arc::new(TagRegistry::new());
        let monitor = Arc::new(LoopMonitor::new());
        let handle = match receiver::spawn(reader, Arc::clone(&registry), Arc::clone(&monitor)) {
            Ok(handle) => handle,
            Err(source) => {
                closer.close();
                return Err(ClientError::SpawnReceiver(source));
            }
        };
        info!(target: CLIENT_TARGET, endpoint = %endpoint, "client connected");

        Ok(Self {
            endpoint: endpoint.clone(),
            registry,
            monitor,
            sender: Mutex::new(Some(CommandSender::new(writer))),
            closer,
            receiver: Mutex::new(Some(handle)),
            tag_counter: AtomicU64::new(0),
        })
    }

    /// Endpoint this client connected to.
    #[must_use]
    pub const fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Sends `command`, prefixed with `tag` when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] after [`Client::close`] or once the
    /// connection has been lost, and [`ClientError::Send`] when the write
    /// fails.
    pub fn send(&self, command: &str, tag: Option<&str>) -> Result<(), ClientError> {
        self.with_sender(|sender| sender.send(command, tag))
    }

    /// Sends `command` under a fresh tag with `callback` registered for it.
    ///
    /// Returns the tag so the caller can remove the callback later; a
    /// callback that answers once can return [`CallbackAction::Remove`](crate::CallbackAction::Remove)
    /// instead.
    ///
    /// # Errors
    ///
    /// Same as [`Client::send`]. The registration is removed again when the
    /// send fails.
    pub fn send_command<C: Callback>(
        &self,
        command: &str,
        callback: C,
    ) -> Result<String, ClientError> {
        let tag = self.fresh_tag();
        self.set_callback(tag.as_str(), callback);
        if let Err(error) = self.send(command, Some(&tag)) {
            self.registry.remove(&tag);
            return Err(error);
        }
        Ok(tag)
    }

    /// Uploads the contents of a script file verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ReadFile`] when the file cannot be read, and the
    /// same errors as [`Client::send`] otherwise.
    pub fn send_file(&self, path: &Path) -> Result<(), ClientError> {
        let script = fs::read(path).map_err(|source| ClientError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        self.with_sender(|sender| sender.send_raw(&script))
    }

    /// Registers `callback` for messages tagged `tag`, replacing any previous
    /// registration. The empty tag addresses the wildcard slot.
    pub fn set_callback<C: Callback>(&self, tag: impl Into<String>, callback: C) {
        self.registry.register(tag, Arc::new(callback));
    }

    /// Registers the callback for messages no exact registration matches.
    pub fn set_wildcard_callback<C: Callback>(&self, callback: C) {
        self.registry.register_wildcard(Arc::new(callback));
    }

    /// Removes the callback registered for `tag`. Returns whether one existed.
    pub fn remove_callback(&self, tag: &str) -> bool {
        self.registry.remove(tag)
    }

    /// Removes the wildcard callback. Returns whether one existed.
    pub fn clear_wildcard_callback(&self) -> bool {
        self.registry.clear_wildcard()
    }

    /// Returns a tag unique to this client, such as `URBI_1`.
    pub fn fresh_tag(&self) -> String {
        let serial = self.tag_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{FRESH_TAG_PREFIX}{serial}")
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        if lock(&self.sender).is_none() {
            return ConnectionStatus::Closed;
        }
        match self.monitor.exit() {
            None => ConnectionStatus::Open,
            Some(LoopExit::Closed) => ConnectionStatus::Closed,
            Some(LoopExit::Lost(reason)) => ConnectionStatus::Lost { reason },
        }
    }

    /// Whether commands can currently be sent.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status() == ConnectionStatus::Open
    }

    /// Phase of the receive loop.
    #[must_use]
    pub fn receive_state(&self) -> LoopState {
        self.monitor.phase()
    }

    /// Blocks until the receive loop has stopped or `timeout` elapses.
    ///
    /// Returns whether the loop stopped.
    pub fn wait_for_disconnect(&self, timeout: Duration) -> bool {
        self.monitor.wait_stopped(timeout)
    }

    /// Stops the receive loop and releases the connection.
    ///
    /// Further sends fail with [`ClientError::Closed`]. Closing twice is a
    /// no-op. Calling this from a callback stops the loop once the callback
    /// returns.
    pub fn close(&self) {
        // Shut the socket down first so a writer blocked on backpressure
        // releases the sender lock.
        self.monitor.request_stop();
        self.closer.close();
        if lock(&self.sender).take().is_some() {
            info!(target: CLIENT_TARGET, endpoint = %self.endpoint, "client closed");
        }

        let Some(handle) = lock(&self.receiver).take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!(target: CLIENT_TARGET, "receive loop thread panicked");
        }
    }

    fn with_sender<F>(&self, write: F) -> Result<(), ClientError>
    where
        F: FnOnce(&mut CommandSender<Connection>) -> std::io::Result<()>,
    {
        let mut guard = lock(&self.sender);
        let Some(sender) = guard.as_mut() else {
            return Err(ClientError::Closed);
        };
        if !self.monitor.is_running() {
            return Err(ClientError::Closed);
        }
        write(sender).map_err(ClientError::Send)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("status", &self.status())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}
