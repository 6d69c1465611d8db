//! Error types surfaced by the client.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`crate::Client`] operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server host name did not resolve to a usable address.
    #[error("failed to resolve server address {endpoint}: {source}")]
    Resolve {
        /// Endpoint as configured.
        endpoint: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// The server refused the connection or could not be reached.
    #[error("failed to connect to server at {endpoint}: {source}")]
    Connect {
        /// Endpoint as configured.
        endpoint: String,
        /// Error from the last address tried.
        #[source]
        source: io::Error,
    },
    /// A Unix socket endpoint was configured on a platform without them.
    #[cfg(not(unix))]
    #[error("platform does not support Unix sockets: {0}")]
    UnsupportedUnixTransport(String),
    /// The receive loop thread could not be started.
    #[error("failed to start receive loop: {0}")]
    SpawnReceiver(#[source] io::Error),
    /// Writing a command to the server failed.
    #[error("failed to send command to server: {0}")]
    Send(#[source] io::Error),
    /// A command file could not be read before upload.
    #[error("failed to read command file {path:?}: {source}")]
    ReadFile {
        /// File that was being uploaded.
        path: PathBuf,
        /// Filesystem error.
        #[source]
        source: io::Error,
    },
    /// The connection was closed locally or lost.
    #[error("connection to server is closed")]
    Closed,
}

impl ClientError {
    /// Whether the error indicates that no server is listening at the endpoint.
    ///
    /// Returns true for connection-refused, socket-not-found, and
    /// address-unavailable errors.
    #[must_use]
    pub fn is_server_unavailable(&self) -> bool {
        match self {
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::NotFound
                    | io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}

/// Failure of a blocking line read.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The peer closed the stream.
    #[error("connection closed by server")]
    Eof,
    /// The stream failed mid-read.
    #[error("failed to read from server: {0}")]
    Io(#[from] io::Error),
}
