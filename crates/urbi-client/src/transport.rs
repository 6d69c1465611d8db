//! Socket transport for the client.
//!
//! The functions here establish connections to the configured server and wrap
//! the resulting streams in a uniform [`Connection`] type. An open transport is
//! split three ways: a line reader owned by the receive loop, a writer owned by
//! the client facade, and a [`StreamCloser`] that can shut the socket down from
//! any thread to unblock a pending read.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, warn};
use urbi_config::ServerEndpoint;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use crate::errors::{ClientError, ReadError};
use crate::TRANSPORT_TARGET;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_LINE_BYTES: usize = 1024 * 1024;

pub(crate) enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Connection {
    fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
        }
    }

    fn shutdown(&self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// The three halves of an open connection.
pub(crate) struct Transport {
    pub(crate) reader: LineReader<Connection>,
    pub(crate) writer: Connection,
    pub(crate) closer: StreamCloser,
}

/// Opens a connection to `endpoint` and splits it for concurrent use.
pub(crate) fn open(endpoint: &ServerEndpoint) -> Result<Transport, ClientError> {
    let connection = connect(endpoint)?;
    let split_error = |source: io::Error| ClientError::Connect {
        endpoint: endpoint.to_string(),
        source,
    };
    let reader = connection.try_clone().map_err(split_error)?;
    let closer = connection.try_clone().map_err(split_error)?;
    debug!(target: TRANSPORT_TARGET, endpoint = %endpoint, "connected to server");
    Ok(Transport {
        reader: LineReader::new(reader),
        writer: connection,
        closer: StreamCloser { stream: closer },
    })
}

fn connect(endpoint: &ServerEndpoint) -> Result<Connection, ClientError> {
    match endpoint {
        ServerEndpoint::Tcp { host, port } => {
            let addresses =
                resolve_tcp_addresses(host, *port).map_err(|source| ClientError::Resolve {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
            let stream = connect_any(&addresses)
                // Commands are single short lines; batching them only adds latency.
                .and_then(|stream| stream.set_nodelay(true).map(|()| stream))
                .map_err(|source| ClientError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
            Ok(Connection::Tcp(stream))
        }
        ServerEndpoint::Unix { path } => {
            #[cfg(unix)]
            {
                connect_unix(path.as_str()).map_err(|source| ClientError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
            }

            #[cfg(not(unix))]
            {
                let _ = path;
                Err(ClientError::UnsupportedUnixTransport(endpoint.to_string()))
            }
        }
    }
}

fn resolve_tcp_addresses(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let addresses: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    if addresses.is_empty() {
        return Err(no_resolved_addresses());
    }
    Ok(addresses)
}

/// Tries each resolved address in order and keeps the first that accepts.
///
/// A host name commonly resolves to both an IPv6 and an IPv4 address while the
/// server listens on only one of them, so a refusal moves on to the next
/// candidate. When every attempt fails the last error is returned.
fn connect_any(addresses: &[SocketAddr]) -> io::Result<TcpStream> {
    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect_timeout(address, CONNECTION_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                debug!(
                    target: TRANSPORT_TARGET,
                    address = %address,
                    error = %error,
                    "connection attempt failed"
                );
                last_error = Some(error);
            }
        }
    }
    Err(last_error.unwrap_or_else(no_resolved_addresses))
}

fn no_resolved_addresses() -> io::Error {
    io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses")
}

#[cfg(unix)]
fn connect_unix(path: &str) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    let stream = UnixStream::from(std::os::fd::OwnedFd::from(socket));
    Ok(Connection::Unix(stream))
}

/// Shuts the shared socket down from any thread.
pub(crate) struct StreamCloser {
    stream: Connection,
}

impl StreamCloser {
    /// Shuts both directions down; a reader parked on the socket sees EOF.
    pub(crate) fn close(&self) {
        match self.stream.shutdown() {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotConnected => {}
            Err(error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    error = %error,
                    "failed to shut down server connection"
                );
            }
        }
    }
}

/// Line framing over a byte stream.
///
/// A line is only returned once its `\n` terminator has been read. Bytes left
/// without a terminator when the stream ends are discarded.
pub(crate) struct LineReader<R> {
    inner: BufReader<R>,
    buffer: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            buffer: Vec::new(),
        }
    }

    /// Blocks until a full line, the end of the stream, or an error.
    pub(crate) fn read_line(&mut self) -> Result<String, ReadError> {
        self.buffer.clear();
        loop {
            let available = match self.inner.fill_buf() {
                Ok(available) => available,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(ReadError::Io(error)),
            };

            if available.is_empty() {
                if !self.buffer.is_empty() {
                    debug!(
                        target: TRANSPORT_TARGET,
                        bytes = self.buffer.len(),
                        "discarding unterminated trailing line"
                    );
                }
                return Err(ReadError::Eof);
            }

            if let Some(position) = available.iter().position(|byte| *byte == b'\n') {
                let (line, _) = available.split_at(position);
                self.buffer.extend_from_slice(line);
                self.inner.consume(position + 1);
                enforce_line_limit(self.buffer.len())?;
                return Ok(decode_line(&self.buffer));
            }

            let consumed = available.len();
            self.buffer.extend_from_slice(available);
            self.inner.consume(consumed);
            enforce_line_limit(self.buffer.len())?;
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn enforce_line_limit(size: usize) -> Result<(), ReadError> {
    if size > MAX_LINE_BYTES {
        return Err(ReadError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "line exceeds maximum size",
        )));
    }
    Ok(())
}
