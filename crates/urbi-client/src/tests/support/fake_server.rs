//! Fake server utilities for client tests.
//!
//! Provides a TCP peer that records the lines a client sends and writes
//! scripted lines back, so tests can drive the receive loop deterministically.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use urbi_config::ServerEndpoint;

use super::EVENT_TIMEOUT;

/// Listening half of the fake server, bound to an ephemeral port.
pub(in crate::tests) struct FakeServer {
    listener: TcpListener,
    port: u16,
}

impl FakeServer {
    /// Binds a listener on `127.0.0.1` with an ephemeral port.
    pub fn bind() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake server")?;
        listener
            .set_nonblocking(true)
            .context("fake server nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        Ok(Self { listener, port })
    }

    /// Endpoint clients should connect to.
    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::tcp("127.0.0.1", self.port)
    }

    /// Accepts one client connection, giving up after a short deadline so a
    /// failed connect never hangs the test.
    pub fn accept(self) -> Result<ServerPeer> {
        let deadline = Instant::now() + EVENT_TIMEOUT;
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => return ServerPeer::new(stream),
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(error) => return Err(error).context("accept connection"),
            }
        }
    }
}

/// Server side of an accepted connection.
pub(in crate::tests) struct ServerPeer {
    stream: TcpStream,
    lines: mpsc::Receiver<String>,
    reader: Option<thread::JoinHandle<()>>,
}

impl ServerPeer {
    fn new(stream: TcpStream) -> Result<Self> {
        stream
            .set_nonblocking(false)
            .context("accepted stream blocking")?;
        let reader_stream = stream.try_clone().context("clone stream")?;
        let (sender, lines) = mpsc::channel();
        let reader = thread::spawn(move || {
            for line in BufReader::new(reader_stream).lines() {
                let Ok(line) = line else { break };
                if sender.send(line).is_err() {
                    break;
                }
            }
        });
        Ok(Self {
            stream,
            lines,
            reader: Some(reader),
        })
    }

    /// Writes one line, appending the terminator.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        write_lines(&mut self.stream, &[line]).context("write line to client")
    }

    /// Writes raw bytes without framing.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).context("write bytes to client")?;
        self.stream.flush().context("flush bytes to client")
    }

    /// Waits for the next line the client sent, without its terminator.
    pub fn expect_line(&self) -> Result<String> {
        self.lines
            .recv_timeout(EVENT_TIMEOUT)
            .map_err(|error| anyhow!("no line from client: {error}"))
    }

    /// Fails if the client sends another line within `period`.
    pub fn expect_silence(&self, period: Duration) -> Result<()> {
        match self.lines.recv_timeout(period) {
            Ok(line) => bail!("unexpected line from client: {line:?}"),
            Err(_) => Ok(()),
        }
    }

    /// Closes the connection from the server side.
    pub fn hang_up(&mut self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(error) => Err(error).context("shut down server stream"),
        }
    }
}

impl Drop for ServerPeer {
    fn drop(&mut self) {
        let _ = self.hang_up();
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

/// Writes lines to a stream, appending newlines and flushing.
fn write_lines(stream: &mut impl Write, lines: &[&str]) -> io::Result<()> {
    for line in lines {
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\n")?;
    }
    stream.flush()
}
