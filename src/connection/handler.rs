//! Connection Handler Module
//!
//! This module handles individual client connections on the TCP port.
//! Each client gets its own handler task that runs in a loop,
//! reading command lines and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │  AWAIT_COMMAND               │
//!    │    read bytes (bounded)      │
//!    │              │               │
//!    │              ▼               │
//!    │  PARSE ──── malformed ────┐  │
//!    │              │            │  │
//!    │              ▼            │  │
//!    │  EXECUTE                  │  │
//!    │              │            │  │
//!    │              ▼            ▼  │
//!    │  RESPOND (one line)          │
//!    │              │               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. EOF / idle timeout / error: handler task ends
//! ```
//!
//! ## Line Framing
//!
//! A command ends at `\n`, at end of stream, or when the client has gone
//! quiet for `line_idle_timeout` with a partial line buffered. The last
//! rule serves clients that write `SET k v` with no terminator and then
//! block waiting for the reply.

use crate::commands::CommandHandler;
use crate::protocol::{LineParser, ParseError, Response, MAX_LINE_LENGTH};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Timeouts and limits applied to every connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Close the connection after this long without a complete command
    pub read_timeout: Duration,
    /// Give up on a response that can't be written within this long
    pub write_timeout: Duration,
    /// Treat a buffered partial line as complete after this much silence
    pub line_idle_timeout: Duration,
    /// Longest accepted command line, in bytes
    pub max_line_length: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            line_idle_timeout: Duration::from_millis(50),
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Connections turned away because the server was at capacity
    pub connections_refused: AtomicU64,
    /// Total commands executed
    pub commands_processed: AtomicU64,
    /// Total malformed command lines rejected
    pub commands_rejected: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn connection_refused(&self) {
        self.connections_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_rejected(&self) {
        self.commands_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// This struct manages the read buffer, line framing, and response sending
/// for one connected client.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shares the store with every other connection)
    command_handler: CommandHandler,

    parser: LineParser,

    config: ConnectionConfig,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        config: ConnectionConfig,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: LineParser::with_max_line_length(config.max_line_length),
            config,
            stats,
        }
    }

    /// Runs the main connection loop.
    ///
    /// Reads commands from the client, executes them, and sends back
    /// responses until the client disconnects, times out, or errors.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        debug!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => debug!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                ConnectionError::ReadTimeout => {
                    debug!(client = %self.addr, "Idle connection timed out")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            // Answer every complete line already buffered (pipelining)
            while let Some((len, consumed)) = self.next_line().await? {
                let line = self.buffer.split_to(consumed);
                self.process_line(&line[..len]).await?;
            }

            if self.buffer.is_empty() {
                self.read_more_data(self.config.read_timeout).await?;
                continue;
            }

            // A partial line is buffered: wait briefly for the rest of it
            match self.read_more_data(self.config.line_idle_timeout).await {
                Ok(()) => {}
                Err(ConnectionError::ReadTimeout) => {
                    trace!(
                        client = %self.addr,
                        buffered = self.buffer.len(),
                        "Client went quiet, treating buffered bytes as a command"
                    );
                    let line = self.buffer.split();
                    self.process_line(&line).await?;
                }
                Err(ConnectionError::UnexpectedEof) => {
                    // Connection-terminated line: answer it, then we're done
                    let line = self.buffer.split();
                    self.process_line(&line).await?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Locates the next complete line, rejecting oversized ones.
    async fn next_line(&mut self) -> Result<Option<(usize, usize)>, ConnectionError> {
        match self.parser.next_line(&self.buffer) {
            Ok(found) => Ok(found),
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Rejecting oversized line");
                self.stats.command_rejected();
                let response = self.command_handler.reject(&e);
                self.send_response(&response).await?;
                Err(ConnectionError::ParseError(e))
            }
        }
    }

    /// Parses and executes one line, then writes exactly one response.
    async fn process_line(&mut self, line: &[u8]) -> Result<(), ConnectionError> {
        let response = match self.parser.parse_line(line) {
            Ok(Some(command)) => {
                self.stats.command_processed();
                self.command_handler.execute(command)
            }
            // Blank lines get no reply
            Ok(None) => return Ok(()),
            Err(e) => {
                debug!(client = %self.addr, error = %e, "Malformed command");
                self.stats.command_rejected();
                self.command_handler.reject(&e)
            }
        };

        self.send_response(&response).await
    }

    /// Reads more data from the socket into the buffer, waiting at most `wait`.
    async fn read_more_data(&mut self, wait: Duration) -> Result<(), ConnectionError> {
        // Ensure we have some capacity
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = match timeout(wait, self.stream.get_mut().read_buf(&mut self.buffer)).await {
            Ok(result) => result?,
            Err(_) => return Err(ConnectionError::ReadTimeout),
        };

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Sends a response to the client within the write timeout.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        let limit = self.config.write_timeout;

        let write = async {
            self.stream.write_all(&bytes).await?;
            self.stream.flush().await
        };
        match timeout(limit, write).await {
            Ok(result) => result?,
            Err(_) => return Err(ConnectionError::WriteTimeout),
        }

        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
///
/// Each of these ends only the connection it happened on.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The peer sent something that can't be framed
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial command)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// No complete command arrived in time
    #[error("Read timed out")]
    ReadTimeout,

    /// A response could not be written in time
    #[error("Write timed out")]
    WriteTimeout,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion, swallowing the expected ways a
/// connection ends.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    config: ConnectionConfig,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, config, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected | ConnectionError::ReadTimeout => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                info!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
