//! TCP connection to the data server with raw line I/O
//!
//! A [`Connection`] knows nothing about commands or terminators; it moves
//! single lines. Any failed read or write closes it, because a half-written
//! command or half-read response leaves the stream out of step with the
//! server.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, error, info};

use crate::config::DEFAULT_MAX_LINE_BYTES;
use crate::protocol::LineSource;
use crate::transport::line::read_line_bounded;
use crate::{CoreError, Result};

type BoxedReader = Box<dyn AsyncBufRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Lifecycle of a [`Connection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, never opened
    Disconnected,
    /// Transport open
    Connected,
    /// Closed explicitly or after an I/O failure
    Closed,
}

/// One live transport to one server
pub struct Connection {
    host: String,
    port: u16,
    reader: Option<BoxedReader>,
    writer: Option<BoxedWriter>,
    state: ConnectionState,
    max_line_bytes: usize,
    /// A command was written and its response not yet fully read
    in_flight: bool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer())
            .field("state", &self.state)
            .field("max_line_bytes", &self.max_line_bytes)
            .finish()
    }
}

impl Connection {
    /// Create an unopened connection to `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reader: None,
            writer: None,
            state: ConnectionState::Disconnected,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            in_flight: false,
        }
    }

    /// Open a TCP connection to `host:port`
    pub async fn connect(host: impl Into<String>, port: u16) -> Result<Self> {
        let mut conn = Self::new(host, port);
        conn.open().await?;
        Ok(conn)
    }

    /// Wrap an already-open byte stream (any duplex transport)
    pub fn from_stream<S>(stream: S, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            host: peer.into(),
            port: 0,
            reader: Some(Box::new(BufReader::new(read_half))),
            writer: Some(Box::new(write_half)),
            state: ConnectionState::Connected,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            in_flight: false,
        }
    }

    /// Set maximum accepted inbound line length
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Open the transport
    ///
    /// If the connection is already open the old transport is dropped and a
    /// new one replaces it.
    pub async fn open(&mut self) -> Result<()> {
        if self.host.is_empty() {
            return Err(CoreError::Connection("Host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(CoreError::Connection("Port cannot be 0".to_string()));
        }
        if self.state == ConnectionState::Connected {
            debug!("Replacing open connection to {}", self.peer());
            self.close().await;
        }

        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| CoreError::Connection(format!("Failed to connect to {}: {}", self.peer(), e)))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        let (read_half, write_half) = stream.into_split();
        self.reader = Some(Box::new(BufReader::new(read_half)));
        self.writer = Some(Box::new(write_half));
        self.state = ConnectionState::Connected;
        self.in_flight = false;

        info!("Connected to {}", self.peer());
        Ok(())
    }

    pub fn peer(&self) -> String {
        if self.port == 0 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Write one line and flush
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(CoreError::NotConnected)?;

        let result = async {
            writer.write_all(text.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            error!("Write to {} failed: {}", self.peer(), e);
            self.mark_closed();
            return Err(CoreError::Io(e));
        }
        Ok(())
    }

    /// Read one line; `None` when the peer closed the stream
    ///
    /// Not cancel-safe: a dropped read may have consumed part of a line.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let reader = self.reader.as_mut().ok_or(CoreError::NotConnected)?;

        match read_line_bounded(reader, self.max_line_bytes).await {
            Ok(Some(line)) => Ok(Some(line)),
            Ok(None) => {
                debug!("Peer {} closed the stream", self.peer());
                self.mark_closed();
                Ok(None)
            }
            Err(e) => {
                error!("Read from {} failed: {}", self.peer(), e);
                self.mark_closed();
                Err(CoreError::Io(e))
            }
        }
    }

    /// Close the transport. Never fails; shutdown errors are only logged.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("Ignoring error while closing {}: {}", self.peer(), e);
            }
        }
        self.reader = None;
        self.in_flight = false;
        if self.state == ConnectionState::Connected {
            info!("Closed connection to {}", self.peer());
        }
        self.state = ConnectionState::Closed;
    }

    /// Drop both halves without a graceful shutdown
    pub(crate) fn mark_closed(&mut self) {
        self.reader = None;
        self.writer = None;
        self.state = ConnectionState::Closed;
        self.in_flight = false;
    }

    pub(crate) fn begin_exchange(&mut self) {
        self.in_flight = true;
    }

    pub(crate) fn end_exchange(&mut self) {
        self.in_flight = false;
    }

    /// True when an exchange started and was never finished, i.e. its
    /// caller was cancelled between the write and the terminator
    pub(crate) fn exchange_abandoned(&self) -> bool {
        self.in_flight
    }
}

#[async_trait]
impl LineSource for Connection {
    async fn read_line(&mut self) -> Result<Option<String>> {
        Connection::read_line(self).await
    }
}
