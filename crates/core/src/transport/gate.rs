//! Command gate: one command in flight per connection
//!
//! Responses carry no correlation id; the only thing tying a response to its
//! command is that nothing else was sent in between. The gate owns the
//! connection behind an async mutex and holds it for the whole write + read
//! of one command. Waiters are served in FIFO order (tokio's mutex is fair).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::protocol::{LineCodec, ResponseBlock};
use crate::transport::Connection;
use crate::types::Command;
use crate::{CoreError, Result};

pub struct CommandGate {
    codec: LineCodec,
    conn: Mutex<Connection>,
    open: AtomicBool,
    timeout: Option<Duration>,
}

impl CommandGate {
    pub fn new(conn: Connection, codec: LineCodec) -> Self {
        let open = AtomicBool::new(conn.is_open());
        Self {
            codec,
            conn: Mutex::new(conn),
            open,
            timeout: None,
        }
    }

    /// Bound every [`CommandGate::execute`] by `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn codec(&self) -> &LineCodec {
        &self.codec
    }

    /// Last known connection state, without waiting for the gate
    pub fn is_connected(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Send a command and read its whole response, waiting for the gate
    pub async fn execute(&self, cmd: &Command) -> Result<ResponseBlock> {
        match self.timeout {
            Some(timeout) => self.execute_with_timeout(cmd, timeout).await,
            None => {
                let mut conn = self.conn.lock().await;
                self.exchange(&mut conn, cmd).await
            }
        }
    }

    /// Like [`CommandGate::execute`] but fails with `Busy` instead of waiting
    pub async fn try_execute(&self, cmd: &Command) -> Result<ResponseBlock> {
        let mut conn = self.conn.try_lock().map_err(|_| CoreError::Busy)?;
        self.exchange(&mut conn, cmd).await
    }

    /// Send a command, giving up on the round trip after `timeout`
    ///
    /// Only the exchange is bounded, not the wait for the gate. An abandoned
    /// exchange closes the connection: its response may still arrive and
    /// would be read as the answer to the next command.
    pub async fn execute_with_timeout(&self, cmd: &Command, timeout: Duration) -> Result<ResponseBlock> {
        let mut conn = self.conn.lock().await;

        match tokio::time::timeout(timeout, self.exchange(&mut conn, cmd)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} timed out after {:?}; closing connection to {}",
                    cmd.name(),
                    timeout,
                    conn.peer()
                );
                conn.close().await;
                self.open.store(false, Ordering::Release);
                Err(CoreError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// Close the connection once no command is in flight
    pub async fn close(&self) {
        let mut conn = self.conn.lock().await;
        conn.close().await;
        self.open.store(false, Ordering::Release);
    }

    async fn exchange(&self, conn: &mut Connection, cmd: &Command) -> Result<ResponseBlock> {
        if conn.exchange_abandoned() {
            // The unread response of a dropped caller is still on the stream
            warn!("Previous command to {} was abandoned mid-response; closing", conn.peer());
            conn.mark_closed();
            self.open.store(false, Ordering::Release);
        }
        if !conn.is_open() {
            return Err(CoreError::NotConnected);
        }

        // Arguments may hold credentials; only the name is logged
        debug!("-> {} ({} args)", cmd.name(), cmd.args().len());

        let mut guard = InFlight {
            open: &self.open,
            command: cmd.name(),
            armed: true,
        };
        conn.begin_exchange();

        let line = self.codec.encode(cmd);
        let result = match conn.write_line(&line).await {
            Ok(()) => self.codec.read_block(conn).await,
            Err(e) => Err(e),
        };

        conn.end_exchange();
        guard.armed = false;

        if let Err(CoreError::Protocol(_)) = &result {
            // Out of step with the server; nothing later can be trusted
            conn.mark_closed();
        }
        self.open.store(conn.is_open(), Ordering::Release);

        match &result {
            Ok(block) => debug!("<- {} ({} lines)", cmd.name(), block.len()),
            Err(e) => warn!("{} failed: {}", cmd.name(), e),
        }
        result
    }
}

/// Marks the gate closed if an exchange future is dropped before it finishes
struct InFlight<'a> {
    open: &'a AtomicBool,
    command: &'a str,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("{} cancelled before its response was read", self.command);
            self.open.store(false, Ordering::Release);
        }
    }
}

impl std::fmt::Debug for CommandGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandGate")
            .field("connected", &self.is_connected())
            .field("timeout", &self.timeout)
            .finish()
    }
}
