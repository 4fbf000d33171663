//! Scripted line-protocol server for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use workdesk_client::ClientConfig;
use workdesk_core::{Command, LineCodec};

pub const SEP: &str = "@Tr&m";
pub const JUMP: &str = "@Jump";

/// What the server does with one command
pub enum Reply {
    /// Send the lines followed by the terminator
    Block(Vec<String>),
    /// Send the lines, then hang up without a terminator
    Partial(Vec<String>),
    /// Hang up immediately
    Hangup,
    /// Say nothing and keep the connection open
    Silent,
}

impl Reply {
    pub fn lines(lines: &[&str]) -> Self {
        Reply::Block(lines.iter().map(|l| l.to_string()).collect())
    }

    pub fn empty() -> Self {
        Reply::Block(Vec::new())
    }
}

pub fn row(fields: &[&str]) -> String {
    fields.join(SEP)
}

pub struct MockServer {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Accept connections forever, answering each line with `handler`
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&Command) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);

        let log = received.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else { break };
                let handler = handler.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let codec = LineCodec::default();
                    let (read_half, mut write_half) = socket.into_split();
                    let mut lines = BufReader::new(read_half).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        log.lock().unwrap().push(line.clone());
                        let cmd = match codec.decode_command(&line) {
                            Ok(cmd) => cmd,
                            Err(_) => return,
                        };
                        let (body, terminate) = match handler(&cmd) {
                            Reply::Block(body) => (body, true),
                            Reply::Partial(body) => (body, false),
                            Reply::Hangup => return,
                            Reply::Silent => continue,
                        };
                        let mut out = String::new();
                        for l in body {
                            out.push_str(&l);
                            out.push('\n');
                        }
                        if terminate {
                            out.push_str("FIN_COMANDO\n");
                        }
                        if write_half.write_all(out.as_bytes()).await.is_err() {
                            return;
                        }
                        if !terminate {
                            let _ = write_half.shutdown().await;
                            return;
                        }
                    }
                });
            }
        });

        Self { addr, received, task }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_server("127.0.0.1", self.addr.port())
    }

    /// Every line received so far, across connections
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Standard login handler: alice/secret is accepted, anyone else rejected
pub fn login_reply(cmd: &Command) -> Option<Reply> {
    if cmd.name() != "LOGIN" {
        return None;
    }
    let reply = match cmd.args() {
        [user, pass] if user == "alice" && pass == "secret" => Reply::Block(vec![row(&[
            "LOGIN_OK", "7", "Alice", "a@x.com", "admin", "1", "HR", "2020-01-01", "Main St",
        ])]),
        _ => Reply::Block(vec![row(&["LOGIN_ERROR", "Bad credentials"])]),
    };
    Some(reply)
}
