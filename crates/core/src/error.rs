//! Error types for workdesk-core

use thiserror::Error;

/// Message shown to users for any transport-level failure.
///
/// The protocol carries no structured error codes outside of login, so every
/// connection, I/O or framing failure collapses into this text.
pub const UNREACHABLE_MESSAGE: &str = "Could not reach server";

/// A single row that could not be decoded into its record type.
///
/// Never escalated past the marshaller: the row is dropped and decoding
/// continues with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed {kind} record: {reason}")]
pub struct MalformedRecord {
    pub kind: &'static str,
    pub reason: String,
}

impl MalformedRecord {
    pub fn new(kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// Core error type
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    MalformedRecord(#[from] MalformedRecord),

    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Another command is in flight")]
    Busy,

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command {command} expects {expected} arguments, got {got}")]
    ArgumentCount {
        command: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No config directory found")]
    NoConfigDir,
}

impl CoreError {
    /// Text suitable for showing to an end user.
    ///
    /// Authentication failures carry the server's own message; anything that
    /// means the server could not be talked to becomes a generic
    /// "could not reach server" condition.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::AuthFailed { message } => message.clone(),
            CoreError::Connection(_)
            | CoreError::Io(_)
            | CoreError::Protocol(_)
            | CoreError::Timeout(_)
            | CoreError::NotConnected => UNREACHABLE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the error leaves the shared connection unusable.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            CoreError::Connection(_) | CoreError::Io(_) | CoreError::Protocol(_) | CoreError::Timeout(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CoreError>;
