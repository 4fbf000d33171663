//! Workdesk Core - Shared client plumbing for the Workdesk data server
//!
//! This crate provides:
//! - Domain types (commands, records)
//! - Protocol handling (line framing, response blocks)
//! - Record marshalling and the command catalog
//! - Connection and serialized command execution
//! - Configuration and error types

pub mod catalog;
pub mod config;
pub mod error;
pub mod marshal;
pub mod protocol;
pub mod transport;
pub mod types;

// Re-export common types
pub use catalog::{CommandSpec, LoginOutcome, ResponseShape, CATALOG};
pub use config::ClientConfig;
pub use error::{CoreError, MalformedRecord, Result};
pub use protocol::{LineCodec, LineSource, ResponseBlock, WireTokens};
pub use transport::{CommandGate, Connection, ConnectionState};
pub use types::{
    AssignedTask, Command, Department, PayrollEntry, Record, RecordKind, Task, TaskReport, User, UserSummary,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_default_tokens() {
        let config = ClientConfig::default();
        assert_eq!(config.tokens, WireTokens::default());
        assert_eq!(config.tokens.terminator, "FIN_COMANDO");
    }
}
