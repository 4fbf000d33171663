//! Transport: TCP connection, bounded line reads and the command gate

mod connection;
mod gate;
pub mod line;

pub use connection::{Connection, ConnectionState};
pub use gate::CommandGate;
