//! Workdesk Client - Session-owning entry point for UI collaborators
//!
//! A [`Client`] owns at most one authenticated session: the logged-in user
//! and the connection its commands travel over. Share it with `Arc<Client>`;
//! every command goes through the session's command gate, so concurrent
//! callers never interleave on the socket.

mod api;
mod client;

pub use api::{NewUser, PayrollDraft, ReportDraft, TaskDraft, UserUpdate};
pub use client::Client;

pub use workdesk_core::{ClientConfig, CoreError, Record, RecordKind, Result, User};
