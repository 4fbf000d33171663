//! Domain types for the data server protocol

mod command;
mod record;

pub use command::Command;
pub use record::{
    AssignedTask, Department, PayrollEntry, Record, RecordKind, Task, TaskReport, User, UserSummary,
};
