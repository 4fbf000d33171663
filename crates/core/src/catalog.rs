//! Command catalog
//!
//! The fixed set of commands the data server understands, their positional
//! parameters and the shape of their responses. Collaborators address
//! commands by name; the catalog validates the arguments, builds the
//! [`Command`] and decodes the [`ResponseBlock`] it gets back.

use tracing::warn;

use crate::error::{CoreError, Result};
use crate::marshal::{self, LOGIN_ERROR, LOGIN_OK};
use crate::protocol::{LineCodec, ResponseBlock};
use crate::types::{Command, Record, RecordKind, User};

/// Fallback text when the server rejects a login without saying why
pub const DEFAULT_LOGIN_FAILURE: &str = "Invalid username or password";

/// What a command answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `LOGIN_OK` user row or `LOGIN_ERROR` message
    Login,
    /// Zero or more rows of one record kind
    Records(RecordKind),
    /// Nothing to decode; the terminator only confirms completion
    Ack,
}

/// Catalog entry for one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    /// Parameter names, in wire order
    pub params: &'static [&'static str],
    pub response: ResponseShape,
}

/// Outcome of a login exchange
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Accepted(User),
    Rejected(String),
}

pub const LOGIN: &str = "LOGIN";
pub const ALL_USERS: &str = "TODOS_USUARIOS";
pub const USERS_SIMPLE: &str = "USUARIOS_SIMPLE";
pub const USERS_IN_DEPARTMENT: &str = "USUARIOS_DEP_SIMPLE";
pub const DEPARTMENTS: &str = "LISTAR_DEPARTAMENTOS_SIMPLE";
pub const CREATE_USER: &str = "CREAR_USUARIO";
pub const UPDATE_USER: &str = "UPDATE_USUARIO";
pub const MY_TASKS: &str = "MIS_TAREAS";
pub const TASKS_CREATED: &str = "MIS_TAREAS_CREADAS";
pub const INSERT_TASK: &str = "INSERT_TAREA";
pub const UPDATE_TASK: &str = "UPDATE_TAREA";
pub const USER_PAYROLL: &str = "NOMINAS_USUARIO";
pub const INSERT_PAYROLL: &str = "INSERT_NOMINA";
pub const UPDATE_PAYROLL: &str = "UPDATE_NOMINA";
pub const TASK_REPORTS: &str = "REPORTES";
pub const CREATE_REPORT: &str = "CREAR_REPORTE";
pub const CLOSE_REPORT: &str = "CERRAR_REPORTE";

const TASK_FIELDS: &[&str] = &["creator_id", "assignee_id", "description", "starts_on", "ends_on", "state", "title"];

pub static CATALOG: &[CommandSpec] = &[
    CommandSpec { name: LOGIN, params: &["user", "password"], response: ResponseShape::Login },
    CommandSpec { name: ALL_USERS, params: &[], response: ResponseShape::Records(RecordKind::User) },
    CommandSpec { name: USERS_SIMPLE, params: &[], response: ResponseShape::Records(RecordKind::UserSummary) },
    CommandSpec {
        name: USERS_IN_DEPARTMENT,
        params: &["department_id"],
        response: ResponseShape::Records(RecordKind::UserSummary),
    },
    CommandSpec { name: DEPARTMENTS, params: &[], response: ResponseShape::Records(RecordKind::Department) },
    CommandSpec {
        name: CREATE_USER,
        params: &["name", "mail", "password", "role", "department", "address"],
        response: ResponseShape::Ack,
    },
    CommandSpec {
        name: UPDATE_USER,
        params: &["user_id", "name", "mail", "role", "department", "address"],
        response: ResponseShape::Ack,
    },
    CommandSpec { name: MY_TASKS, params: &["user_id"], response: ResponseShape::Records(RecordKind::AssignedTask) },
    CommandSpec { name: TASKS_CREATED, params: &["user_id"], response: ResponseShape::Records(RecordKind::Task) },
    CommandSpec { name: INSERT_TASK, params: TASK_FIELDS, response: ResponseShape::Ack },
    CommandSpec {
        name: UPDATE_TASK,
        params: &["task_id", "creator_id", "assignee_id", "description", "starts_on", "ends_on", "state", "title"],
        response: ResponseShape::Ack,
    },
    CommandSpec {
        name: USER_PAYROLL,
        params: &["user_id"],
        response: ResponseShape::Records(RecordKind::PayrollEntry),
    },
    CommandSpec { name: INSERT_PAYROLL, params: &["user_id", "amount", "concept", "kind"], response: ResponseShape::Ack },
    CommandSpec {
        name: UPDATE_PAYROLL,
        params: &["payroll_id", "amount", "concept", "kind"],
        response: ResponseShape::Ack,
    },
    CommandSpec { name: TASK_REPORTS, params: &["task_id"], response: ResponseShape::Records(RecordKind::TaskReport) },
    CommandSpec {
        name: CREATE_REPORT,
        params: &["task_id", "information", "state", "user_id"],
        response: ResponseShape::Ack,
    },
    CommandSpec { name: CLOSE_REPORT, params: &["report_id"], response: ResponseShape::Ack },
];

/// Find a command by name
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    CATALOG.iter().find(|spec| spec.name == name)
}

/// Find a command by name, failing with `UnknownCommand`
pub fn require(name: &str) -> Result<&'static CommandSpec> {
    lookup(name).ok_or_else(|| CoreError::UnknownCommand(name.to_string()))
}

impl CommandSpec {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Validate arguments and build the command
    pub fn build<I, S>(&self, args: I) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cmd = Command::with_args(self.name, args);
        if cmd.args().len() != self.arity() {
            return Err(CoreError::ArgumentCount {
                command: self.name.to_string(),
                expected: self.arity(),
                got: cmd.args().len(),
            });
        }
        Ok(cmd)
    }

    /// Like [`CommandSpec::build`], also refusing arguments the wire format
    /// cannot carry
    pub fn build_strict<I, S>(&self, args: I, codec: &LineCodec) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cmd = self.build(args)?;
        if let Some((index, _)) = codec.unsafe_argument(&cmd) {
            return Err(CoreError::InvalidArgument(format!(
                "{} of {} contains a protocol delimiter or newline",
                self.params[index], self.name
            )));
        }
        Ok(cmd)
    }

    /// Decode the response to this command into records
    ///
    /// Login responses are not records; use [`decode_login`] for them.
    pub fn decode(&self, block: &ResponseBlock, codec: &LineCodec) -> Result<Vec<Record>> {
        match self.response {
            ResponseShape::Records(kind) => Ok(marshal::decode_records(kind, &codec.rows(block))),
            ResponseShape::Ack => {
                if !block.is_empty() {
                    tracing::debug!("Ignoring {} lines in {} acknowledgement", block.len(), self.name);
                }
                Ok(Vec::new())
            }
            ResponseShape::Login => match decode_login(block, codec)? {
                LoginOutcome::Accepted(user) => Ok(vec![Record::SessionUser(user)]),
                LoginOutcome::Rejected(message) => Err(CoreError::AuthFailed { message }),
            },
        }
    }
}

/// Interpret the response to `LOGIN`
///
/// Only the first record matters. Anything that is neither a decodable
/// `LOGIN_OK` row nor a `LOGIN_ERROR` row is a protocol error.
pub fn decode_login(block: &ResponseBlock, codec: &LineCodec) -> Result<LoginOutcome> {
    let first = codec
        .records(block)
        .next()
        .ok_or_else(|| CoreError::Protocol("Empty login response".into()))?;
    let fields = codec.fields(first.trim());

    match fields[0].trim() {
        LOGIN_OK => marshal::decode_session_user(&fields)
            .map(LoginOutcome::Accepted)
            .map_err(|e| CoreError::Protocol(format!("Unreadable login response: {}", e))),
        LOGIN_ERROR => {
            let message = fields
                .get(1)
                .map(|m| m.trim())
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_LOGIN_FAILURE);
            Ok(LoginOutcome::Rejected(message.to_string()))
        }
        other => {
            warn!("Unexpected login response marker: {:?}", other);
            Err(CoreError::Protocol(format!("Unexpected login response: {}", other)))
        }
    }
}
