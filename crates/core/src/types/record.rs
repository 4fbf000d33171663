//! Typed records decoded from server responses
//!
//! Each struct is an immutable snapshot of one response row. Field order on
//! the wire is documented on the matching `FromFields` impl in
//! [`crate::marshal`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A user account, as returned by login and the full user listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub mail: String,
    /// "admin", "jefe" or "empleado"
    pub role: String,
    pub department_id: i64,
    pub department_name: String,
    pub hired_on: Option<NaiveDate>,
    pub address: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }

    /// Department manager ("jefe")
    pub fn is_manager(&self) -> bool {
        self.role.eq_ignore_ascii_case("jefe")
    }

    pub fn is_employee(&self) -> bool {
        self.role.eq_ignore_ascii_case("empleado")
    }

    pub fn is_manager_or_above(&self) -> bool {
        self.is_admin() || self.is_manager()
    }
}

/// Id and display name only, used for assignee pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub name: String,
}

/// A task as seen by its creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_on: Option<NaiveDate>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub state: String,
    pub creator_name: String,
    pub assignee_name: String,
    pub assignee_id: i64,
}

/// A task as seen by the user it is assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedTask {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub state: String,
    pub assignee_name: String,
}

/// One payroll line belonging to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollEntry {
    pub id: i64,
    pub amount: f64,
    pub paid_on: Option<NaiveDate>,
    pub concept: String,
    /// "salario", "hora_extra", "plus" or "deduccion"
    pub kind: String,
    pub user_id: i64,
}

impl PayrollEntry {
    pub fn is_salary(&self) -> bool {
        self.kind.eq_ignore_ascii_case("salario")
    }

    pub fn is_overtime(&self) -> bool {
        self.kind.eq_ignore_ascii_case("hora_extra")
    }

    pub fn is_bonus(&self) -> bool {
        self.kind.eq_ignore_ascii_case("plus")
    }

    pub fn is_deduction(&self) -> bool {
        self.kind.eq_ignore_ascii_case("deduccion")
    }
}

/// Progress report filed against a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub id: i64,
    pub created_on: NaiveDate,
    pub information: String,
    /// "en_curso", "finalizada", "irrealizable" or "transferir"
    pub state: String,
    pub reporter_id: i64,
    pub reporter_name: String,
}

/// Shape of the rows a command answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    SessionUser,
    User,
    UserSummary,
    Department,
    Task,
    AssignedTask,
    PayrollEntry,
    TaskReport,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::SessionUser => "session_user",
            RecordKind::User => "user",
            RecordKind::UserSummary => "user_summary",
            RecordKind::Department => "department",
            RecordKind::Task => "task",
            RecordKind::AssignedTask => "assigned_task",
            RecordKind::PayrollEntry => "payroll_entry",
            RecordKind::TaskReport => "task_report",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any decoded record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum Record {
    SessionUser(User),
    User(User),
    UserSummary(UserSummary),
    Department(Department),
    Task(Task),
    AssignedTask(AssignedTask),
    PayrollEntry(PayrollEntry),
    TaskReport(TaskReport),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::SessionUser(_) => RecordKind::SessionUser,
            Record::User(_) => RecordKind::User,
            Record::UserSummary(_) => RecordKind::UserSummary,
            Record::Department(_) => RecordKind::Department,
            Record::Task(_) => RecordKind::Task,
            Record::AssignedTask(_) => RecordKind::AssignedTask,
            Record::PayrollEntry(_) => RecordKind::PayrollEntry,
            Record::TaskReport(_) => RecordKind::TaskReport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> User {
        User {
            id: 1,
            name: "Ana".into(),
            mail: "ana@x.com".into(),
            role: role.into(),
            department_id: 2,
            department_name: "IT".into(),
            hired_on: None,
            address: String::new(),
        }
    }

    #[test]
    fn test_role_helpers_ignore_case() {
        assert!(user("ADMIN").is_admin());
        assert!(user("Jefe").is_manager());
        assert!(user("Jefe").is_manager_or_above());
        assert!(user("empleado").is_employee());
        assert!(!user("empleado").is_manager_or_above());
    }

    #[test]
    fn test_payroll_kind_helpers() {
        let mut entry = PayrollEntry {
            id: 1,
            amount: 10.0,
            paid_on: None,
            concept: "x".into(),
            kind: "hora_extra".into(),
            user_id: 3,
        };
        assert!(entry.is_overtime());
        entry.kind = "Deduccion".into();
        assert!(entry.is_deduction());
        assert!(!entry.is_salary());
        assert!(!entry.is_bonus());
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = Record::Department(Department { name: "HR".into() });
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"kind":"department","record":{"name":"HR"}}"#);
        assert_eq!(record.kind(), RecordKind::Department);
    }
}
