//! Typed command helpers
//!
//! Thin wrappers over [`Client::execute`] for each catalog command. Inputs are
//! plain structs; dates go out as `YYYY-MM-DD` and an absent date as empty
//! text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use workdesk_core::catalog::*;
use workdesk_core::marshal::DATE_FORMAT;
use workdesk_core::{
    AssignedTask, CoreError, Department, PayrollEntry, Result, Task, TaskReport, User, UserSummary,
};

use crate::Client;

/// Account to create
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub mail: String,
    pub password: String,
    pub role: String,
    /// Department name
    pub department: String,
    pub address: String,
}

/// Changes to an existing account; the password is not touched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub user_id: i64,
    pub name: String,
    pub mail: String,
    pub role: String,
    pub department: String,
    pub address: String,
}

/// Task fields shared by insert and update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub creator_id: i64,
    pub assignee_id: i64,
    pub title: String,
    pub description: String,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayrollDraft {
    pub amount: f64,
    pub concept: String,
    /// `salario`, `hora_extra`, `plus` or `deduccion`
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub task_id: i64,
    pub information: String,
    pub state: String,
    pub user_id: i64,
}

fn wire_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidArgument(format!("{} cannot be empty", field)));
    }
    Ok(())
}

impl NewUser {
    fn args(&self) -> Result<[String; 6]> {
        require_text("name", &self.name)?;
        require_text("mail", &self.mail)?;
        require_text("password", &self.password)?;
        require_text("role", &self.role)?;
        Ok([
            self.name.clone(),
            self.mail.clone(),
            self.password.clone(),
            self.role.clone(),
            self.department.clone(),
            self.address.clone(),
        ])
    }
}

impl UserUpdate {
    fn args(&self) -> Result<[String; 6]> {
        require_text("name", &self.name)?;
        require_text("mail", &self.mail)?;
        require_text("role", &self.role)?;
        Ok([
            self.user_id.to_string(),
            self.name.clone(),
            self.mail.clone(),
            self.role.clone(),
            self.department.clone(),
            self.address.clone(),
        ])
    }
}

impl TaskDraft {
    fn args(&self) -> Result<Vec<String>> {
        require_text("title", &self.title)?;
        if let (Some(start), Some(end)) = (self.starts_on, self.ends_on) {
            if end < start {
                return Err(CoreError::InvalidArgument("Task ends before it starts".into()));
            }
        }
        Ok(vec![
            self.creator_id.to_string(),
            self.assignee_id.to_string(),
            self.description.clone(),
            wire_date(self.starts_on),
            wire_date(self.ends_on),
            self.state.clone(),
            self.title.clone(),
        ])
    }
}

impl PayrollDraft {
    fn args(&self) -> Result<[String; 3]> {
        if !self.amount.is_finite() {
            return Err(CoreError::InvalidArgument("Amount must be a finite number".into()));
        }
        require_text("kind", &self.kind)?;
        Ok([self.amount.to_string(), self.concept.clone(), self.kind.clone()])
    }
}

impl Client {
    pub async fn all_users(&self) -> Result<Vec<User>> {
        self.query(ALL_USERS, Vec::<String>::new()).await
    }

    pub async fn users_simple(&self) -> Result<Vec<UserSummary>> {
        self.query(USERS_SIMPLE, Vec::<String>::new()).await
    }

    pub async fn users_in_department(&self, department_id: i64) -> Result<Vec<UserSummary>> {
        self.query(USERS_IN_DEPARTMENT, [department_id.to_string()]).await
    }

    pub async fn departments(&self) -> Result<Vec<Department>> {
        self.query(DEPARTMENTS, Vec::<String>::new()).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<()> {
        self.execute(CREATE_USER, user.args()?).await.map(drop)
    }

    pub async fn update_user(&self, update: &UserUpdate) -> Result<()> {
        self.execute(UPDATE_USER, update.args()?).await.map(drop)
    }

    /// Tasks assigned to `user_id`
    pub async fn my_tasks(&self, user_id: i64) -> Result<Vec<AssignedTask>> {
        self.query(MY_TASKS, [user_id.to_string()]).await
    }

    /// Tasks created by `user_id`
    pub async fn tasks_created_by(&self, user_id: i64) -> Result<Vec<Task>> {
        self.query(TASKS_CREATED, [user_id.to_string()]).await
    }

    pub async fn insert_task(&self, task: &TaskDraft) -> Result<()> {
        self.execute(INSERT_TASK, task.args()?).await.map(drop)
    }

    pub async fn update_task(&self, task_id: i64, task: &TaskDraft) -> Result<()> {
        let mut args = vec![task_id.to_string()];
        args.extend(task.args()?);
        self.execute(UPDATE_TASK, args).await.map(drop)
    }

    pub async fn payroll_for_user(&self, user_id: i64) -> Result<Vec<PayrollEntry>> {
        self.query(USER_PAYROLL, [user_id.to_string()]).await
    }

    pub async fn insert_payroll(&self, user_id: i64, entry: &PayrollDraft) -> Result<()> {
        let mut args = vec![user_id.to_string()];
        args.extend(entry.args()?);
        self.execute(INSERT_PAYROLL, args).await.map(drop)
    }

    pub async fn update_payroll(&self, payroll_id: i64, entry: &PayrollDraft) -> Result<()> {
        let mut args = vec![payroll_id.to_string()];
        args.extend(entry.args()?);
        self.execute(UPDATE_PAYROLL, args).await.map(drop)
    }

    pub async fn reports_for_task(&self, task_id: i64) -> Result<Vec<TaskReport>> {
        self.query(TASK_REPORTS, [task_id.to_string()]).await
    }

    pub async fn create_report(&self, report: &ReportDraft) -> Result<()> {
        require_text("information", &report.information)?;
        let args = [
            report.task_id.to_string(),
            report.information.clone(),
            report.state.clone(),
            report.user_id.to_string(),
        ];
        self.execute(CREATE_REPORT, args).await.map(drop)
    }

    pub async fn close_report(&self, report_id: i64) -> Result<()> {
        self.execute(CLOSE_REPORT, [report_id.to_string()]).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_task_draft_dates_on_wire() {
        let draft = TaskDraft {
            creator_id: 1,
            assignee_id: 2,
            title: "Roof".into(),
            description: "Fix leak".into(),
            starts_on: Some(date("2024-03-01")),
            ends_on: None,
            state: "pendiente".into(),
        };
        assert_eq!(
            draft.args().unwrap(),
            vec!["1", "2", "Fix leak", "2024-03-01", "", "pendiente", "Roof"]
        );
    }

    #[test]
    fn test_task_draft_rejects_inverted_range() {
        let draft = TaskDraft {
            title: "Roof".into(),
            starts_on: Some(date("2024-03-05")),
            ends_on: Some(date("2024-03-01")),
            ..Default::default()
        };
        assert!(matches!(draft.args(), Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn test_new_user_requires_password() {
        let user = NewUser {
            name: "Ana".into(),
            mail: "ana@x.com".into(),
            role: "empleado".into(),
            ..Default::default()
        };
        assert!(matches!(user.args(), Err(CoreError::InvalidArgument(ref m)) if m.starts_with("password")));
    }

    #[test]
    fn test_payroll_draft_amount() {
        let draft = PayrollDraft {
            amount: 1250.5,
            concept: "Marzo".into(),
            kind: "salario".into(),
        };
        assert_eq!(draft.args().unwrap(), ["1250.5", "Marzo", "salario"]);

        let bad = PayrollDraft {
            amount: f64::NAN,
            ..draft
        };
        assert!(bad.args().is_err());
    }
}
