//! Record marshaller: positional fields to typed records
//!
//! Every record type has one fallible decoder and a minimum arity. A row
//! that is too short or has a field that does not parse is dropped on its
//! own; the rest of the response is still returned.

use chrono::NaiveDate;
use tracing::warn;

use crate::error::MalformedRecord;
use crate::types::{
    AssignedTask, Department, PayrollEntry, Record, RecordKind, Task, TaskReport, User, UserSummary,
};

/// Date format used on the wire
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Texts the server sends for "no date"
pub const NO_VALUE_TOKENS: [&str; 2] = ["null", "Sin fecha"];

/// Marker opening a successful login response
pub const LOGIN_OK: &str = "LOGIN_OK";

/// Marker opening a rejected login response
pub const LOGIN_ERROR: &str = "LOGIN_ERROR";

/// Decode a record from one row of positional fields
pub trait FromFields: Sized {
    const KIND: RecordKind;

    /// Fewest fields a row needs to be considered
    const MIN_FIELDS: usize;

    fn from_fields(fields: &[String]) -> Result<Self, MalformedRecord>;
}

/// Decode every row, dropping the ones that do not parse
///
/// Valid rows keep their relative order.
pub fn decode_rows<T: FromFields>(rows: &[Vec<String>]) -> Vec<T> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, fields)| match decode_row::<T>(fields) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Dropping row {}: {}", index, e);
                None
            }
        })
        .collect()
}

/// Decode one row, checking the minimum arity first
pub fn decode_row<T: FromFields>(fields: &[String]) -> Result<T, MalformedRecord> {
    if fields.len() < T::MIN_FIELDS {
        return Err(MalformedRecord::new(
            T::KIND.as_str(),
            format!("expected at least {} fields, got {}", T::MIN_FIELDS, fields.len()),
        ));
    }
    T::from_fields(fields)
}

/// Decode rows of the given kind into [`Record`]s
pub fn decode_records(kind: RecordKind, rows: &[Vec<String>]) -> Vec<Record> {
    match kind {
        RecordKind::SessionUser => decode_rows::<SessionUserRow>(rows)
            .into_iter()
            .map(|row| Record::SessionUser(row.0))
            .collect(),
        RecordKind::User => decode_rows(rows).into_iter().map(Record::User).collect(),
        RecordKind::UserSummary => decode_rows(rows).into_iter().map(Record::UserSummary).collect(),
        RecordKind::Department => decode_rows(rows).into_iter().map(Record::Department).collect(),
        RecordKind::Task => decode_rows(rows).into_iter().map(Record::Task).collect(),
        RecordKind::AssignedTask => decode_rows(rows).into_iter().map(Record::AssignedTask).collect(),
        RecordKind::PayrollEntry => decode_rows(rows).into_iter().map(Record::PayrollEntry).collect(),
        RecordKind::TaskReport => decode_rows(rows).into_iter().map(Record::TaskReport).collect(),
    }
}

/// Decode the `LOGIN_OK` row into the session user
pub fn decode_session_user(fields: &[String]) -> Result<User, MalformedRecord> {
    decode_row::<SessionUserRow>(fields).map(|row| row.0)
}

/// Login success row: the `LOGIN_OK` marker followed by user fields
///
/// `LOGIN_OK, id, name, mail, role, dept id, dept name, hired on [, address]`.
/// The department id falls back to 0 and the address to empty text.
struct SessionUserRow(User);

impl FromFields for SessionUserRow {
    const KIND: RecordKind = RecordKind::SessionUser;
    const MIN_FIELDS: usize = 8;

    fn from_fields(f: &[String]) -> Result<Self, MalformedRecord> {
        let kind = Self::KIND.as_str();
        if f[0].trim() != LOGIN_OK {
            return Err(MalformedRecord::new(kind, format!("expected {} marker", LOGIN_OK)));
        }
        Ok(Self(User {
            id: int(kind, "id", &f[1])?,
            name: f[2].clone(),
            mail: f[3].clone(),
            role: f[4].clone(),
            department_id: f[5].trim().parse().unwrap_or(0),
            department_name: f[6].clone(),
            hired_on: optional_date(kind, "hired_on", &f[7])?,
            address: f.get(8).cloned().unwrap_or_default(),
        }))
    }
}

/// `id, name, mail, role, dept id, dept name, hired on, address`
impl FromFields for User {
    const KIND: RecordKind = RecordKind::User;
    const MIN_FIELDS: usize = 8;

    fn from_fields(f: &[String]) -> Result<Self, MalformedRecord> {
        let kind = Self::KIND.as_str();
        Ok(User {
            id: int(kind, "id", &f[0])?,
            name: f[1].clone(),
            mail: f[2].clone(),
            role: f[3].clone(),
            department_id: int(kind, "department_id", &f[4])?,
            department_name: f[5].clone(),
            hired_on: optional_date(kind, "hired_on", &f[6])?,
            address: f[7].clone(),
        })
    }
}

/// `id, name`
impl FromFields for UserSummary {
    const KIND: RecordKind = RecordKind::UserSummary;
    const MIN_FIELDS: usize = 2;

    fn from_fields(f: &[String]) -> Result<Self, MalformedRecord> {
        Ok(UserSummary {
            id: int(Self::KIND.as_str(), "id", &f[0])?,
            name: f[1].trim().to_string(),
        })
    }
}

/// `name`
impl FromFields for Department {
    const KIND: RecordKind = RecordKind::Department;
    const MIN_FIELDS: usize = 1;

    fn from_fields(f: &[String]) -> Result<Self, MalformedRecord> {
        let name = f[0].trim();
        if name.is_empty() {
            return Err(MalformedRecord::new(Self::KIND.as_str(), "empty name"));
        }
        Ok(Department { name: name.to_string() })
    }
}

/// `id, title, description, created, start, end, state, creator, assignee, assignee id`
impl FromFields for Task {
    const KIND: RecordKind = RecordKind::Task;
    const MIN_FIELDS: usize = 10;

    fn from_fields(f: &[String]) -> Result<Self, MalformedRecord> {
        let kind = Self::KIND.as_str();
        Ok(Task {
            id: int(kind, "id", &f[0])?,
            title: f[1].clone(),
            description: f[2].clone(),
            created_on: optional_date(kind, "created_on", &f[3])?,
            starts_on: optional_date(kind, "starts_on", &f[4])?,
            ends_on: optional_date(kind, "ends_on", &f[5])?,
            state: f[6].clone(),
            creator_name: f[7].clone(),
            assignee_name: f[8].clone(),
            assignee_id: int(kind, "assignee_id", &f[9])?,
        })
    }
}

/// `id, title, description, start, end, state [, assignee]`
impl FromFields for AssignedTask {
    const KIND: RecordKind = RecordKind::AssignedTask;
    const MIN_FIELDS: usize = 6;

    fn from_fields(f: &[String]) -> Result<Self, MalformedRecord> {
        let kind = Self::KIND.as_str();
        Ok(AssignedTask {
            id: int(kind, "id", &f[0])?,
            title: f[1].clone(),
            description: f[2].clone(),
            starts_on: optional_date(kind, "starts_on", &f[3])?,
            ends_on: optional_date(kind, "ends_on", &f[4])?,
            state: f[5].clone(),
            assignee_name: f.get(6).cloned().unwrap_or_default(),
        })
    }
}

/// `id, amount, date, concept, kind, user id`
impl FromFields for PayrollEntry {
    const KIND: RecordKind = RecordKind::PayrollEntry;
    const MIN_FIELDS: usize = 6;

    fn from_fields(f: &[String]) -> Result<Self, MalformedRecord> {
        let kind = Self::KIND.as_str();
        Ok(PayrollEntry {
            id: int(kind, "id", &f[0])?,
            amount: amount(kind, "amount", &f[1])?,
            paid_on: optional_date(kind, "paid_on", &f[2])?,
            concept: f[3].clone(),
            kind: f[4].clone(),
            user_id: int(kind, "user_id", &f[5])?,
        })
    }
}

/// `id, created, information, state, reporter id, reporter name`
impl FromFields for TaskReport {
    const KIND: RecordKind = RecordKind::TaskReport;
    const MIN_FIELDS: usize = 6;

    fn from_fields(f: &[String]) -> Result<Self, MalformedRecord> {
        let kind = Self::KIND.as_str();
        let created_on = optional_date(kind, "created_on", &f[1])?
            .ok_or_else(|| MalformedRecord::new(kind, "missing created_on"))?;
        Ok(TaskReport {
            id: int(kind, "id", &f[0])?,
            created_on,
            information: f[2].clone(),
            state: f[3].clone(),
            reporter_id: int(kind, "reporter_id", &f[4])?,
            reporter_name: f[5].clone(),
        })
    }
}

fn int(kind: &'static str, field: &str, text: &str) -> Result<i64, MalformedRecord> {
    text.trim()
        .parse()
        .map_err(|_| MalformedRecord::new(kind, format!("{} is not an integer: {:?}", field, text)))
}

fn amount(kind: &'static str, field: &str, text: &str) -> Result<f64, MalformedRecord> {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(MalformedRecord::new(kind, format!("{} is not a decimal: {:?}", field, text))),
    }
}

/// Parse an optional calendar date; empty text and the no-value tokens are `None`
pub fn optional_date(kind: &'static str, field: &str, text: &str) -> Result<Option<NaiveDate>, MalformedRecord> {
    let text = text.trim();
    if text.is_empty() || NO_VALUE_TOKENS.contains(&text) {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map(Some)
        .map_err(|_| MalformedRecord::new(kind, format!("{} is not a date: {:?}", field, text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str) -> Vec<String> {
        text.split("@Tr&m").map(str::to_string).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_session_user_from_login_row() {
        let fields = row("LOGIN_OK@Tr&m7@Tr&mAlice@Tr&ma@x.com@Tr&madmin@Tr&m1@Tr&mHR@Tr&m2020-01-01@Tr&mMain St");
        let user = decode_session_user(&fields).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.role, "admin");
        assert_eq!(user.hired_on, Some(date(2020, 1, 1)));
        assert_eq!(user.address, "Main St");
    }

    #[test]
    fn test_session_user_tolerates_missing_address_and_bad_department() {
        let fields = row("LOGIN_OK@Tr&m3@Tr&mBob@Tr&mb@x.com@Tr&mempleado@Tr&m@Tr&mSin departamento@Tr&mnull");
        let user = decode_session_user(&fields).unwrap();
        assert_eq!(user.department_id, 0);
        assert_eq!(user.hired_on, None);
        assert_eq!(user.address, "");
    }

    #[test]
    fn test_session_user_requires_marker() {
        let fields = row("LOGIN_ERROR@Tr&m3@Tr&mBob@Tr&mb@x.com@Tr&mempleado@Tr&m1@Tr&mHR@Tr&m");
        assert!(decode_session_user(&fields).is_err());
    }

    #[test]
    fn test_task_with_all_fields() {
        let fields = row("12@Tr&mRoof@Tr&mFix leak@Tr&m2024-03-01@Tr&mnull@Tr&m2024-04-01@Tr&men_curso@Tr&mAna@Tr&mLuis@Tr&m9");
        let task: Task = decode_row(&fields).unwrap();
        assert_eq!(task.id, 12);
        assert_eq!(task.created_on, Some(date(2024, 3, 1)));
        assert_eq!(task.starts_on, None);
        assert_eq!(task.ends_on, Some(date(2024, 4, 1)));
        assert_eq!(task.assignee_id, 9);
    }

    #[test]
    fn test_task_missing_trailing_field_is_dropped() {
        let fields = row("12@Tr&mRoof@Tr&mFix leak@Tr&m2024-03-01@Tr&m@Tr&m@Tr&men_curso@Tr&mAna@Tr&mLuis");
        assert_eq!(fields.len(), 9);
        let err = decode_row::<Task>(&fields).unwrap_err();
        assert_eq!(err.kind, "task");

        let tasks: Vec<Task> = decode_rows(&[fields]);
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_valid_rows_survive_malformed_neighbours_in_order() {
        let rows = vec![
            row("x@Tr&m100.0@Tr&m2024-01-31@Tr&mBroken@Tr&msalario@Tr&m7"),
            row("1@Tr&m1500.50@Tr&m2024-01-31@Tr&mEnero@Tr&msalario@Tr&m7"),
            row("2@Tr&mabc@Tr&m2024-01-31@Tr&mBad amount@Tr&mplus@Tr&m7"),
            row("3@Tr&m-80@Tr&m@Tr&mAdelanto@Tr&mdeduccion@Tr&m7"),
            row("4@Tr&m20@Tr&m31/01/2024@Tr&mBad date@Tr&mplus@Tr&m7"),
            row("5@Tr&m"),
            row("6@Tr&m45.25@Tr&mSin fecha@Tr&mHoras@Tr&mhora_extra@Tr&m7"),
        ];

        let entries: Vec<PayrollEntry> = decode_rows(&rows);
        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, [1, 3, 6]);
        assert_eq!(entries[0].amount, 1500.50);
        assert_eq!(entries[1].paid_on, None);
        assert!(entries[2].is_overtime());
    }

    #[test]
    fn test_assigned_task_optional_assignee() {
        let task: AssignedTask = decode_row(&row("4@Tr&mPaint@Tr&mWalls@Tr&m2024-02-01@Tr&mSin fecha@Tr&mfinalizada")).unwrap();
        assert_eq!(task.ends_on, None);
        assert_eq!(task.assignee_name, "");

        let task: AssignedTask = decode_row(&row("4@Tr&mPaint@Tr&mWalls@Tr&m@Tr&m@Tr&men_curso@Tr&mMarta")).unwrap();
        assert_eq!(task.assignee_name, "Marta");
    }

    #[test]
    fn test_report_requires_creation_date() {
        let ok: TaskReport = decode_row(&row("1@Tr&m2024-05-05@Tr&mHalf done@Tr&men_curso@Tr&m7@Tr&mAlice")).unwrap();
        assert_eq!(ok.created_on, date(2024, 5, 5));
        assert_eq!(ok.reporter_name, "Alice");

        assert!(decode_row::<TaskReport>(&row("1@Tr&m@Tr&mHalf done@Tr&men_curso@Tr&m7@Tr&mAlice")).is_err());
    }

    #[test]
    fn test_user_list_row_is_strict_about_department_id() {
        assert!(decode_row::<User>(&row("2@Tr&mEva@Tr&me@x.com@Tr&mjefe@Tr&m3@Tr&mIT@Tr&m2019-09-09@Tr&mCalle 1")).is_ok());
        assert!(decode_row::<User>(&row("2@Tr&mEva@Tr&me@x.com@Tr&mjefe@Tr&mIT@Tr&mIT@Tr&m2019-09-09@Tr&mCalle 1")).is_err());
    }

    #[test]
    fn test_summary_and_department() {
        let summary: UserSummary = decode_row(&row(" 5 @Tr&m Luis ")).unwrap();
        assert_eq!(summary, UserSummary { id: 5, name: "Luis".into() });

        let dept: Department = decode_row(&row(" Ventas ")).unwrap();
        assert_eq!(dept.name, "Ventas");
    }

    #[test]
    fn test_decode_records_wraps_variant() {
        let rows = vec![row("HR"), row("IT")];
        let records = decode_records(RecordKind::Department, &rows);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.kind() == RecordKind::Department));
    }

    #[test]
    fn test_optional_date_tokens() {
        assert_eq!(optional_date("t", "d", "").unwrap(), None);
        assert_eq!(optional_date("t", "d", "null").unwrap(), None);
        assert_eq!(optional_date("t", "d", "Sin fecha").unwrap(), None);
        assert_eq!(optional_date("t", "d", " 2021-12-31 ").unwrap(), Some(date(2021, 12, 31)));
        assert!(optional_date("t", "d", "2021-13-01").is_err());
    }
}
