use chrono::{Local, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::schedule::{ClassScheduleItem, StudentScheduleView};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> Value {
        if self.code.starts_with("db_") {
            tracing::warn!(id, code = self.code, message = %self.message, "request failed");
        }
        err(id, self.code, self.message, self.details)
    }
}

pub fn bad_params(message: impl Into<String>) -> HandlerErr {
    HandlerErr::new("bad_params", message)
}

pub fn not_found(what: &str) -> HandlerErr {
    HandlerErr::new("not_found", format!("{} not found", what))
}

/// Maps a rusqlite error onto a handler error with the given code.
pub fn db_err(code: &'static str) -> impl Fn(rusqlite::Error) -> HandlerErr {
    move |e| HandlerErr::new(code, e.to_string())
}

/// Runs `f` against the open workspace, turning its outcome into a response.
pub fn with_db(
    state: &AppState,
    req: &Request,
    f: impl FnOnce(&Connection, &Value) -> Result<Value, HandlerErr>,
) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    let s = params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| bad_params(format!("missing {}", key)))?;
    if s.is_empty() {
        return Err(bad_params(format!("{} must not be empty", key)));
    }
    Ok(s)
}

/// Absent, null and blank strings all read as `None`.
pub fn get_optional_str(params: &Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let t = s.trim();
            Ok((!t.is_empty()).then(|| t.to_string()))
        }
        Some(_) => Err(bad_params(format!("{} must be string or null", key))),
    }
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let t = s.trim();
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(t, fmt).ok())
}

/// `params.now` when given, otherwise the local wall clock.
pub fn parse_now(params: &Value) -> Result<NaiveDateTime, HandlerErr> {
    match get_optional_str(params, "now")? {
        Some(s) => parse_datetime(&s)
            .ok_or_else(|| bad_params("now must be YYYY-MM-DDTHH:MM[:SS]")),
        None => Ok(Local::now().naive_local()),
    }
}

pub fn row_exists(conn: &Connection, table: &str, id: &str) -> Result<bool, HandlerErr> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    conn.query_row(&sql, [id], |r| r.get::<_, i64>(0))
        .optional()
        .map(|v| v.is_some())
        .map_err(db_err("db_query_failed"))
}

pub fn load_section_classes(
    conn: &Connection,
    section_id: &str,
) -> Result<Vec<ClassScheduleItem>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, subject_name, teacher_name, section_id, room, raw_schedule
             FROM classes
             WHERE section_id = ?
             ORDER BY subject_name, id",
        )
        .map_err(db_err("db_query_failed"))?;
    stmt.query_map([section_id], |r| {
        let raw: Option<String> = r.get(5)?;
        Ok(ClassScheduleItem::new(
            r.get(0)?,
            r.get(1)?,
            r.get(2)?,
            r.get(3)?,
            r.get(4)?,
            raw.as_deref(),
        ))
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(db_err("db_query_failed"))
}

pub fn load_student_view(
    conn: &Connection,
    student_id: &str,
) -> Result<StudentScheduleView, HandlerErr> {
    let row: Option<(String, Option<String>, String, String)> = conn
        .query_row(
            "SELECT s.full_name, s.grade_level, s.section_id, sec.name
             FROM students s
             JOIN sections sec ON sec.id = s.section_id
             WHERE s.id = ?",
            [student_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()
        .map_err(db_err("db_query_failed"))?;
    let Some((full_name, grade_level, section_id, section_name)) = row else {
        return Err(not_found("student"));
    };

    Ok(StudentScheduleView {
        student_id: student_id.to_string(),
        student_name: full_name,
        grade_level,
        section_name,
        class_items: load_section_classes(conn, &section_id)?,
    })
}
