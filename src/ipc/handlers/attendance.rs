use crate::attendance::{tally, AttendanceStatus};
use crate::config::AttendanceSettings;
use crate::ipc::handlers::setup::{load_settings, SetupSection};
use crate::ipc::helpers::{
    bad_params, db_err, get_optional_str, get_required_str, not_found, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use std::collections::HashMap;

fn parse_date(raw: &str, key: &str) -> Result<String, HandlerErr> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| bad_params(format!("{} must be YYYY-MM-DD", key)))
}

fn optional_date(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    get_optional_str(params, key)?
        .map(|s| parse_date(&s, key))
        .transpose()
}

fn attendance_record(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let student_id = get_required_str(params, "studentId")?;
    let date = parse_date(&get_required_str(params, "date")?, "date")?;
    let status_raw = get_required_str(params, "status")?;
    let Some(status) = AttendanceStatus::parse(&status_raw) else {
        return Err(bad_params(
            "status must be one of: present, absent, late, excused",
        ));
    };

    let class_section: Option<String> = conn
        .query_row(
            "SELECT section_id FROM classes WHERE id = ?",
            [&class_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(db_err("db_query_failed"))?;
    let Some(class_section) = class_section else {
        return Err(not_found("class"));
    };
    let student_section: Option<String> = conn
        .query_row(
            "SELECT section_id FROM students WHERE id = ?",
            [&student_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(db_err("db_query_failed"))?;
    let Some(student_section) = student_section else {
        return Err(not_found("student"));
    };
    if student_section != class_section {
        return Err(bad_params("student is not in this class's section"));
    }

    conn.execute(
        "INSERT INTO attendance_records(class_id, student_id, date, status)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(class_id, student_id, date) DO UPDATE SET
           status = excluded.status",
        (&class_id, &student_id, &date, status.as_str()),
    )
    .map_err(|e| {
        HandlerErr::new("db_update_failed", e.to_string())
            .with_details(json!({ "table": "attendance_records" }))
    })?;
    Ok(json!({ "ok": true }))
}

struct StudentRecords {
    student_id: String,
    full_name: String,
    statuses: Vec<AttendanceStatus>,
}

fn attendance_summary(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_optional_str(params, "classId")?;
    let student_id = get_optional_str(params, "studentId")?;
    if class_id.is_none() && student_id.is_none() {
        return Err(bad_params("classId or studentId is required"));
    }
    let from = optional_date(params, "from")?;
    let to = optional_date(params, "to")?;
    let settings: AttendanceSettings = load_settings(conn, SetupSection::Attendance)?;

    let mut stmt = conn
        .prepare(
            "SELECT ar.student_id, s.full_name, ar.status
             FROM attendance_records ar
             JOIN students s ON s.id = ar.student_id
             WHERE (?1 IS NULL OR ar.class_id = ?1)
               AND (?2 IS NULL OR ar.student_id = ?2)
               AND (?3 IS NULL OR ar.date >= ?3)
               AND (?4 IS NULL OR ar.date <= ?4)
             ORDER BY s.full_name, ar.student_id, ar.date",
        )
        .map_err(db_err("db_query_failed"))?;
    let rows = stmt
        .query_map((&class_id, &student_id, &from, &to), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;

    let mut order: Vec<StudentRecords> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (sid, name, status_raw) in rows {
        let Some(status) = AttendanceStatus::parse(&status_raw) else {
            tracing::warn!(student_id = %sid, status = %status_raw, "skipping unknown attendance status");
            continue;
        };
        let i = *index.entry(sid.clone()).or_insert_with(|| {
            order.push(StudentRecords {
                student_id: sid.clone(),
                full_name: name.clone(),
                statuses: Vec::new(),
            });
            order.len() - 1
        });
        order[i].statuses.push(status);
    }

    let late = settings.count_late_as_present;
    let overall = tally(order.iter().flat_map(|s| s.statuses.iter().copied()));
    let students: Vec<serde_json::Value> = order
        .iter()
        .map(|s| {
            let t = tally(s.statuses.iter().copied());
            json!({
                "studentId": s.student_id,
                "fullName": s.full_name,
                "present": t.present,
                "absent": t.absent,
                "late": t.late,
                "excused": t.excused,
                "total": t.total(),
                "attendanceRate": t.rate(late)
            })
        })
        .collect();

    Ok(json!({
        "students": students,
        "overall": {
            "tally": overall,
            "total": overall.total(),
            "attendanceRate": overall.rate(late)
        }
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.record" => Some(with_db(state, req, attendance_record)),
        "attendance.summary" => Some(with_db(state, req, attendance_summary)),
        _ => None,
    }
}
