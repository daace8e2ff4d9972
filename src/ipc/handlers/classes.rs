use crate::ipc::helpers::{
    bad_params, db_err, get_optional_str, get_required_str, not_found, row_exists, with_db,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn classes_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_optional_str(params, "sectionId")?;
    let mut stmt = conn
        .prepare(
            "SELECT c.id, c.section_id, sec.name, c.subject_name, c.teacher_name, c.raw_schedule, c.room
             FROM classes c
             JOIN sections sec ON sec.id = c.section_id
             WHERE (?1 IS NULL OR c.section_id = ?1)
             ORDER BY sec.name, c.subject_name",
        )
        .map_err(db_err("db_query_failed"))?;
    let classes = stmt
        .query_map([&section_id], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "sectionId": row.get::<_, String>(1)?,
                "sectionName": row.get::<_, String>(2)?,
                "subjectName": row.get::<_, String>(3)?,
                "teacherName": row.get::<_, String>(4)?,
                "schedule": row.get::<_, Option<String>>(5)?,
                "room": row.get::<_, Option<String>>(6)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "classes": classes }))
}

fn classes_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let subject_name = get_required_str(params, "subjectName")?;
    let teacher_name = get_required_str(params, "teacherName")?;
    let schedule = get_optional_str(params, "schedule")?;
    let room = get_optional_str(params, "room")?;

    if !row_exists(conn, "sections", &section_id)? {
        return Err(not_found("section"));
    }

    let class_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO classes(id, section_id, subject_name, teacher_name, raw_schedule, room)
         VALUES(?, ?, ?, ?, ?, ?)",
        (&class_id, &section_id, &subject_name, &teacher_name, &schedule, &room),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string()).with_details(json!({ "table": "classes" }))
    })?;

    Ok(json!({ "classId": class_id, "subjectName": subject_name }))
}

fn classes_update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let patch = match params.get("patch") {
        Some(v) if v.is_object() => v,
        _ => return Err(bad_params("patch must be an object")),
    };
    if !row_exists(conn, "classes", &class_id)? {
        return Err(not_found("class"));
    }

    let tx = conn.unchecked_transaction().map_err(db_err("db_tx_failed"))?;
    for key in patch.as_object().into_iter().flat_map(|o| o.keys()) {
        match key.as_str() {
            "subjectName" | "teacherName" => {
                let column = if key == "subjectName" { "subject_name" } else { "teacher_name" };
                let v = get_required_str(patch, key)?;
                let sql = format!("UPDATE classes SET {} = ? WHERE id = ?", column);
                tx.execute(&sql, (&v, &class_id))
                    .map_err(db_err("db_update_failed"))?;
            }
            "schedule" | "room" => {
                let column = if key == "schedule" { "raw_schedule" } else { "room" };
                let v = get_optional_str(patch, key)?;
                let sql = format!("UPDATE classes SET {} = ? WHERE id = ?", column);
                tx.execute(&sql, (&v, &class_id))
                    .map_err(db_err("db_update_failed"))?;
            }
            "sectionId" => {
                let v = get_required_str(patch, key)?;
                if !row_exists(&tx, "sections", &v)? {
                    return Err(not_found("section"));
                }
                tx.execute(
                    "UPDATE classes SET section_id = ? WHERE id = ?",
                    (&v, &class_id),
                )
                .map_err(db_err("db_update_failed"))?;
            }
            other => return Err(bad_params(format!("unknown class field: {}", other))),
        }
    }
    tx.commit().map_err(db_err("db_commit_failed"))?;
    Ok(json!({ "ok": true }))
}

fn classes_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if !row_exists(conn, "classes", &class_id)? {
        return Err(not_found("class"));
    }

    let tx = conn.unchecked_transaction().map_err(db_err("db_tx_failed"))?;
    // Dependency order; there is no ON DELETE CASCADE.
    let steps: [(&str, &str); 4] = [
        (
            "scores",
            "DELETE FROM scores
             WHERE assessment_id IN (SELECT id FROM assessments WHERE class_id = ?)",
        ),
        ("assessments", "DELETE FROM assessments WHERE class_id = ?"),
        ("attendance_records", "DELETE FROM attendance_records WHERE class_id = ?"),
        ("classes", "DELETE FROM classes WHERE id = ?"),
    ];
    for (table, sql) in steps {
        tx.execute(sql, [&class_id]).map_err(|e| {
            HandlerErr::new("db_delete_failed", e.to_string()).with_details(json!({ "table": table }))
        })?;
    }
    tx.commit().map_err(db_err("db_commit_failed"))?;

    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(with_db(state, req, classes_list)),
        "classes.create" => Some(with_db(state, req, classes_create)),
        "classes.update" => Some(with_db(state, req, classes_update)),
        "classes.delete" => Some(with_db(state, req, classes_delete)),
        _ => None,
    }
}
