use crate::ipc::helpers::{
    db_err, get_optional_str, get_required_str, not_found, row_exists, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn students_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_optional_str(params, "sectionId")?;
    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.full_name, s.grade_level, s.section_id, sec.name, s.active
             FROM students s
             JOIN sections sec ON sec.id = s.section_id
             WHERE (?1 IS NULL OR s.section_id = ?1)
             ORDER BY sec.name, s.full_name",
        )
        .map_err(db_err("db_query_failed"))?;
    let students = stmt
        .query_map([&section_id], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "fullName": row.get::<_, String>(1)?,
                "gradeLevel": row.get::<_, Option<String>>(2)?,
                "sectionId": row.get::<_, String>(3)?,
                "sectionName": row.get::<_, String>(4)?,
                "active": row.get::<_, i64>(5)? != 0
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "students": students }))
}

fn students_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let full_name = get_required_str(params, "fullName")?;
    let explicit_grade = get_optional_str(params, "gradeLevel")?;

    // Students inherit the section's grade unless one is given.
    let section_grade: Option<Option<String>> = conn
        .query_row(
            "SELECT grade_level FROM sections WHERE id = ?",
            [&section_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(db_err("db_query_failed"))?;
    let Some(section_grade) = section_grade else {
        return Err(not_found("section"));
    };
    let grade_level = explicit_grade.or(section_grade);

    let student_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, section_id, full_name, grade_level, active) VALUES(?, ?, ?, ?, 1)",
        (&student_id, &section_id, &full_name, &grade_level),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string()).with_details(json!({ "table": "students" }))
    })?;

    Ok(json!({ "studentId": student_id, "gradeLevel": grade_level }))
}

fn parents_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let full_name = get_required_str(params, "fullName")?;
    let parent_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO parents(id, full_name) VALUES(?, ?)",
        (&parent_id, &full_name),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string()).with_details(json!({ "table": "parents" }))
    })?;
    Ok(json!({ "parentId": parent_id }))
}

fn parents_link(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let parent_id = get_required_str(params, "parentId")?;
    let student_id = get_required_str(params, "studentId")?;
    if !row_exists(conn, "parents", &parent_id)? {
        return Err(not_found("parent"));
    }
    if !row_exists(conn, "students", &student_id)? {
        return Err(not_found("student"));
    }

    // Children keep the order they were linked in; relinking is a no-op.
    conn.execute(
        "INSERT INTO parent_students(parent_id, student_id, sort_order)
         VALUES(?1, ?2, (SELECT COUNT(*) FROM parent_students WHERE parent_id = ?1))
         ON CONFLICT(parent_id, student_id) DO NOTHING",
        (&parent_id, &student_id),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string())
            .with_details(json!({ "table": "parent_students" }))
    })?;
    Ok(json!({ "ok": true }))
}

/// Child ids of a parent in link order.
pub fn parent_children_ids(conn: &Connection, parent_id: &str) -> Result<Vec<String>, HandlerErr> {
    if !row_exists(conn, "parents", parent_id)? {
        return Err(not_found("parent"));
    }
    let mut stmt = conn
        .prepare(
            "SELECT student_id FROM parent_students
             WHERE parent_id = ?
             ORDER BY sort_order, student_id",
        )
        .map_err(db_err("db_query_failed"))?;
    stmt.query_map([parent_id], |r| r.get::<_, String>(0))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))
}

fn parents_children(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let parent_id = get_required_str(params, "parentId")?;
    let ids = parent_children_ids(conn, &parent_id)?;
    let mut children = Vec::with_capacity(ids.len());
    for id in ids {
        let row = conn
            .query_row(
                "SELECT s.full_name, s.grade_level, sec.name
                 FROM students s JOIN sections sec ON sec.id = s.section_id
                 WHERE s.id = ?",
                [&id],
                |r| {
                    Ok(json!({
                        "id": id,
                        "fullName": r.get::<_, String>(0)?,
                        "gradeLevel": r.get::<_, Option<String>>(1)?,
                        "sectionName": r.get::<_, String>(2)?
                    }))
                },
            )
            .map_err(db_err("db_query_failed"))?;
        children.push(row);
    }
    Ok(json!({ "children": children }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_db(state, req, students_list)),
        "students.create" => Some(with_db(state, req, students_create)),
        "parents.create" => Some(with_db(state, req, parents_create)),
        "parents.link" => Some(with_db(state, req, parents_link)),
        "parents.children" => Some(with_db(state, req, parents_children)),
        _ => None,
    }
}
