use crate::ipc::helpers::{db_err, get_optional_str, get_required_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn sections_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    // Correlated subqueries avoid double-counting from joins.
    let mut stmt = conn
        .prepare(
            "SELECT
               sec.id,
               sec.name,
               sec.grade_level,
               (SELECT COUNT(*) FROM students s WHERE s.section_id = sec.id) AS student_count,
               (SELECT COUNT(*) FROM classes c WHERE c.section_id = sec.id) AS class_count
             FROM sections sec
             ORDER BY sec.grade_level, sec.name",
        )
        .map_err(db_err("db_query_failed"))?;
    let sections = stmt
        .query_map([], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "gradeLevel": row.get::<_, Option<String>>(2)?,
                "studentCount": row.get::<_, i64>(3)?,
                "classCount": row.get::<_, i64>(4)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "sections": sections }))
}

fn sections_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let grade_level = get_optional_str(params, "gradeLevel")?;

    let section_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO sections(id, name, grade_level) VALUES(?, ?, ?)",
        (&section_id, &name, &grade_level),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string()).with_details(json!({ "table": "sections" }))
    })?;

    Ok(json!({ "sectionId": section_id, "name": name, "gradeLevel": grade_level }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sections.list" => Some(with_db(state, req, sections_list)),
        "sections.create" => Some(with_db(state, req, sections_create)),
        _ => None,
    }
}
