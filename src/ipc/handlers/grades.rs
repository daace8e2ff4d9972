use crate::config::GradingSettings;
use crate::grades::{class_average, letter_grade, overall_average, ClassAverage, ScoreState};
use crate::ipc::handlers::setup::{load_settings, SetupSection};
use crate::ipc::helpers::{
    bad_params, db_err, get_optional_str, get_required_str, not_found, row_exists, with_db,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn grades_create_assessment(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let title = get_required_str(params, "title")?;
    let kind = get_required_str(params, "kind")?.to_ascii_lowercase();
    if kind != "assignment" && kind != "quiz" {
        return Err(bad_params("kind must be one of: assignment, quiz"));
    }
    let Some(out_of) = params.get("outOf").and_then(|v| v.as_f64()) else {
        return Err(bad_params("missing outOf"));
    };
    if !out_of.is_finite() || out_of <= 0.0 {
        return Err(bad_params("outOf must be > 0"));
    }
    let due_date = match get_optional_str(params, "dueDate")? {
        None => None,
        Some(raw) => Some(
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| bad_params("dueDate must be YYYY-MM-DD"))?
                .format("%Y-%m-%d")
                .to_string(),
        ),
    };
    if !row_exists(conn, "classes", &class_id)? {
        return Err(not_found("class"));
    }

    let assessment_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO assessments(id, class_id, title, kind, out_of, due_date)
         VALUES(?, ?, ?, ?, ?, ?)",
        (&assessment_id, &class_id, &title, &kind, out_of, &due_date),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string())
            .with_details(json!({ "table": "assessments" }))
    })?;
    Ok(json!({ "assessmentId": assessment_id }))
}

fn grades_set_score(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let assessment_id = get_required_str(params, "assessmentId")?;
    let student_id = get_required_str(params, "studentId")?;
    let points = match params.get("points") {
        None => return Err(bad_params("missing points")),
        Some(serde_json::Value::Null) => None,
        Some(v) => Some(
            v.as_f64()
                .ok_or_else(|| bad_params("points must be number or null"))?,
        ),
    };

    let row: Option<(f64, String)> = conn
        .query_row(
            "SELECT a.out_of, c.section_id
             FROM assessments a JOIN classes c ON c.id = a.class_id
             WHERE a.id = ?",
            [&assessment_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(db_err("db_query_failed"))?;
    let Some((out_of, class_section)) = row else {
        return Err(not_found("assessment"));
    };
    if let Some(p) = points {
        if !p.is_finite() || p < 0.0 || p > out_of {
            return Err(bad_params(format!("points must be between 0 and {}", out_of))
                .with_details(json!({ "outOf": out_of })));
        }
    }

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
        "INSERT INTO scores(assessment_id, student_id, points) VALUES(?, ?, ?)
         ON CONFLICT(assessment_id, student_id) DO UPDATE SET points = excluded.points",
        (&assessment_id, &student_id, points),
    )
    .map_err(|e| {
        HandlerErr::new("db_update_failed", e.to_string()).with_details(json!({ "table": "scores" }))
    })?;
    Ok(json!({ "ok": true }))
}

fn class_scores(
    conn: &Connection,
    class_id: &str,
    student_id: &str,
) -> Result<Vec<(ScoreState, f64)>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT a.out_of, sc.points
             FROM assessments a
             LEFT JOIN scores sc ON sc.assessment_id = a.id AND sc.student_id = ?2
             WHERE a.class_id = ?1
             ORDER BY a.due_date, a.id",
        )
        .map_err(db_err("db_query_failed"))?;
    stmt.query_map((class_id, student_id), |r| {
        let out_of: f64 = r.get(0)?;
        let state = match r.get::<_, Option<f64>>(1)? {
            Some(p) => ScoreState::Scored(p),
            None => ScoreState::Unscored,
        };
        Ok((state, out_of))
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(db_err("db_query_failed"))
}

fn grades_summary(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let section_id: Option<String> = conn
        .query_row(
            "SELECT section_id FROM students WHERE id = ?",
            [&student_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(db_err("db_query_failed"))?;
    let Some(section_id) = section_id else {
        return Err(not_found("student"));
    };
    let bands: GradingSettings = load_settings(conn, SetupSection::Grading)?;

    let mut stmt = conn
        .prepare(
            "SELECT id, subject_name FROM classes
             WHERE section_id = ?
             ORDER BY subject_name, id",
        )
        .map_err(db_err("db_query_failed"))?;
    let classes = stmt
        .query_map([&section_id], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;

    let mut averages: Vec<ClassAverage> = Vec::with_capacity(classes.len());
    let mut rows = Vec::with_capacity(classes.len());
    for (class_id, subject_name) in classes {
        let avg = class_average(class_scores(conn, &class_id, &student_id)?);
        rows.push(json!({
            "classId": class_id,
            "subjectName": subject_name,
            "scoredCount": avg.scored_count,
            "unscoredCount": avg.unscored_count,
            "averagePercent": avg.average_percent,
            "letter": avg.average_percent.map(|p| letter_grade(p, &bands))
        }));
        averages.push(avg);
    }
    let overall = overall_average(&averages);

    Ok(json!({
        "studentId": student_id,
        "classes": rows,
        "overallPercent": overall,
        "overallLetter": overall.map(|p| letter_grade(p, &bands))
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.createAssessment" => Some(with_db(state, req, grades_create_assessment)),
        "grades.setScore" => Some(with_db(state, req, grades_set_score)),
        "grades.summary" => Some(with_db(state, req, grades_summary)),
        _ => None,
    }
}
