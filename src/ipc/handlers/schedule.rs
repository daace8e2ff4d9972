use crate::config::ScheduleSettings;
use crate::ipc::error::ok;
use crate::ipc::handlers::setup::{load_settings, SetupSection};
use crate::ipc::handlers::students::parent_children_ids;
use crate::ipc::helpers::{
    bad_params, get_optional_str, get_required_str, load_student_view, parse_now, with_db,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::schedule::{
    aggregate, hour_rows, next_class, parse_schedule, position_of, project, try_parse_schedule,
    week_grid, Day, FamilyFilter, StudentScheduleView, TimeSlot, TimeWindow,
};
use rusqlite::Connection;
use serde_json::json;
use std::collections::BTreeSet;

fn slots_json(slots: &[TimeSlot]) -> Vec<serde_json::Value> {
    slots
        .iter()
        .map(|slot| {
            json!({
                "day": slot.day,
                "startTime": slot.start_time.format("%H:%M").to_string(),
                "endTime": slot.end_time.format("%H:%M").to_string(),
                "timeRange": slot.time_range,
                "durationMinutes": slot.duration_minutes(),
                "position": position_of(slot.start_time, slot.end_time)
            })
        })
        .collect()
}

// Preview for cleaning up schedule text; positions use the default grid.
fn handle_schedule_parse(req: &Request) -> serde_json::Value {
    let raw = req.params.get("raw").and_then(|v| v.as_str());
    let result = match try_parse_schedule(raw) {
        Ok(slots) => json!({ "slots": slots_json(&slots), "fallback": false }),
        Err(reason) => json!({
            "slots": slots_json(&parse_schedule(raw)),
            "fallback": true,
            "reason": reason.to_string()
        }),
    };
    ok(&req.id, result)
}

fn student_json(view: &StudentScheduleView) -> serde_json::Value {
    let subjects: BTreeSet<&str> = view
        .class_items
        .iter()
        .map(|c| c.subject_name.as_str())
        .collect();
    json!({
        "id": view.student_id,
        "fullName": view.student_name,
        "gradeLevel": view.grade_level,
        "sectionName": view.section_name,
        "classCount": view.class_items.len(),
        "subjectCount": subjects.len(),
        "weeklySessions": view.weekly_sessions(),
        "weeklyMinutes": view.weekly_minutes()
    })
}

fn schedule_week(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let now = parse_now(params)?;
    let settings: ScheduleSettings = load_settings(conn, SetupSection::Schedule)?;
    let view = load_student_view(conn, &student_id)?;
    let bounds = settings.bounds();

    Ok(json!({
        "student": student_json(&view),
        "rows": hour_rows(bounds),
        "days": week_grid(&view.class_items, settings.days(), bounds),
        "nextClass": next_class(&view.class_items, now)
    }))
}

fn schedule_day(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let day_raw = get_required_str(params, "day")?;
    let Some(day) = Day::parse(&day_raw) else {
        return Err(bad_params(format!("unknown day: {}", day_raw)));
    };
    let settings: ScheduleSettings = load_settings(conn, SetupSection::Schedule)?;
    let view = load_student_view(conn, &student_id)?;

    Ok(json!({
        "day": day,
        "entries": project(&view.class_items, day, settings.bounds())
    }))
}

fn schedule_next(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let now = parse_now(params)?;
    let view = load_student_view(conn, &student_id)?;
    Ok(json!({ "nextClass": next_class(&view.class_items, now) }))
}

fn family_student_ids(conn: &Connection, params: &serde_json::Value) -> Result<Vec<String>, HandlerErr> {
    if let Some(parent_id) = get_optional_str(params, "parentId")? {
        return parent_children_ids(conn, &parent_id);
    }
    let Some(ids) = params.get("studentIds").and_then(|v| v.as_array()) else {
        return Err(bad_params("parentId or studentIds is required"));
    };
    // First mention wins so a repeated id keeps its colour slot.
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for v in ids {
        let id = v
            .as_str()
            .map(str::trim)
            .ok_or_else(|| bad_params("studentIds must be strings"))?;
        if !out.iter().any(|seen| seen == id) {
            out.push(id.to_string());
        }
    }
    Ok(out)
}

fn schedule_family(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let ids = family_student_ids(conn, params)?;
    let selected = get_optional_str(params, "studentId")?;
    let window = match get_optional_str(params, "window")? {
        None => TimeWindow::All,
        Some(w) => TimeWindow::parse(&w)
            .ok_or_else(|| bad_params("window must be one of: all, upcoming, past"))?,
    };
    let now = parse_now(params)?;
    let settings: ScheduleSettings = load_settings(conn, SetupSection::Schedule)?;

    let views = ids
        .iter()
        .map(|id| load_student_view(conn, id))
        .collect::<Result<Vec<_>, _>>()?;

    let filter = FamilyFilter {
        student_id: selected.as_deref(),
        window,
        now,
    };
    let family = aggregate(
        &views,
        &settings.palette,
        settings.days(),
        settings.bounds(),
        &filter,
    );
    let next_classes: Vec<serde_json::Value> = views
        .iter()
        .filter(|v| filter.student_id.map_or(true, |id| v.student_id == id))
        .map(|v| {
            json!({
                "studentId": v.student_id,
                "nextClass": next_class(&v.class_items, now)
            })
        })
        .collect();

    Ok(json!({
        "students": family.students,
        "rows": hour_rows(settings.bounds()),
        "days": family.days,
        "summary": family.summary,
        "nextClasses": next_classes
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.parse" => Some(handle_schedule_parse(req)),
        "schedule.week" => Some(with_db(state, req, schedule_week)),
        "schedule.day" => Some(with_db(state, req, schedule_day)),
        "schedule.next" => Some(with_db(state, req, schedule_next)),
        "schedule.family" => Some(with_db(state, req, schedule_family)),
        _ => None,
    }
}
