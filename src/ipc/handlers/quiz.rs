use crate::config::QuizSettings;
use crate::ipc::handlers::setup::{load_settings, SetupSection};
use crate::ipc::helpers::{bad_params, get_required_str, parse_datetime, parse_now, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::quiz::quiz_timer;
use rusqlite::Connection;
use serde_json::json;

fn quiz_timer_handler(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let started_raw = get_required_str(params, "startedAt")?;
    let Some(started_at) = parse_datetime(&started_raw) else {
        return Err(bad_params("startedAt must be YYYY-MM-DDTHH:MM[:SS]"));
    };
    let Some(limit) = params.get("timeLimitMinutes").and_then(|v| v.as_i64()) else {
        return Err(bad_params("missing timeLimitMinutes"));
    };
    if !(1..=600).contains(&limit) {
        return Err(bad_params("timeLimitMinutes must be between 1 and 600"));
    }
    let now = parse_now(params)?;
    let settings: QuizSettings = load_settings(conn, SetupSection::Quiz)?;

    let Some(timer) = quiz_timer(started_at, limit, now, &settings) else {
        return Err(bad_params("startedAt out of range"));
    };
    Ok(json!(timer))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "quiz.timer" => Some(with_db(state, req, quiz_timer_handler)),
        _ => None,
    }
}
