use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::HandlerErr;
use crate::ipc::types::{AppState, Request};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
pub enum SetupSection {
    Schedule,
    Attendance,
    Grading,
    Quiz,
}

const ALL_SECTIONS: [SetupSection; 4] = [
    SetupSection::Schedule,
    SetupSection::Attendance,
    SetupSection::Grading,
    SetupSection::Quiz,
];

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "schedule" => Some(Self::Schedule),
            "attendance" => Some(Self::Attendance),
            "grading" => Some(Self::Grading),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Attendance => "attendance",
            Self::Grading => "grading",
            Self::Quiz => "quiz",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Schedule => "setup.schedule",
            Self::Attendance => "setup.attendance",
            Self::Grading => "setup.grading",
            Self::Quiz => "setup.quiz",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Schedule => json!({
            "gridStartHour": 8,
            "gridEndHour": 18,
            "palette": ["#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899"],
            "includeWeekend": false
        }),
        SetupSection::Attendance => json!({
            "countLateAsPresent": true
        }),
        SetupSection::Grading => json!({
            "aThreshold": 90.0,
            "bThreshold": 80.0,
            "cThreshold": 70.0,
            "dThreshold": 60.0
        }),
        SetupSection::Quiz => json!({
            "autoSubmit": true,
            "graceSeconds": 0
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool()
        .ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_percent(v: &Value, key: &str) -> Result<f64, String> {
    let n = v
        .as_f64()
        .ok_or_else(|| format!("{} must be a number", key))?;
    if !(0.0..=100.0).contains(&n) {
        return Err(format!("{} must be in 0..=100", key));
    }
    Ok(n)
}

fn parse_palette(v: &Value, key: &str) -> Result<Value, String> {
    let items = v
        .as_array()
        .ok_or_else(|| format!("{} must be an array of strings", key))?;
    if items.is_empty() || items.len() > 24 {
        return Err(format!("{} must have 1..=24 colours", key));
    }
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let s = item
            .as_str()
            .map(str::trim)
            .ok_or_else(|| format!("{} must be an array of strings", key))?;
        if s.is_empty() || s.len() > 32 {
            return Err(format!("{} entries must be 1..=32 characters", key));
        }
        out.push(Value::String(s.to_string()));
    }
    Ok(Value::Array(out))
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Schedule => match k.as_str() {
                "gridStartHour" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 23)?));
                }
                "gridEndHour" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 24)?));
                }
                "palette" => {
                    obj.insert(k.clone(), parse_palette(v, k)?);
                }
                "includeWeekend" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                _ => return Err(format!("unknown schedule field: {}", k)),
            },
            SetupSection::Attendance => match k.as_str() {
                "countLateAsPresent" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                _ => return Err(format!("unknown attendance field: {}", k)),
            },
            SetupSection::Grading => match k.as_str() {
                "aThreshold" | "bThreshold" | "cThreshold" | "dThreshold" => {
                    obj.insert(k.clone(), Value::from(parse_percent(v, k)?));
                }
                _ => return Err(format!("unknown grading field: {}", k)),
            },
            SetupSection::Quiz => match k.as_str() {
                "autoSubmit" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                "graceSeconds" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 300)?));
                }
                _ => return Err(format!("unknown quiz field: {}", k)),
            },
        }
    }
    check_section(section, obj)
}

fn check_section(section: SetupSection, obj: &Map<String, Value>) -> Result<(), String> {
    let num = |k: &str| obj.get(k).and_then(Value::as_f64).unwrap_or(0.0);
    match section {
        SetupSection::Schedule => {
            if num("gridEndHour") <= num("gridStartHour") {
                return Err("gridEndHour must be after gridStartHour".into());
            }
        }
        SetupSection::Grading => {
            let bands = [
                num("aThreshold"),
                num("bThreshold"),
                num("cThreshold"),
                num("dThreshold"),
            ];
            if bands.windows(2).any(|w| w[0] <= w[1]) {
                return Err("grade thresholds must strictly decrease from A to D".into());
            }
        }
        SetupSection::Attendance | SetupSection::Quiz => {}
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a malformed saved section must not block reads.
            let mut merged = current.clone();
            if merge_section_patch(section, &mut merged, saved_obj).is_ok() {
                current = merged;
            }
        }
    }
    Ok(current)
}

/// Typed settings for a section, defaults filled in.
pub fn load_settings<T: DeserializeOwned>(
    conn: &rusqlite::Connection,
    section: SetupSection,
) -> Result<T, HandlerErr> {
    let value = load_section(conn, section)
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    serde_json::from_value(value).map_err(|e| {
        HandlerErr::new("settings_invalid", e.to_string())
            .with_details(json!({ "section": section.name() }))
    })
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut out = Map::new();
    for section in ALL_SECTIONS {
        match load_section(conn, section) {
            Ok(v) => {
                out.insert(section.name().to_string(), v);
            }
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    ok(&req.id, Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section.name(), "settings updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
