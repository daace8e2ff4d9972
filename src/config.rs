//! Process configuration from the environment, and typed views over the
//! workspace settings sections edited through `setup.update`.

use std::path::PathBuf;

use serde::Deserialize;

use crate::schedule::{Day, GridBounds, SCHOOL_WEEK, WEEK};

pub struct RuntimeConfig {
    pub log_filter: String,
    pub log_json: bool,
    pub workspace: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_json = lookup("LMSD_LOG_JSON")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self {
            log_filter: lookup("LMSD_LOG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "info".to_string()),
            log_json,
            workspace: lookup("LMSD_WORKSPACE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSettings {
    pub grid_start_hour: u32,
    pub grid_end_hour: u32,
    pub palette: Vec<String>,
    pub include_weekend: bool,
}

impl ScheduleSettings {
    pub fn bounds(&self) -> GridBounds {
        GridBounds {
            start_hour: self.grid_start_hour,
            end_hour: self.grid_end_hour,
        }
    }

    pub fn days(&self) -> &'static [Day] {
        if self.include_weekend {
            &WEEK
        } else {
            &SCHOOL_WEEK
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSettings {
    pub count_late_as_present: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingSettings {
    pub a_threshold: f64,
    pub b_threshold: f64,
    pub c_threshold: f64,
    pub d_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSettings {
    pub auto_submit: bool,
    pub grace_seconds: i64,
}
