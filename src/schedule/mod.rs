//! Schedule projection: parse free-text class schedules into time slots,
//! lay them out on a weekly grid, find the next class and merge the
//! schedules of several children for a parent view.

mod family;
mod grid;
mod next;
mod parser;
mod week;

pub use family::{aggregate, FamilyFilter, TimeWindow};
pub use grid::{hour_rows, position_of, project, week_grid, GridBounds};
pub use next::next_class;
pub use parser::{parse_schedule, try_parse_schedule};
pub use week::{Day, SCHOOL_WEEK, WEEK};

use chrono::NaiveTime;
use serde::Serialize;

/// One weekly block of a class, normalised to 24h times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub day: Day,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// Range as the source text wrote it, for display.
    pub time_range: String,
}

impl TimeSlot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassScheduleItem {
    pub class_id: String,
    pub subject_name: String,
    pub teacher_name: String,
    pub section_id: String,
    pub room: Option<String>,
    pub slots: Vec<TimeSlot>,
}

impl ClassScheduleItem {
    /// A class with no schedule text has no slots; it is not given the
    /// placeholder slot.
    pub fn new(
        class_id: String,
        subject_name: String,
        teacher_name: String,
        section_id: String,
        room: Option<String>,
        raw_schedule: Option<&str>,
    ) -> Self {
        let slots = match raw_schedule {
            Some(raw) => parse_schedule(Some(raw)),
            None => Vec::new(),
        };
        Self {
            class_id,
            subject_name,
            teacher_name,
            section_id,
            room,
            slots,
        }
    }

    pub fn meets_on(&self, day: Day) -> bool {
        self.slots.iter().any(|s| s.day == day)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentScheduleView {
    pub student_id: String,
    pub student_name: String,
    pub grade_level: Option<String>,
    pub section_name: String,
    pub class_items: Vec<ClassScheduleItem>,
}

impl StudentScheduleView {
    pub fn weekly_sessions(&self) -> usize {
        self.class_items.iter().map(|c| c.slots.len()).sum()
    }

    pub fn weekly_minutes(&self) -> i64 {
        self.class_items
            .iter()
            .flat_map(|c| c.slots.iter())
            .map(TimeSlot::duration_minutes)
            .sum()
    }
}

pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format("%H:%M"))
    }
}
