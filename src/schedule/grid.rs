use chrono::{NaiveTime, Timelike};
use serde::Serialize;

use super::week::Day;
use super::{ClassScheduleItem, TimeSlot};

/// Hours covered by the weekly calendar, `start_hour` inclusive to
/// `end_hour` exclusive, one row per hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 18,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPosition {
    pub offset_minutes: i64,
    pub duration_minutes: i64,
}

impl GridBounds {
    pub fn span_minutes(self) -> i64 {
        (i64::from(self.end_hour) - i64::from(self.start_hour)) * 60
    }

    /// Offsets are relative to the grid start and may be negative or run
    /// past the grid end; nothing is clipped.
    pub fn position(self, start: NaiveTime, end: NaiveTime) -> GridPosition {
        let start_minutes = minutes_of_day(start);
        GridPosition {
            offset_minutes: start_minutes - i64::from(self.start_hour) * 60,
            duration_minutes: minutes_of_day(end) - start_minutes,
        }
    }

    pub fn contains(self, position: GridPosition) -> bool {
        position.offset_minutes >= 0
            && position.offset_minutes + position.duration_minutes <= self.span_minutes()
    }
}

fn minutes_of_day(t: NaiveTime) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

/// Position on the default 08:00 grid.
pub fn position_of(start: NaiveTime, end: NaiveTime) -> GridPosition {
    GridBounds::default().position(start, end)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridEntry<'a> {
    pub class_item: &'a ClassScheduleItem,
    pub slot: &'a TimeSlot,
    pub position: GridPosition,
    pub off_grid: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCalendarCell<'a> {
    pub day: Day,
    pub entries: Vec<GridEntry<'a>>,
}

/// Every slot of `items` falling on `day`, earliest first. A class meeting
/// twice on the same day contributes two entries.
pub fn project(items: &[ClassScheduleItem], day: Day, bounds: GridBounds) -> Vec<GridEntry<'_>> {
    let mut entries: Vec<GridEntry<'_>> = items
        .iter()
        .filter(|item| item.meets_on(day))
        .flat_map(|item| {
            item.slots
                .iter()
                .filter(move |slot| slot.day == day)
                .map(move |slot| {
                    let position = bounds.position(slot.start_time, slot.end_time);
                    GridEntry {
                        class_item: item,
                        slot,
                        position,
                        off_grid: !bounds.contains(position),
                    }
                })
        })
        .collect();
    // Stable, so classes starting together keep their input order.
    entries.sort_by_key(|e| e.slot.start_time);
    entries
}

pub fn week_grid<'a>(
    items: &'a [ClassScheduleItem],
    days: &[Day],
    bounds: GridBounds,
) -> Vec<WeeklyCalendarCell<'a>> {
    days.iter()
        .map(|&day| WeeklyCalendarCell {
            day,
            entries: project(items, day, bounds),
        })
        .collect()
}

/// Row labels for the grid, e.g. `08:00` .. `17:00`.
pub fn hour_rows(bounds: GridBounds) -> Vec<String> {
    (bounds.start_hour..bounds.end_hour)
        .map(|h| format!("{:02}:00", h))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::parse_schedule;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn class(id: &str, raw: &str) -> ClassScheduleItem {
        ClassScheduleItem {
            class_id: id.to_string(),
            subject_name: format!("Subject {}", id),
            teacher_name: "Teacher".to_string(),
            section_id: "sec".to_string(),
            room: None,
            slots: parse_schedule(Some(raw)),
        }
    }

    #[test]
    fn position_is_minutes_from_eight() {
        assert_eq!(
            position_of(hm(8, 0), hm(9, 0)),
            GridPosition {
                offset_minutes: 0,
                duration_minutes: 60
            }
        );
        assert_eq!(
            position_of(hm(9, 30), hm(10, 15)),
            GridPosition {
                offset_minutes: 90,
                duration_minutes: 45
            }
        );
    }

    #[test]
    fn early_and_late_classes_are_marked_off_grid_not_clipped() {
        let items = vec![class("early", "Monday 07:00-07:45"), class("late", "Monday 17:30-18:30")];
        let entries = project(&items, Day::Monday, GridBounds::default());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].position.offset_minutes, -60);
        assert!(entries[0].off_grid);
        assert_eq!(entries[1].position.offset_minutes, 570);
        assert!(entries[1].off_grid);
    }

    #[test]
    fn project_filters_by_day_and_sorts_by_start() {
        let items = vec![
            class("a", "Monday 13:00-14:00, Tuesday 09:00-10:00"),
            class("b", "Monday 09:00-10:00"),
            class("c", "Wednesday 08:00-09:00"),
            class("d", "Monday 09:00-09:30"),
        ];
        let entries = project(&items, Day::Monday, GridBounds::default());
        let ids: Vec<&str> = entries.iter().map(|e| e.class_item.class_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
        assert!(entries.iter().all(|e| !e.off_grid));
    }

    #[test]
    fn empty_day_projects_to_no_entries() {
        let items = vec![class("a", "Monday 09:00-10:00")];
        assert!(project(&items, Day::Saturday, GridBounds::default()).is_empty());
    }

    #[test]
    fn class_meeting_twice_a_day_gets_two_entries() {
        let items = vec![class("a", "Monday 09:00-10:00, Monday 14:00-15:00")];
        assert_eq!(project(&items, Day::Monday, GridBounds::default()).len(), 2);
    }

    #[test]
    fn week_grid_has_a_cell_per_requested_day() {
        let items = vec![class("a", "Mon-Fri 9:00 AM to 10:00 AM")];
        let cells = week_grid(&items, &crate::schedule::SCHOOL_WEEK, GridBounds::default());
        assert_eq!(cells.len(), 5);
        assert!(cells.iter().all(|c| c.entries.len() == 1));
    }

    #[test]
    fn hour_rows_cover_the_grid() {
        let rows = hour_rows(GridBounds::default());
        assert_eq!(rows.len(), 10);
        assert_eq!(rows.first().map(String::as_str), Some("08:00"));
        assert_eq!(rows.last().map(String::as_str), Some("17:00"));
    }
}
