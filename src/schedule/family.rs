use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use super::grid::{project, GridBounds, GridEntry};
use super::week::Day;
use super::{StudentScheduleView, TimeSlot};

const NEUTRAL_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    All,
    /// Not yet finished this week, including a class in progress.
    Upcoming,
    /// Finished earlier this week.
    Past,
}

impl TimeWindow {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "upcoming" => Some(Self::Upcoming),
            "past" => Some(Self::Past),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FamilyFilter<'a> {
    pub student_id: Option<&'a str>,
    pub window: TimeWindow,
    pub now: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLegend<'a> {
    pub student_id: &'a str,
    pub student_name: &'a str,
    pub grade_level: Option<&'a str>,
    pub section_name: &'a str,
    pub color: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyEntry<'a> {
    pub student_id: &'a str,
    pub color: &'a str,
    #[serde(flatten)]
    pub entry: GridEntry<'a>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyDay<'a> {
    pub day: Day,
    pub entries: Vec<FamilyEntry<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary<'a> {
    pub student_id: &'a str,
    pub student_name: &'a str,
    pub classes: usize,
    pub weekly_sessions: usize,
    pub weekly_minutes: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilySummary<'a> {
    pub total_students: usize,
    pub total_classes: usize,
    pub distinct_subjects: usize,
    pub total_weekly_sessions: usize,
    pub total_weekly_minutes: i64,
    pub per_student: Vec<StudentSummary<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilySchedule<'a> {
    pub students: Vec<StudentLegend<'a>>,
    pub days: Vec<FamilyDay<'a>>,
    pub summary: FamilySummary<'a>,
}

/// Colour for the student at `index`, cycling through the palette.
pub fn color_for(index: usize, palette: &[String]) -> &str {
    if palette.is_empty() {
        return NEUTRAL_COLOR;
    }
    palette[index % palette.len()].as_str()
}

/// Merges several children's timetables into one colour-coded week.
///
/// Colours follow each student's position in `students`, so they do not
/// shift when `filter.student_id` narrows the view. The summary reflects
/// the student filter but not the time window.
pub fn aggregate<'a>(
    students: &'a [StudentScheduleView],
    palette: &'a [String],
    days: &[Day],
    bounds: GridBounds,
    filter: &FamilyFilter<'_>,
) -> FamilySchedule<'a> {
    let colored: Vec<(&'a StudentScheduleView, &'a str)> = students
        .iter()
        .enumerate()
        .map(|(i, s)| (s, color_for(i, palette)))
        .collect();

    let legend = colored
        .iter()
        .map(|&(s, color)| StudentLegend {
            student_id: &s.student_id,
            student_name: &s.student_name,
            grade_level: s.grade_level.as_deref(),
            section_name: &s.section_name,
            color,
        })
        .collect();

    let selected: Vec<(&'a StudentScheduleView, &'a str)> = colored
        .into_iter()
        .filter(|(s, _)| filter.student_id.map_or(true, |id| s.student_id == id))
        .collect();

    let today = Day::from(filter.now.weekday());
    let current = NaiveTime::from_hms_opt(filter.now.hour(), filter.now.minute(), 0)
        .unwrap_or_default();

    let days = days
        .iter()
        .map(|&day| {
            let mut entries: Vec<FamilyEntry<'a>> = selected
                .iter()
                .flat_map(|&(s, color)| {
                    project(&s.class_items, day, bounds)
                        .into_iter()
                        .map(move |entry| FamilyEntry {
                            student_id: &s.student_id,
                            color,
                            entry,
                        })
                })
                .filter(|e| in_window(filter.window, e.entry.slot, today, current))
                .collect();
            entries.sort_by_key(|e| e.entry.slot.start_time);
            FamilyDay { day, entries }
        })
        .collect();

    FamilySchedule {
        students: legend,
        days,
        summary: summarize(selected.iter().map(|&(s, _)| s)),
    }
}

fn in_window(window: TimeWindow, slot: &TimeSlot, today: Day, current: NaiveTime) -> bool {
    let ended = slot.day < today || (slot.day == today && slot.end_time <= current);
    match window {
        TimeWindow::All => true,
        TimeWindow::Upcoming => !ended,
        TimeWindow::Past => ended,
    }
}

fn summarize<'a>(students: impl Iterator<Item = &'a StudentScheduleView>) -> FamilySummary<'a> {
    let mut summary = FamilySummary::default();
    let mut subjects: BTreeSet<&str> = BTreeSet::new();

    for s in students {
        let sessions = s.weekly_sessions();
        let minutes = s.weekly_minutes();
        subjects.extend(s.class_items.iter().map(|c| c.subject_name.as_str()));

        summary.total_students += 1;
        summary.total_classes += s.class_items.len();
        summary.total_weekly_sessions += sessions;
        summary.total_weekly_minutes += minutes;
        summary.per_student.push(StudentSummary {
            student_id: &s.student_id,
            student_name: &s.student_name,
            classes: s.class_items.len(),
            weekly_sessions: sessions,
            weekly_minutes: minutes,
        });
    }

    summary.distinct_subjects = subjects.len();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{ClassScheduleItem, SCHOOL_WEEK};
    use chrono::NaiveDate;

    fn palette() -> Vec<String> {
        vec!["#111111".to_string(), "#222222".to_string(), "#333333".to_string()]
    }

    fn friday_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid datetime")
    }

    fn student(id: &str, section: &str, classes: &[(&str, &str)]) -> StudentScheduleView {
        StudentScheduleView {
            student_id: id.to_string(),
            student_name: format!("Student {}", id),
            grade_level: Some("3".to_string()),
            section_name: section.to_string(),
            class_items: classes
                .iter()
                .enumerate()
                .map(|(i, (subject, raw))| {
                    ClassScheduleItem::new(
                        format!("{}-{}", id, i),
                        subject.to_string(),
                        "Teacher".to_string(),
                        section.to_string(),
                        None,
                        Some(raw),
                    )
                })
                .collect(),
        }
    }

    fn all_filter() -> FamilyFilter<'static> {
        FamilyFilter {
            student_id: None,
            window: TimeWindow::All,
            now: friday_noon(),
        }
    }

    #[test]
    fn zero_students_aggregate_to_empty_summary() {
        let pal = palette();
        let family = aggregate(&[], &pal, &SCHOOL_WEEK, GridBounds::default(), &all_filter());
        assert_eq!(family.summary.total_students, 0);
        assert_eq!(family.summary.total_classes, 0);
        assert_eq!(family.summary.total_weekly_sessions, 0);
        assert!(family.students.is_empty());
        assert!(family.days.iter().all(|d| d.entries.is_empty()));
    }

    #[test]
    fn same_subject_in_different_sections_gets_distinct_stable_colors() {
        let kids = vec![
            student("a", "3-A", &[("Math", "Monday 09:00-10:00")]),
            student("b", "3-B", &[("Math", "Monday 09:00-10:00")]),
        ];
        let pal = palette();
        let first = aggregate(&kids, &pal, &SCHOOL_WEEK, GridBounds::default(), &all_filter());
        let second = aggregate(&kids, &pal, &SCHOOL_WEEK, GridBounds::default(), &all_filter());

        let colors: Vec<&str> = first.students.iter().map(|s| s.color).collect();
        assert_eq!(colors, vec!["#111111", "#222222"]);
        let again: Vec<&str> = second.students.iter().map(|s| s.color).collect();
        assert_eq!(colors, again);
        assert_eq!(first.summary.distinct_subjects, 1);
    }

    #[test]
    fn palette_cycles_when_students_outnumber_colors() {
        let pal = palette();
        assert_eq!(color_for(3, &pal), "#111111");
        assert_eq!(color_for(4, &pal), "#222222");
        assert_eq!(color_for(0, &[]), NEUTRAL_COLOR);
    }

    #[test]
    fn sessions_count_every_weekly_occurrence() {
        let kids = vec![
            student("a", "3-A", &[("Math", "Mon-Wed 9:00 AM to 10:00 AM"), ("Art", "Friday 13:00-14:30")]),
            student("b", "5-A", &[("Science", "Tuesday 10:00-11:00")]),
        ];
        let pal = palette();
        let family = aggregate(&kids, &pal, &SCHOOL_WEEK, GridBounds::default(), &all_filter());
        let summary = &family.summary;
        assert_eq!(summary.total_students, 2);
        assert_eq!(summary.total_classes, 3);
        assert_eq!(summary.distinct_subjects, 3);
        assert_eq!(summary.total_weekly_sessions, 5);
        assert_eq!(summary.total_weekly_minutes, 3 * 60 + 90 + 60);
        assert_eq!(summary.per_student[0].weekly_sessions, 4);

        let tuesday = &family.days[1];
        let owners: Vec<&str> = tuesday.entries.iter().map(|e| e.student_id).collect();
        assert_eq!(owners, vec!["a", "b"]);
    }

    #[test]
    fn student_filter_keeps_colors_and_narrows_summary() {
        let kids = vec![
            student("a", "3-A", &[("Math", "Monday 09:00-10:00")]),
            student("b", "5-A", &[("Science", "Monday 10:00-11:00")]),
        ];
        let pal = palette();
        let filter = FamilyFilter {
            student_id: Some("b"),
            ..all_filter()
        };
        let family = aggregate(&kids, &pal, &SCHOOL_WEEK, GridBounds::default(), &filter);
        assert_eq!(family.students.len(), 2);
        assert_eq!(family.summary.total_students, 1);
        let monday = &family.days[0];
        assert_eq!(monday.entries.len(), 1);
        assert_eq!(monday.entries[0].color, "#222222");
    }

    #[test]
    fn time_window_splits_the_week_at_now() {
        let kids = vec![student(
            "a",
            "3-A",
            &[
                ("Math", "Monday 09:00-10:00"),
                ("Art", "Friday 11:00-12:00"),
                ("Music", "Friday 11:30-12:30"),
                ("Science", "Friday 14:00-15:00"),
            ],
        )];
        let pal = palette();
        let count = |window| {
            let filter = FamilyFilter {
                window,
                ..all_filter()
            };
            aggregate(&kids, &pal, &SCHOOL_WEEK, GridBounds::default(), &filter)
                .days
                .iter()
                .map(|d| d.entries.len())
                .sum::<usize>()
        };
        assert_eq!(count(TimeWindow::All), 4);
        assert_eq!(count(TimeWindow::Past), 2);
        assert_eq!(count(TimeWindow::Upcoming), 2);
    }
}
