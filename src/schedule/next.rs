use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use super::grid::{project, GridBounds};
use super::week::{Day, WEEK};
use super::{ClassScheduleItem, TimeSlot};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextClass<'a> {
    pub class_item: &'a ClassScheduleItem,
    pub slot: &'a TimeSlot,
    pub day: Day,
    pub is_today: bool,
    pub days_until: usize,
}

/// The chronologically next class after `now`, looking at most one week
/// ahead. A class that already ran earlier today is found again seven days
/// out, so `None` means the week has no classes at all.
pub fn next_class(items: &[ClassScheduleItem], now: NaiveDateTime) -> Option<NextClass<'_>> {
    let today = Day::from(now.weekday());
    let current = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0)?;
    let bounds = GridBounds::default();

    let later_today = project(items, today, bounds)
        .into_iter()
        .find(|e| e.slot.start_time > current);
    if let Some(entry) = later_today {
        return Some(NextClass {
            class_item: entry.class_item,
            slot: entry.slot,
            day: today,
            is_today: true,
            days_until: 0,
        });
    }

    (1..=WEEK.len()).find_map(|i| {
        let day = today.plus(i);
        project(items, day, bounds)
            .into_iter()
            .next()
            .map(|entry| NextClass {
                class_item: entry.class_item,
                slot: entry.slot,
                day,
                is_today: false,
                days_until: i,
            })
    })
}
