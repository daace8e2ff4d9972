use chrono::NaiveTime;
use thiserror::Error;

use super::week::{Day, WEEK};
use super::TimeSlot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnparseableSchedule {
    #[error("no schedule text")]
    Missing,
    #[error("schedule text is blank")]
    Empty,
    #[error("day range {start}-{end} runs backwards through the week")]
    ReversedDayRange { start: Day, end: Day },
    #[error("no known schedule format matched")]
    NoDialectMatched,
}

type Dialect = fn(&str) -> Option<Vec<TimeSlot>>;

// Priority order; the first dialect producing slots wins.
const DIALECTS: [Dialect; 3] = [comma_list, day_range, single_day];

/// Parses schedule text, reporting why it could not be understood.
pub fn try_parse_schedule(raw: Option<&str>) -> Result<Vec<TimeSlot>, UnparseableSchedule> {
    let raw = raw.ok_or(UnparseableSchedule::Missing)?;
    let text = raw.trim();
    if text.is_empty() {
        return Err(UnparseableSchedule::Empty);
    }

    for dialect in DIALECTS {
        if let Some(slots) = dialect(text) {
            if !slots.is_empty() {
                return Ok(slots);
            }
        }
    }

    if let Some((start, end, _)) = split_day_range(text) {
        if start > end {
            return Err(UnparseableSchedule::ReversedDayRange { start, end });
        }
    }
    Err(UnparseableSchedule::NoDialectMatched)
}

/// Total parse: anything unreadable becomes the Monday 08:00-09:00 placeholder.
pub fn parse_schedule(raw: Option<&str>) -> Vec<TimeSlot> {
    match try_parse_schedule(raw) {
        Ok(slots) => slots,
        Err(reason) => {
            tracing::warn!(
                raw = raw.unwrap_or_default(),
                %reason,
                "unparseable schedule, using placeholder slot"
            );
            vec![fallback_slot()]
        }
    }
}

pub(crate) fn fallback_slot() -> TimeSlot {
    TimeSlot {
        day: Day::Monday,
        start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
        end_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
        time_range: "08:00-09:00".to_string(),
    }
}

// "Monday 09:00-10:30, Wed 10:00-11:00"
fn comma_list(text: &str) -> Option<Vec<TimeSlot>> {
    if !text.contains(',') {
        return None;
    }
    Some(text.split(',').filter_map(day_and_range).collect())
}

// "Mon-Fri 9:00 AM to 11:00 AM"
fn day_range(text: &str) -> Option<Vec<TimeSlot>> {
    let (start_day, end_day, times) = split_day_range(text)?;
    let lower = times.to_ascii_lowercase();
    let at = lower.find(" to ")?;
    let start = parse_clock(&times[..at])?;
    let end = parse_clock(&times[at + 4..])?;
    if start >= end {
        return None;
    }
    // Equal days give that one day.
    if start_day > end_day {
        return Some(Vec::new());
    }

    let time_range = times.trim().to_string();
    Some(
        WEEK[start_day.index()..=end_day.index()]
            .iter()
            .map(|&day| TimeSlot {
                day,
                start_time: start,
                end_time: end,
                time_range: time_range.clone(),
            })
            .collect(),
    )
}

// "Tuesday 13:00-14:00"
fn single_day(text: &str) -> Option<Vec<TimeSlot>> {
    if text.contains(',') || text.to_ascii_lowercase().contains(" to ") {
        return None;
    }
    day_and_range(text).map(|slot| vec![slot])
}

fn split_day_range(text: &str) -> Option<(Day, Day, &str)> {
    let (days, times) = text.split_once(char::is_whitespace)?;
    let (a, b) = days.split_once('-')?;
    Some((Day::parse(a)?, Day::parse(b)?, times))
}

fn day_and_range(piece: &str) -> Option<TimeSlot> {
    let (day, range) = piece.trim().split_once(char::is_whitespace)?;
    let day = Day::parse(day)?;
    let range = range.trim();
    let (start, end) = range.split_once('-')?;
    let start_time = parse_clock(start)?;
    let end_time = parse_clock(end)?;
    if start_time >= end_time {
        return None;
    }
    Some(TimeSlot {
        day,
        start_time,
        end_time,
        time_range: range.to_string(),
    })
}

/// `H:MM` / `HH:MM` in 24h, or with an `AM`/`PM` suffix in 12h.
fn parse_clock(s: &str) -> Option<NaiveTime> {
    let upper = s.trim().to_ascii_uppercase();
    let (body, pm) = if let Some(b) = upper.strip_suffix("AM") {
        (b.trim_end(), Some(false))
    } else if let Some(b) = upper.strip_suffix("PM") {
        (b.trim_end(), Some(true))
    } else {
        (upper.as_str(), None)
    };

    let (h, m) = body.split_once(':')?;
    if m.len() != 2 {
        return None;
    }
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.parse().ok()?;
    let hour = match pm {
        None => h,
        Some(_) if h == 0 || h > 12 => return None,
        Some(false) if h == 12 => 0,
        Some(true) if h == 12 => 12,
        Some(true) => h + 12,
        Some(false) => h,
    };
    NaiveTime::from_hms_opt(hour, m, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn is_fallback(slots: &[TimeSlot]) -> bool {
        slots.len() == 1 && slots[0] == fallback_slot()
    }

    #[test]
    fn comma_list_yields_one_slot_per_piece() {
        let slots = parse_schedule(Some("Monday 09:00-10:30, Wednesday 10:00-11:00, Fri 13:15-14:00"));
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].day, Day::Monday);
        assert_eq!(slots[0].start_time, hm(9, 0));
        assert_eq!(slots[0].end_time, hm(10, 30));
        assert_eq!(slots[0].time_range, "09:00-10:30");
        assert_eq!(slots[1].day, Day::Wednesday);
        assert_eq!(slots[2].day, Day::Friday);
        assert!(slots.iter().all(|s| s.start_time < s.end_time));
    }

    #[test]
    fn comma_list_skips_unreadable_pieces() {
        let slots = parse_schedule(Some("Monday 08:00-09:00, after lunch, Wed 10:00-11:00"));
        let days: Vec<Day> = slots.iter().map(|s| s.day).collect();
        assert_eq!(days, vec![Day::Monday, Day::Wednesday]);
    }

    #[test]
    fn comma_list_with_no_readable_piece_falls_back() {
        assert!(is_fallback(&parse_schedule(Some("sometimes, maybe"))));
    }

    #[test]
    fn day_range_expands_inclusive_days() {
        let slots = parse_schedule(Some("Mon-Wed 9:00 AM to 11:00 AM"));
        let days: Vec<Day> = slots.iter().map(|s| s.day).collect();
        assert_eq!(days, vec![Day::Monday, Day::Tuesday, Day::Wednesday]);
        for s in &slots {
            assert_eq!(s.start_time, hm(9, 0));
            assert_eq!(s.end_time, hm(11, 0));
            assert_eq!(s.time_range, "9:00 AM to 11:00 AM");
        }
    }

    #[test]
    fn day_range_converts_noon_and_afternoon() {
        let slots = parse_schedule(Some("Tue-Thu 12:30 PM to 2:00 PM"));
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].start_time, hm(12, 30));
        assert_eq!(slots[0].end_time, hm(14, 0));
    }

    #[test]
    fn reversed_day_range_produces_no_slots() {
        assert_eq!(day_range("Fri-Mon 9:00 AM to 10:00 AM"), Some(Vec::new()));
        assert_eq!(
            try_parse_schedule(Some("Fri-Mon 9:00 AM to 10:00 AM")),
            Err(UnparseableSchedule::ReversedDayRange {
                start: Day::Friday,
                end: Day::Monday
            })
        );
        assert!(is_fallback(&parse_schedule(Some("Fri-Mon 9:00 AM to 10:00 AM"))));
    }

    #[test]
    fn same_day_range_yields_that_day() {
        let slots = parse_schedule(Some("Mon-Mon 9:00 AM to 10:00 AM"));
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].day, Day::Monday);
        assert_eq!(slots[0].start_time, hm(9, 0));
        assert_eq!(slots[0].end_time, hm(10, 0));
    }

    #[test]
    fn longer_day_abbreviations_are_read() {
        let slots = parse_schedule(Some("Tues 09:00-10:00, Thurs 11:00-12:00"));
        let days: Vec<Day> = slots.iter().map(|s| s.day).collect();
        assert_eq!(days, vec![Day::Tuesday, Day::Thursday]);
        let slots = parse_schedule(Some("Tues-Thurs 1:00 PM to 2:00 PM"));
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn single_day_range() {
        let slots = parse_schedule(Some("Thursday 13:00-14:30"));
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].day, Day::Thursday);
        assert_eq!(slots[0].duration_minutes(), 90);
    }

    #[test]
    fn blank_garbage_and_missing_fall_back() {
        assert!(is_fallback(&parse_schedule(Some(""))));
        assert!(is_fallback(&parse_schedule(Some("garbage"))));
        assert!(is_fallback(&parse_schedule(None)));
        assert_eq!(try_parse_schedule(None), Err(UnparseableSchedule::Missing));
        assert_eq!(try_parse_schedule(Some("  ")), Err(UnparseableSchedule::Empty));
        assert_eq!(
            try_parse_schedule(Some("garbage")),
            Err(UnparseableSchedule::NoDialectMatched)
        );
    }

    #[test]
    fn backwards_times_are_rejected() {
        assert!(is_fallback(&parse_schedule(Some("Monday 10:00-09:00"))));
    }

    #[test]
    fn clock_follows_twelve_hour_rules() {
        assert_eq!(parse_clock("12:00 AM"), Some(hm(0, 0)));
        assert_eq!(parse_clock("12:15 PM"), Some(hm(12, 15)));
        assert_eq!(parse_clock("1:05 pm"), Some(hm(13, 5)));
        assert_eq!(parse_clock("9:00AM"), Some(hm(9, 0)));
        assert_eq!(parse_clock("08:45"), Some(hm(8, 45)));
        assert_eq!(parse_clock("13:00 PM"), None);
        assert_eq!(parse_clock("24:00"), None);
        assert_eq!(parse_clock("9:5"), None);
    }

    #[test]
    fn parsed_days_match_encoded_days() {
        let raw = "Mon 08:00-09:00, Tue 09:00-10:00, Fri 11:00-12:00";
        let item = super::super::ClassScheduleItem::new(
            "c1".into(),
            "Math".into(),
            "Ms. Reyes".into(),
            "s1".into(),
            None,
            Some(raw),
        );
        let days: Vec<Day> = WEEK.iter().copied().filter(|d| item.meets_on(*d)).collect();
        assert_eq!(days, vec![Day::Monday, Day::Tuesday, Day::Friday]);
    }
}
