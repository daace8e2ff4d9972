use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::config::QuizSettings;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizTimer {
    pub deadline: NaiveDateTime,
    pub remaining_seconds: i64,
    pub expired: bool,
    pub auto_submit: bool,
}

/// Countdown for an attempt started at `started_at`. The grace period only
/// delays the automatic submission, not the deadline shown to the student.
/// `None` when the deadline falls outside the representable calendar.
pub fn quiz_timer(
    started_at: NaiveDateTime,
    time_limit_minutes: i64,
    now: NaiveDateTime,
    settings: &QuizSettings,
) -> Option<QuizTimer> {
    let deadline = started_at.checked_add_signed(Duration::try_minutes(time_limit_minutes)?)?;
    let submit_at = deadline.checked_add_signed(Duration::try_seconds(settings.grace_seconds)?)?;
    let remaining_seconds = (deadline - now).num_seconds().max(0);
    Some(QuizTimer {
        deadline,
        remaining_seconds,
        expired: now >= deadline,
        auto_submit: settings.auto_submit && now >= submit_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .expect("valid datetime")
    }

    fn settings(auto_submit: bool, grace_seconds: i64) -> QuizSettings {
        QuizSettings {
            auto_submit,
            grace_seconds,
        }
    }

    #[test]
    fn counts_down_before_deadline() {
        let t = quiz_timer(at(9, 0, 0), 30, at(9, 10, 30), &settings(true, 0)).expect("timer");
        assert_eq!(t.deadline, at(9, 30, 0));
        assert_eq!(t.remaining_seconds, 19 * 60 + 30);
        assert!(!t.expired);
        assert!(!t.auto_submit);
    }

    #[test]
    fn expires_at_deadline_and_never_goes_negative() {
        let t = quiz_timer(at(9, 0, 0), 30, at(9, 45, 0), &settings(true, 0)).expect("timer");
        assert_eq!(t.remaining_seconds, 0);
        assert!(t.expired);
        assert!(t.auto_submit);
    }

    #[test]
    fn grace_period_delays_auto_submit() {
        let s = settings(true, 60);
        let t = quiz_timer(at(9, 0, 0), 30, at(9, 30, 30), &s).expect("timer");
        assert!(t.expired);
        assert!(!t.auto_submit);
        let t = quiz_timer(at(9, 0, 0), 30, at(9, 31, 0), &s).expect("timer");
        assert!(t.auto_submit);
    }

    #[test]
    fn auto_submit_can_be_turned_off() {
        let t = quiz_timer(at(9, 0, 0), 10, at(10, 0, 0), &settings(false, 0)).expect("timer");
        assert!(t.expired);
        assert!(!t.auto_submit);
    }

    #[test]
    fn deadline_past_the_calendar_end_is_none() {
        let started = NaiveDateTime::MAX - Duration::minutes(5);
        assert_eq!(quiz_timer(started, 30, started, &settings(true, 0)), None);
    }

    #[test]
    fn grace_past_the_calendar_end_is_none() {
        let started = NaiveDateTime::MAX - Duration::minutes(30);
        assert_eq!(quiz_timer(started, 30, started, &settings(true, 60)), None);
    }
}
