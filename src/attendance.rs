use serde::Serialize;

use crate::grades::round_off_1_decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Some(Self::Present),
            "absent" | "a" => Some(Self::Absent),
            "late" | "l" => Some(Self::Late),
            "excused" | "e" => Some(Self::Excused),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
            Self::Excused => "excused",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTally {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
}

impl AttendanceTally {
    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Excused => self.excused += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.late + self.excused
    }

    /// Percent of non-excused days attended, one decimal. `None` when there
    /// is nothing to count.
    pub fn rate(&self, count_late_as_present: bool) -> Option<f64> {
        let counted = self.total() - self.excused;
        if counted == 0 {
            return None;
        }
        let attended = self.present + if count_late_as_present { self.late } else { 0 };
        Some(round_off_1_decimal(100.0 * attended as f64 / counted as f64))
    }
}

pub fn tally<I>(statuses: I) -> AttendanceTally
where
    I: IntoIterator<Item = AttendanceStatus>,
{
    let mut t = AttendanceTally::default();
    for s in statuses {
        t.add(s);
    }
    t
}
