use serde::Serialize;

/// Day of the week in the fixed Monday..Sunday order used for range expansion
/// and wraparound arithmetic. Independent of any date library's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

pub const WEEK: [Day; 7] = [
    Day::Monday,
    Day::Tuesday,
    Day::Wednesday,
    Day::Thursday,
    Day::Friday,
    Day::Saturday,
    Day::Sunday,
];

pub const SCHOOL_WEEK: [Day; 5] = [
    Day::Monday,
    Day::Tuesday,
    Day::Wednesday,
    Day::Thursday,
    Day::Friday,
];

impl Day {
    pub fn index(self) -> usize {
        match self {
            Day::Monday => 0,
            Day::Tuesday => 1,
            Day::Wednesday => 2,
            Day::Thursday => 3,
            Day::Friday => 4,
            Day::Saturday => 5,
            Day::Sunday => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }

    /// The day `n` days after this one, wrapping Sunday -> Monday.
    pub fn plus(self, n: usize) -> Day {
        WEEK[(self.index() + n) % WEEK.len()]
    }

    /// Accepts full names and any prefix of three letters or more
    /// (`Tue`, `Tues`, `Thurs`), any case.
    pub fn parse(s: &str) -> Option<Day> {
        let t = s.trim().trim_end_matches('.').to_ascii_lowercase();
        if t.len() < 3 {
            return None;
        }
        WEEK.iter()
            .copied()
            .find(|d| d.name().to_ascii_lowercase().starts_with(&t))
    }
}

impl From<chrono::Weekday> for Day {
    fn from(w: chrono::Weekday) -> Self {
        WEEK[w.num_days_from_monday() as usize]
    }
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_full_names_and_abbreviations() {
        assert_eq!(Day::parse("Monday"), Some(Day::Monday));
        assert_eq!(Day::parse("wed"), Some(Day::Wednesday));
        assert_eq!(Day::parse("SUN"), Some(Day::Sunday));
        assert_eq!(Day::parse("Thu."), Some(Day::Thursday));
        assert_eq!(Day::parse("Tues"), Some(Day::Tuesday));
        assert_eq!(Day::parse("thurs."), Some(Day::Thursday));
        assert_eq!(Day::parse("Wednes"), Some(Day::Wednesday));
        assert_eq!(Day::parse("Mo"), None);
        assert_eq!(Day::parse("Mondays"), None);
        assert_eq!(Day::parse("Funday"), None);
    }

    #[test]
    fn plus_wraps_past_sunday() {
        assert_eq!(Day::Friday.plus(3), Day::Monday);
        assert_eq!(Day::Sunday.plus(1), Day::Monday);
        assert_eq!(Day::Wednesday.plus(7), Day::Wednesday);
    }

    #[test]
    fn chrono_weekday_maps_onto_week_order() {
        assert_eq!(Day::from(chrono::Weekday::Mon), Day::Monday);
        assert_eq!(Day::from(chrono::Weekday::Sun), Day::Sunday);
    }
}
