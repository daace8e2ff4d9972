use serde::Serialize;

use crate::config::GradingSettings;

/// One-decimal rounding used for every displayed percentage:
/// `floor(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreState {
    Unscored,
    Scored(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAverage {
    pub scored_count: usize,
    pub unscored_count: usize,
    pub average_percent: Option<f64>,
}

/// Mean of per-assessment percentages. Unscored work is left out rather
/// than counted as zero, and so is anything with a non-positive `out_of`.
pub fn class_average<I>(scores: I) -> ClassAverage
where
    I: IntoIterator<Item = (ScoreState, f64)>,
{
    let mut scored_count = 0usize;
    let mut unscored_count = 0usize;
    let mut sum_percent = 0.0;

    for (state, out_of) in scores {
        match state {
            ScoreState::Scored(points) if out_of > 0.0 => {
                scored_count += 1;
                sum_percent += 100.0 * points / out_of;
            }
            _ => unscored_count += 1,
        }
    }

    let average_percent = if scored_count > 0 {
        Some(round_off_1_decimal(sum_percent / scored_count as f64))
    } else {
        None
    };
    ClassAverage {
        scored_count,
        unscored_count,
        average_percent,
    }
}

/// Every class with an average weighs the same.
pub fn overall_average(classes: &[ClassAverage]) -> Option<f64> {
    let averages: Vec<f64> = classes.iter().filter_map(|c| c.average_percent).collect();
    if averages.is_empty() {
        return None;
    }
    Some(round_off_1_decimal(
        averages.iter().sum::<f64>() / averages.len() as f64,
    ))
}

pub fn letter_grade(percent: f64, bands: &GradingSettings) -> &'static str {
    if percent >= bands.a_threshold {
        "A"
    } else if percent >= bands.b_threshold {
        "B"
    } else if percent >= bands.c_threshold {
        "C"
    } else if percent >= bands.d_threshold {
        "D"
    } else {
        "F"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bands() -> GradingSettings {
        GradingSettings {
            a_threshold: 90.0,
            b_threshold: 80.0,
            c_threshold: 70.0,
            d_threshold: 60.0,
        }
    }

    #[test]
    fn round_off_half_up() {
        assert_eq!(round_off_1_decimal(0.0), 0.0);
        assert_eq!(round_off_1_decimal(3.54), 3.5);
        assert_eq!(round_off_1_decimal(3.55), 3.6);
        assert_eq!(round_off_1_decimal(66.6666), 66.7);
    }

    #[test]
    fn unscored_work_is_excluded_not_zero() {
        let avg = class_average([
            (ScoreState::Scored(8.0), 10.0),
            (ScoreState::Scored(15.0), 20.0),
            (ScoreState::Unscored, 10.0),
        ]);
        assert_eq!(avg.scored_count, 2);
        assert_eq!(avg.unscored_count, 1);
        assert_eq!(avg.average_percent, Some(77.5));
    }

    #[test]
    fn no_scores_means_no_average() {
        let avg = class_average([(ScoreState::Unscored, 10.0)]);
        assert_eq!(avg.average_percent, None);
        assert_eq!(overall_average(&[avg]), None);
    }

    #[test]
    fn zero_out_of_is_ignored() {
        let avg = class_average([(ScoreState::Scored(5.0), 0.0), (ScoreState::Scored(5.0), 5.0)]);
        assert_eq!(avg.scored_count, 1);
        assert_eq!(avg.average_percent, Some(100.0));
    }

    #[test]
    fn overall_weighs_classes_equally() {
        let a = class_average([(ScoreState::Scored(9.0), 10.0)]);
        let b = class_average([
            (ScoreState::Scored(7.0), 10.0),
            (ScoreState::Scored(7.0), 10.0),
            (ScoreState::Scored(7.0), 10.0),
        ]);
        assert_eq!(overall_average(&[a, b]), Some(80.0));
    }

    #[test]
    fn letter_bands_are_inclusive_lower_bounds() {
        let b = bands();
        assert_eq!(letter_grade(90.0, &b), "A");
        assert_eq!(letter_grade(89.9, &b), "B");
        assert_eq!(letter_grade(70.0, &b), "C");
        assert_eq!(letter_grade(60.0, &b), "D");
        assert_eq!(letter_grade(12.0, &b), "F");
    }
}
