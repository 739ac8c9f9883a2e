use crate::error::ScoringError;
use chrono::{DateTime, FixedOffset};

/// Share of the score lost by an issue created on the last day of the milestone.
pub const FINAL_DROP: f64 = 0.7;

/// Time based score multiplier for an issue created at `created`.
///
/// 1.0 for issues created on the first day, falling exponentially to
/// `1 - FINAL_DROP` for issues created on (or after) the last day. Days are
/// whole days since `start`.
pub fn decay(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    created: DateTime<FixedOffset>,
) -> Result<f64, ScoringError> {
    let duration = (end - start).num_days();
    if duration <= 0 {
        return Err(ScoringError::EmptyMilestoneWindow { start, end });
    }
    let created = created.min(end);
    let lateness = (created - start).num_days().max(0);

    let duration = duration as f64;
    let base = 1.0 + 1.0 / duration;
    let spread = base.powf(3.0 * duration) - 1.0;
    let shift = 1.0 + FINAL_DROP / spread;
    Ok((shift - FINAL_DROP * base.powf(3.0 * lateness as f64) / spread).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    const START: &str = "2023-01-01T00:00:00Z";
    const END: &str = "2023-01-31T00:00:00Z";

    #[test]
    fn full_score_on_first_day() {
        let value = decay(at(START), at(END), at(START)).unwrap();
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn drops_to_floor_on_last_day() {
        let value = decay(at(START), at(END), at(END)).unwrap();
        assert!((value - (1.0 - FINAL_DROP)).abs() < 1e-9);
    }

    #[test]
    fn issues_after_the_end_are_clamped() {
        let late = decay(at(START), at(END), at("2023-03-01T00:00:00Z")).unwrap();
        let last = decay(at(START), at(END), at(END)).unwrap();
        assert_eq!(late, last);
    }

    #[test]
    fn issues_before_the_start_get_full_score() {
        let early = decay(at(START), at(END), at("2022-12-01T00:00:00Z")).unwrap();
        assert!((early - 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_increasing_over_the_milestone() {
        let start = at(START);
        let mut previous = f64::INFINITY;
        for day in 0..=40 {
            let created = start + chrono::Duration::days(day);
            let value = decay(start, at(END), created).unwrap();
            assert!(value <= previous, "day {day}: {value} > {previous}");
            assert!((0.0..=1.0 + 1e-9).contains(&value));
            previous = value;
        }
        let middle = decay(start, at(END), at("2023-01-16T00:00:00Z")).unwrap();
        assert!(middle > 1.0 - FINAL_DROP && middle < 1.0);
    }

    #[test]
    fn empty_window_is_an_error() {
        let err = decay(at(START), at("2023-01-01T12:00:00Z"), at(START)).unwrap_err();
        assert!(matches!(err, ScoringError::EmptyMilestoneWindow { .. }));
        assert!(decay(at(END), at(START), at(START)).is_err());
    }
}
