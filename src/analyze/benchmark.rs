use crate::error::ConfigError;

pub const MILESTONE_GRADE_WEIGHT: f64 = 0.4;
pub const INDIVIDUAL_GRADE_WEIGHT: f64 = 0.6;
pub const MAX_GRADE: f64 = 100.0;

/// How many extreme contributors are left out of the trimmed average.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OutlierTrim {
    pub lowest: usize,
    pub highest: usize,
}

impl Default for OutlierTrim {
    fn default() -> Self {
        Self {
            lowest: 1,
            highest: 1,
        }
    }
}

/// Average of `points` without its highest and lowest values.
///
/// The highest value is dropped only when positive and the lowest only when
/// non-zero, so a team of zero contributors removes nothing. The denominator
/// never falls below 1.
pub fn outlier_trimmed_average(points: &[f64], trim: OutlierTrim) -> f64 {
    let mut kept = points.to_vec();
    for _ in 0..trim.highest {
        let Some(index) = position_of(&kept, |a, b| a > b) else {
            break;
        };
        if kept[index] <= 0.0 {
            break;
        }
        kept.swap_remove(index);
    }
    for _ in 0..trim.lowest {
        let Some(index) = position_of(&kept, |a, b| a < b) else {
            break;
        };
        if kept[index] == 0.0 {
            break;
        }
        kept.swap_remove(index);
    }
    kept.iter().sum::<f64>() / kept.len().max(1) as f64
}

fn position_of(values: &[f64], better: impl Fn(f64, f64) -> bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &value) in values.iter().enumerate() {
        match best {
            Some(b) if !better(value, values[b]) => {}
            _ => best = Some(i),
        }
    }
    best
}

/// The point total that earns full credit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Benchmark(f64);

impl Benchmark {
    /// `max(1, min(plain average, trimmed average) / (milestone_grade / 100))`
    ///
    /// A target grade of 0 leaves the benchmark unbounded, so every grade is 0.
    pub fn compute(
        total_points: f64,
        developer_points: &[f64],
        milestone_grade: f64,
        trim: OutlierTrim,
    ) -> Self {
        if milestone_grade <= 0.0 {
            return Self(f64::INFINITY);
        }
        let untrimmed = total_points / developer_points.len().max(1) as f64;
        let trimmed = outlier_trimmed_average(developer_points, trim);
        Self((untrimmed.min(trimmed) / (milestone_grade / MAX_GRADE)).max(1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn individual_grade(&self, points: f64) -> f64 {
        (points / self.0 * MAX_GRADE).clamp(0.0, MAX_GRADE)
    }
}

/// Weighting of the group's milestone grade against a developer's own grade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeBlend {
    pub milestone: f64,
    pub individual: f64,
}

impl Default for GradeBlend {
    fn default() -> Self {
        Self {
            milestone: MILESTONE_GRADE_WEIGHT,
            individual: INDIVIDUAL_GRADE_WEIGHT,
        }
    }
}

impl GradeBlend {
    pub fn new(milestone: f64, individual: f64) -> Result<Self, ConfigError> {
        let valid = milestone >= 0.0
            && individual >= 0.0
            && ((milestone + individual) - 1.0).abs() < 1e-9;
        if !valid {
            return Err(ConfigError::InvalidGradeWeights {
                milestone,
                individual,
            });
        }
        Ok(Self {
            milestone,
            individual,
        })
    }

    pub fn blend(&self, milestone_grade: f64, individual_grade: f64) -> f64 {
        (self.milestone * milestone_grade + self.individual * individual_grade)
            .clamp(0.0, MAX_GRADE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trimmed(points: &[f64]) -> f64 {
        outlier_trimmed_average(points, OutlierTrim::default())
    }

    #[test]
    fn removes_one_min_and_one_max() {
        assert_eq!(trimmed(&[1.0, 5.0, 6.0, 100.0]), 5.5);
        assert_eq!(trimmed(&[4.0, 4.0, 4.0, 4.0]), 4.0);
        assert_eq!(trimmed(&[2.0, 9.0, 9.0]), 9.0);
    }

    #[test]
    fn zero_minimum_is_kept() {
        assert_eq!(trimmed(&[0.0, 6.0, 9.0, 30.0]), 5.0);
    }

    #[test]
    fn negative_minimum_is_dropped() {
        assert_eq!(trimmed(&[-2.0, 5.0, 6.0, 7.0]), 5.5);
        // a non-positive maximum stays, the negative minimum still goes
        assert_eq!(trimmed(&[-4.0, -1.0, 0.0]), -0.5);
    }

    #[test]
    fn degenerate_teams() {
        assert_eq!(trimmed(&[]), 0.0);
        assert_eq!(trimmed(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(trimmed(&[7.0]), 0.0);
        assert_eq!(trimmed(&[3.0, 7.0]), 0.0);
    }

    #[test]
    fn trim_is_configurable() {
        let none = OutlierTrim {
            lowest: 0,
            highest: 0,
        };
        assert_eq!(outlier_trimmed_average(&[1.0, 2.0, 9.0], none), 4.0);
        let two_high = OutlierTrim {
            lowest: 0,
            highest: 2,
        };
        assert_eq!(outlier_trimmed_average(&[1.0, 2.0, 9.0, 8.0], two_high), 1.5);
    }

    #[test]
    fn benchmark_uses_smaller_average() {
        // plain average 100 / 4 = 25, trimmed (5 + 10) / 2 = 7.5
        let points = [5.0, 10.0, 80.0, 5.0];
        let benchmark = Benchmark::compute(100.0, &points, 100.0, OutlierTrim::default());
        assert_eq!(benchmark.value(), 7.5);
        assert_eq!(benchmark.individual_grade(5.0), 5.0 / 7.5 * 100.0);
        assert_eq!(benchmark.individual_grade(80.0), 100.0);
    }

    #[test]
    fn benchmark_scales_with_target_grade_and_floors_at_one() {
        let points = [10.0, 10.0, 10.0];
        let benchmark = Benchmark::compute(30.0, &points, 50.0, OutlierTrim::default());
        assert_eq!(benchmark.value(), 20.0);
        assert_eq!(benchmark.individual_grade(10.0), 50.0);

        let idle = Benchmark::compute(0.0, &[0.0, 0.0], 100.0, OutlierTrim::default());
        assert_eq!(idle.value(), 1.0);
        assert_eq!(idle.individual_grade(0.0), 0.0);

        let no_devs = Benchmark::compute(0.0, &[], 100.0, OutlierTrim::default());
        assert_eq!(no_devs.value(), 1.0);
    }

    #[test]
    fn zero_target_grade_gives_zero() {
        let benchmark = Benchmark::compute(30.0, &[10.0, 20.0], 0.0, OutlierTrim::default());
        assert_eq!(benchmark.individual_grade(20.0), 0.0);
    }

    #[test]
    fn blend_weights() {
        let blend = GradeBlend::default();
        assert!((blend.blend(90.0, 50.0) - 66.0).abs() < 1e-9);
        assert!(GradeBlend::new(0.5, 0.6).is_err());
        assert!(GradeBlend::new(-0.5, 1.5).is_err());
        assert_eq!(GradeBlend::new(1.0, 0.0).unwrap().blend(80.0, 0.0), 80.0);
    }
}
