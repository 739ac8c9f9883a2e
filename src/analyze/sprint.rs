use chrono::{DateTime, FixedOffset};

pub const SPRINT_DATE_FORMAT: &str = "%Y/%m/%d";

/// Splits `start..end` into `sprints` equal windows, returning the boundaries
/// between them. One sprint (or fewer) has no boundaries.
pub fn generate_sprint_cutoffs(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    sprints: u32,
) -> Vec<DateTime<FixedOffset>> {
    if sprints <= 1 {
        return vec![];
    }
    let total = end - start;
    let sprints = sprints as i32;
    (1..sprints).map(|i| start + total * i / sprints).collect()
}

/// Zero based sprint that `date` falls in: the number of cutoffs strictly before it.
pub fn current_sprint_index(
    date: DateTime<FixedOffset>,
    cutoffs: &[DateTime<FixedOffset>],
) -> usize {
    cutoffs.iter().filter(|&&cutoff| date > cutoff).count()
}

/// The sprint windows of one milestone.
#[derive(Debug, Clone, PartialEq)]
pub struct SprintSchedule {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub cutoffs: Vec<DateTime<FixedOffset>>,
}

impl SprintSchedule {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>, sprints: u32) -> Self {
        Self {
            start,
            end,
            cutoffs: generate_sprint_cutoffs(start, end, sprints),
        }
    }

    pub fn sprint_count(&self) -> usize {
        self.cutoffs.len() + 1
    }

    pub fn index_of(&self, date: DateTime<FixedOffset>) -> usize {
        current_sprint_index(date, &self.cutoffs)
    }

    pub fn bounds(&self, index: usize) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        let index = index.min(self.cutoffs.len());
        let since = match index {
            0 => self.start,
            i => self.cutoffs[i - 1],
        };
        let until = self.cutoffs.get(index).copied().unwrap_or(self.end);
        (since, until)
    }

    pub fn is_current(&self, index: usize, now: DateTime<FixedOffset>) -> bool {
        let (since, until) = self.bounds(index);
        since <= now && now <= until
    }

    /// `2025/01/27-2025/02/10`
    pub fn date_range_label(&self, index: usize) -> String {
        let (since, until) = self.bounds(index);
        format!(
            "{}-{}",
            since.format(SPRINT_DATE_FORMAT),
            until.format(SPRINT_DATE_FORMAT)
        )
    }
}
