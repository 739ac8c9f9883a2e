use chrono::{DateTime, FixedOffset};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Tasks in at least this many milestones are needed to meet the lecture topic quota.
pub const MIN_MILESTONES_FOR_QUOTA: usize = 2;
/// Milestone key for lecture topic tasks that belong to no milestone.
pub const NO_MILESTONE: &str = "No Milestone";

/// Points one issue is worth to each developer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueMetrics {
    pub points_by_developer: IndexMap<String, f64>,
    pub bonuses_by_developer: IndexMap<String, f64>,
    /// Score that still counts toward the milestone total but belongs to nobody.
    pub unattributed_points: f64,
}

impl IssueMetrics {
    /// Contribution to the milestone total. Bonuses never raise it.
    pub fn total_points(&self) -> f64 {
        self.points_by_developer.values().sum::<f64>() + self.unattributed_points
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperMetrics {
    pub tasks_by_sprint: Vec<u32>,
    pub points_closed: f64,
    /// points_closed / total points closed * 100
    pub percent_contribution: f64,
    /// min(points_closed / benchmark * 100, 100), zeroed by the sprint gate
    pub expected_grade: f64,
    /// Weighted blend of the milestone grade and `expected_grade`.
    pub blended_grade: f64,
    pub lecture_topic_tasks_closed: u32,
    #[serde(default)]
    pub point_percent_by_label: IndexMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneData {
    pub milestone: String,
    pub sprints: u32,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub total_points_closed: f64,
    pub dev_metrics: IndexMap<String, DeveloperMetrics>,
}

impl MilestoneData {
    pub fn new(
        milestone: impl ToString,
        sprints: u32,
        start_date: DateTime<FixedOffset>,
        end_date: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            milestone: milestone.to_string(),
            sprints,
            start_date,
            end_date,
            total_points_closed: 0.0,
            dev_metrics: IndexMap::new(),
        }
    }

    pub fn total_lecture_topic_tasks(&self) -> u32 {
        self.dev_metrics
            .values()
            .map(|m| m.lecture_topic_tasks_closed)
            .sum()
    }
}

/// Lecture topic tasks per developer per milestone, across the whole board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureTopicTaskData {
    pub total_lecture_topic_tasks: u32,
    pub milestones: IndexSet<String>,
    pub tasks_by_developer_by_milestone: IndexMap<String, IndexMap<String, u32>>,
}

impl LectureTopicTaskData {
    pub fn new(developers: &[String]) -> Self {
        Self {
            tasks_by_developer_by_milestone: developers
                .iter()
                .map(|dev| (dev.clone(), IndexMap::new()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn tasks_for(&self, developer: &str) -> u32 {
        self.tasks_by_developer_by_milestone
            .get(developer)
            .map(|by_milestone| by_milestone.values().sum())
            .unwrap_or(0)
    }

    /// Enough tasks overall, spread over at least [`MIN_MILESTONES_FOR_QUOTA`] milestones.
    pub fn met_quota(&self, developer: &str, quota: u32) -> bool {
        let Some(by_milestone) = self.tasks_by_developer_by_milestone.get(developer) else {
            return false;
        };
        let milestones_worked = by_milestone
            .iter()
            .filter(|(milestone, &tasks)| tasks > 0 && milestone.as_str() != NO_MILESTONE)
            .count();
        self.tasks_for(developer) >= quota && milestones_worked >= MIN_MILESTONES_FOR_QUOTA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bonuses_do_not_count_toward_total() {
        let metrics = IssueMetrics {
            points_by_developer: IndexMap::from([("a".to_string(), 2.0), ("b".to_string(), 2.0)]),
            bonuses_by_developer: IndexMap::from([("a".to_string(), 0.4)]),
            unattributed_points: 0.0,
        };
        assert_eq!(metrics.total_points(), 4.0);
    }

    #[test]
    fn quota_needs_two_milestones() {
        let mut data = LectureTopicTaskData::new(&["dev1".to_string(), "dev2".to_string()]);
        data.tasks_by_developer_by_milestone["dev1"].insert("M1".to_string(), 3);
        data.tasks_by_developer_by_milestone["dev2"].insert("M1".to_string(), 1);
        data.tasks_by_developer_by_milestone["dev2"].insert("M2".to_string(), 1);

        assert!(!data.met_quota("dev1", 2));
        assert!(data.met_quota("dev2", 2));
        assert!(!data.met_quota("dev2", 3));
        assert!(!data.met_quota("nobody", 0));
    }

    #[test]
    fn tasks_without_milestone_do_not_spread_the_quota() {
        let mut data = LectureTopicTaskData::new(&["dev1".to_string()]);
        data.tasks_by_developer_by_milestone["dev1"].insert("M1".to_string(), 1);
        data.tasks_by_developer_by_milestone["dev1"].insert(NO_MILESTONE.to_string(), 2);
        assert_eq!(data.tasks_for("dev1"), 3);
        assert!(!data.met_quota("dev1", 2));
    }
}
