use crate::analyze::fan_out::Subscriber;
use crate::error::EngineError;
use crate::model::{Issue, LectureTopicTaskData, Roster, NO_MILESTONE};
use tracing::warn;

/// Counts lecture topic tasks per developer and per milestone across the whole board.
pub struct LectureTopicTally {
    roster: Roster,
    count_open_issues: bool,
    data: LectureTopicTaskData,
}

impl LectureTopicTally {
    pub fn new(roster: Roster, count_open_issues: bool) -> Self {
        let data = LectureTopicTaskData::new(&roster.developers);
        Self {
            roster,
            count_open_issues,
            data,
        }
    }

    pub fn record(&mut self, issue: &Issue) {
        if !issue.is_lecture_topic_task || (!issue.closed && !self.count_open_issues) {
            return;
        }
        let milestone = issue.milestone.as_deref().unwrap_or(NO_MILESTONE);
        self.data.total_lecture_topic_tasks += 1;
        self.data.milestones.insert(milestone.to_string());
        for assignee in &issue.assignees {
            if !self.roster.is_member(assignee) {
                warn!(
                    issue = issue.number,
                    url = %issue.url,
                    "Lecture topic task #{} assigned to developer {} not belonging to the team",
                    issue.number,
                    assignee
                );
                continue;
            }
            let Some(by_milestone) = self.data.tasks_by_developer_by_milestone.get_mut(assignee)
            else {
                continue;
            };
            *by_milestone.entry(milestone.to_string()).or_insert(0) += 1;
        }
    }

    pub fn finish(self) -> LectureTopicTaskData {
        self.data
    }

    /// Tallies everything the subscriber delivers, re-raising a source error.
    pub async fn consume(mut self, mut subscriber: Subscriber) -> Result<LectureTopicTaskData, EngineError> {
        while let Some(issue) = subscriber.recv().await {
            let issue = issue?;
            self.record(&issue);
        }
        Ok(self.finish())
    }
}
