use crate::model::{Issue, Roster};
use tracing::warn;

/// Decides whether an issue is credited toward a milestone.
#[derive(Debug, Clone, Copy)]
pub struct IssueValidator<'a> {
    /// Only issues of this milestone are counted; `None` accepts any.
    pub milestone: Option<&'a str>,
    pub roster: &'a Roster,
    pub count_open_issues: bool,
}

impl<'a> IssueValidator<'a> {
    pub fn new(milestone: Option<&'a str>, roster: &'a Roster, count_open_issues: bool) -> Self {
        Self {
            milestone,
            roster,
            count_open_issues,
        }
    }

    pub fn should_count(&self, issue: &Issue) -> bool {
        let Some(milestone) = issue.milestone.as_deref() else {
            warn!(
                issue = issue.number,
                url = %issue.url,
                "Issue #{} is not associated with a milestone",
                issue.number
            );
            return false;
        };
        if self.milestone.is_some_and(|current| current != milestone) {
            return false;
        }

        if issue.closed {
            let closer = issue.closed_by.as_deref().unwrap_or("an unknown user");
            if !self.roster.is_manager(closer) {
                warn!(
                    issue = issue.number,
                    url = %issue.url,
                    "Issue #{} was closed by non-manager {}. Only issues closed by managers are accredited. Managers for this project are: {}",
                    issue.number,
                    closer,
                    self.roster.managers.join(", ")
                );
                return false;
            }
        } else if !self.count_open_issues {
            return false;
        }

        let estimated = |value: Option<f64>| value.is_some_and(|v| v > 0.0);
        if !estimated(issue.urgency) || !estimated(issue.difficulty) {
            warn!(
                issue = issue.number,
                url = %issue.url,
                "Issue #{} does not have the Urgency and/or Difficulty fields populated",
                issue.number
            );
            return false;
        }
        true
    }
}
