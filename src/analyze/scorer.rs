use crate::analyze::decay::decay;
use crate::error::ScoringError;
use crate::model::{Issue, IssueMetrics, Reaction, Roster};
use chrono::{DateTime, FixedOffset};
use tracing::{info, warn};

/// Documentation bonus as a share of the issue's score.
pub const DOCUMENTATION_BONUS_RATE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    pub use_decay: bool,
    pub documentation_bonus_rate: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            use_decay: true,
            documentation_bonus_rate: DOCUMENTATION_BONUS_RATE,
        }
    }
}

/// Who, if anyone, earned an issue's documentation bonus.
#[derive(Debug, Clone, PartialEq)]
pub enum BonusAttribution {
    None,
    Sole(String),
    /// More than one post was approved; nobody gets the bonus.
    Ambiguous(usize),
}

/// Turns validated issues into points.
#[derive(Debug, Clone, Copy)]
pub struct IssueScorer<'a> {
    pub roster: &'a Roster,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub policy: ScoringPolicy,
}

impl<'a> IssueScorer<'a> {
    pub fn new(
        roster: &'a Roster,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            roster,
            start,
            end,
            policy,
        }
    }

    /// `urgency * difficulty * decay + modifier`
    pub fn base_score(&self, issue: &Issue) -> Result<f64, ScoringError> {
        let (Some(urgency), Some(difficulty)) = (issue.urgency, issue.difficulty) else {
            return Err(ScoringError::MissingEstimate(issue.number));
        };
        let decay = if self.policy.use_decay {
            decay(self.start, self.end, issue.created_at)?
        } else {
            1.0
        };
        Ok(urgency * difficulty * decay + issue.modifier.unwrap_or(0.0))
    }

    /// Posts (the issue body, then each comment) a manager approved with 🎉.
    /// Comments written by managers are not candidates.
    pub fn bonus_attribution(&self, issue: &Issue) -> BonusAttribution {
        let approved_by_manager = |reactions: &[Reaction]| {
            reactions
                .iter()
                .any(|r| r.kind.is_approval() && self.roster.is_manager(&r.user))
        };
        let mut recipients = Vec::new();
        if approved_by_manager(issue.reactions.as_slice()) {
            recipients.push(issue.author.as_str());
        }
        for comment in &issue.comments {
            if self.roster.is_manager(&comment.author) {
                continue;
            }
            if approved_by_manager(comment.reactions.as_slice()) {
                recipients.push(comment.author.as_str());
            }
        }
        match recipients.as_slice() {
            [] => BonusAttribution::None,
            [recipient] => BonusAttribution::Sole(recipient.to_string()),
            many => BonusAttribution::Ambiguous(many.len()),
        }
    }

    pub fn score(&self, issue: &Issue) -> Result<IssueMetrics, ScoringError> {
        let score = self.base_score(issue)?;
        let mut metrics = IssueMetrics::default();

        match self.bonus_attribution(issue) {
            BonusAttribution::Sole(recipient) if self.roster.is_developer(&recipient) => {
                info!(
                    issue = issue.number,
                    developer = %recipient,
                    "Documentation bonus given to {} in Issue #{}",
                    recipient,
                    issue.number
                );
                metrics
                    .bonuses_by_developer
                    .insert(recipient, score * self.policy.documentation_bonus_rate);
            }
            BonusAttribution::Ambiguous(posts) => {
                info!(
                    issue = issue.number,
                    "Documentation bonus withheld in Issue #{}: {} posts were approved",
                    issue.number,
                    posts
                );
            }
            BonusAttribution::Sole(_) | BonusAttribution::None => {}
        }

        let mut eligible: Vec<&str> = vec![];
        for assignee in &issue.assignees {
            if !self.roster.is_member(assignee) {
                warn!(
                    issue = issue.number,
                    url = %issue.url,
                    "Issue #{} assigned to user {} not belonging to the team",
                    issue.number,
                    assignee
                );
                continue;
            }
            if self.roster.is_developer(assignee) && !eligible.contains(&assignee.as_str()) {
                eligible.push(assignee.as_str());
            }
        }

        if eligible.is_empty() {
            let managers_only = !issue.assignees.is_empty()
                && issue.assignees.iter().all(|a| self.roster.is_manager(a));
            if !managers_only {
                metrics.unattributed_points = score;
            }
            return Ok(metrics);
        }
        let share = score / eligible.len() as f64;
        for developer in eligible {
            metrics
                .points_by_developer
                .insert(developer.to_string(), share);
        }
        Ok(metrics)
    }
}
