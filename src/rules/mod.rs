//! Declarative issue adjustments applied before validation.
//!
//! A rule is a condition over the issue's own fields and the milestone window,
//! plus the mutations to make when it holds:
//!
//! ```json
//! { "when": { "all": [{ "hasLabel": "hotfix" }, "createdAfterMilestoneEnd"] },
//!   "then": [{ "setMilestone": "Milestone #2" }, { "addModifier": -1 }] }
//! ```

use crate::error::ConfigError;
use crate::model::Issue;
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// A title pattern, compiled when the rules are loaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Pattern(Regex);

impl TryFrom<String> for Pattern {
    type Error = regex::Error;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Regex::new(&pattern).map(Pattern)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Always,
    TitleContains(String),
    TitleMatches(Pattern),
    HasLabel(String),
    AuthorIs(String),
    AssignedTo(String),
    MilestoneIs(String),
    IsClosed(bool),
    CreatedBefore(DateTime<FixedOffset>),
    CreatedAfter(DateTime<FixedOffset>),
    /// Created within this many days of the milestone start.
    CreatedWithinDays(i64),
    CreatedAfterMilestoneEnd,
    ClosedAfterMilestoneEnd,
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutation {
    SetUrgency(f64),
    SetDifficulty(f64),
    SetModifier(f64),
    AddModifier(f64),
    SetMilestone(String),
    AddLabel(String),
    RemoveLabel(String),
    RemoveAssignee(String),
    MarkLectureTopicTask(bool),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub name: Option<String>,
    pub when: Condition,
    pub then: Vec<Mutation>,
}

/// The milestone window rules may look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleContext {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Condition {
    pub fn holds(&self, issue: &Issue, ctx: &RuleContext) -> bool {
        match self {
            Condition::Always => true,
            Condition::TitleContains(text) => issue.title.contains(text.as_str()),
            Condition::TitleMatches(Pattern(regex)) => regex.is_match(&issue.title),
            Condition::HasLabel(label) => issue.has_label(label),
            Condition::AuthorIs(login) => &issue.author == login,
            Condition::AssignedTo(login) => issue.assignees.contains(login),
            Condition::MilestoneIs(name) => issue.milestone.as_ref() == Some(name),
            Condition::IsClosed(closed) => issue.closed == *closed,
            Condition::CreatedBefore(date) => issue.created_at < *date,
            Condition::CreatedAfter(date) => issue.created_at > *date,
            Condition::CreatedWithinDays(days) => {
                issue.created_at >= ctx.start && (issue.created_at - ctx.start).num_days() < *days
            }
            Condition::CreatedAfterMilestoneEnd => issue.created_at > ctx.end,
            Condition::ClosedAfterMilestoneEnd => issue.closed_at.is_some_and(|c| c > ctx.end),
            Condition::All(conditions) => conditions.iter().all(|c| c.holds(issue, ctx)),
            Condition::Any(conditions) => conditions.iter().any(|c| c.holds(issue, ctx)),
            Condition::Not(condition) => !condition.holds(issue, ctx),
        }
    }
}

impl Mutation {
    pub fn apply(&self, issue: &mut Issue) {
        match self {
            Mutation::SetUrgency(value) => issue.urgency = Some(*value),
            Mutation::SetDifficulty(value) => issue.difficulty = Some(*value),
            Mutation::SetModifier(value) => issue.modifier = Some(*value),
            Mutation::AddModifier(value) => {
                issue.modifier = Some(issue.modifier.unwrap_or(0.0) + value)
            }
            Mutation::SetMilestone(name) => issue.milestone = Some(name.clone()),
            Mutation::AddLabel(label) => {
                if !issue.has_label(label) {
                    issue.labels.push(label.clone());
                }
            }
            Mutation::RemoveLabel(label) => issue.labels.retain(|l| !l.eq_ignore_ascii_case(label)),
            Mutation::RemoveAssignee(login) => issue.assignees.retain(|a| a != login),
            Mutation::MarkLectureTopicTask(flag) => issue.is_lecture_topic_task = *flag,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet(Vec<Rule>);

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self(rules)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value::<Vec<Rule>>(value)
            .map(Self)
            .map_err(|e| ConfigError::InvalidRule(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Applies every matching rule in order and returns how many fired.
    /// Later rules see the changes made by earlier ones.
    pub fn apply(&self, issue: &mut Issue, ctx: &RuleContext) -> usize {
        let mut fired = 0;
        for (index, rule) in self.0.iter().enumerate() {
            if !rule.when.holds(issue, ctx) {
                continue;
            }
            debug!(
                issue = issue.number,
                rule = rule.name.as_deref().unwrap_or("unnamed"),
                index,
                "rule matched"
            );
            for mutation in &rule.then {
                mutation.apply(issue);
            }
            fired += 1;
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    fn ctx() -> RuleContext {
        RuleContext {
            start: at("2025-01-01T00:00:00Z"),
            end: at("2025-01-31T00:00:00Z"),
        }
    }

    fn issue() -> Issue {
        let mut issue = Issue::new(4, "[Bug] login fails", at("2025-01-03T00:00:00Z"));
        issue.author = "dev1".to_string();
        issue.assignees = vec!["dev1".to_string(), "helper".to_string()];
        issue.labels = vec!["backend".to_string()];
        issue.milestone = Some("Milestone #1".to_string());
        issue
    }

    fn rules(value: Value) -> RuleSet {
        RuleSet::from_value(value).unwrap()
    }

    #[test]
    fn title_rule_sets_estimates() {
        let rules = rules(json!([
            {"when": {"titleContains": "[Bug]"}, "then": [{"setUrgency": 3}, {"setDifficulty": 1.5}]}
        ]));
        let mut issue = issue();
        assert_eq!(rules.apply(&mut issue, &ctx()), 1);
        assert_eq!(issue.urgency, Some(3.0));
        assert_eq!(issue.difficulty, Some(1.5));
    }

    #[test]
    fn rules_run_in_order_on_updated_issue() {
        let rules = rules(json!([
            {"name": "tag", "when": {"titleMatches": "^\\[Bug\\]"}, "then": [{"addLabel": "bug"}]},
            {"when": {"all": [{"hasLabel": "BUG"}, {"createdWithinDays": 7}]}, "then": [{"addModifier": 2}]},
            {"when": {"not": {"assignedTo": "dev1"}}, "then": [{"setModifier": 0}]}
        ]));
        let mut issue = issue();
        assert_eq!(rules.apply(&mut issue, &ctx()), 2);
        assert_eq!(issue.labels, vec!["backend", "bug"]);
        assert_eq!(issue.modifier, Some(2.0));
    }

    #[test]
    fn window_conditions() {
        let mut late = issue();
        late.created_at = at("2025-02-02T00:00:00Z");
        late.closed_at = Some(at("2025-02-03T00:00:00Z"));
        assert!(Condition::CreatedAfterMilestoneEnd.holds(&late, &ctx()));
        assert!(Condition::ClosedAfterMilestoneEnd.holds(&late, &ctx()));
        assert!(!Condition::CreatedWithinDays(7).holds(&late, &ctx()));
        assert!(!Condition::ClosedAfterMilestoneEnd.holds(&issue(), &ctx()));
    }

    #[test]
    fn mutations_touch_only_the_issue() {
        let rules = rules(json!([
            {"when": "always", "then": [
                {"removeAssignee": "helper"},
                {"removeLabel": "Backend"},
                {"setMilestone": "Milestone #2"},
                {"markLectureTopicTask": true}
            ]},
            {"when": {"any": [{"authorIs": "nobody"}, {"milestoneIs": "Milestone #2"}]},
             "then": [{"addModifier": -1}]},
            {"when": {"isClosed": true}, "then": [{"setUrgency": 9}]}
        ]));
        let mut issue = issue();
        assert_eq!(rules.apply(&mut issue, &ctx()), 2);
        assert_eq!(issue.assignees, vec!["dev1"]);
        assert!(issue.labels.is_empty());
        assert_eq!(issue.milestone.as_deref(), Some("Milestone #2"));
        assert!(issue.is_lecture_topic_task);
        assert_eq!(issue.modifier, Some(-1.0));
        assert_eq!(issue.urgency, None);
    }

    #[test]
    fn invalid_rules_are_config_errors() {
        let bad_regex = RuleSet::from_value(json!([
            {"when": {"titleMatches": "(unclosed"}, "then": []}
        ]));
        assert!(matches!(bad_regex, Err(ConfigError::InvalidRule(_))));
        let unknown = RuleSet::from_value(json!([
            {"when": {"runScript": "rm -rf /"}, "then": []}
        ]));
        assert!(matches!(unknown, Err(ConfigError::InvalidRule(_))));
    }
}
