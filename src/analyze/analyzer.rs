use crate::analyze::benchmark::{Benchmark, GradeBlend, OutlierTrim, MAX_GRADE};
use crate::analyze::fan_out::{fan_out, Subscriber};
use crate::analyze::lecture_topic::LectureTopicTally;
use crate::analyze::scorer::{IssueScorer, ScoringPolicy};
use crate::analyze::sprint::SprintSchedule;
use crate::analyze::validator::IssueValidator;
use crate::error::{ConfigError, EngineError, SourceError};
use crate::model::{DeveloperMetrics, Issue, LectureTopicTaskData, MilestoneData, Roster};
use crate::rules::RuleContext;
use chrono::{DateTime, FixedOffset};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, error, warn};

/// Everything a single milestone run needs besides the roster and the issues.
#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneParams {
    pub milestone: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub sprints: u32,
    pub min_tasks_per_sprint: u32,
    pub use_decay: bool,
    /// Target grade of the group, 0 to 100.
    pub milestone_grade: f64,
    pub count_open_issues: bool,
    pub documentation_bonus_rate: f64,
    pub grade_blend: GradeBlend,
    pub outlier_trim: OutlierTrim,
}

impl MilestoneParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sprints < 1 {
            return Err(ConfigError::InvalidSprintCount(self.sprints));
        }
        if self.end <= self.start {
            return Err(ConfigError::InvertedDateRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.use_decay && (self.end - self.start).num_days() < 1 {
            return Err(ConfigError::EmptyMilestoneWindow {
                start: self.start,
                end: self.end,
            });
        }
        if !(0.0..=MAX_GRADE).contains(&self.milestone_grade) {
            return Err(ConfigError::InvalidMilestoneGrade(self.milestone_grade));
        }
        if !(0.0..=1.0).contains(&self.documentation_bonus_rate) {
            return Err(ConfigError::InvalidBonusRate(self.documentation_bonus_rate));
        }
        GradeBlend::new(self.grade_blend.milestone, self.grade_blend.individual)?;
        Ok(())
    }

    pub fn rule_context(&self) -> RuleContext {
        RuleContext {
            start: self.start,
            end: self.end,
        }
    }

    fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            use_decay: self.use_decay,
            documentation_bonus_rate: self.documentation_bonus_rate,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct DeveloperTotals {
    points: f64,
    base_points: f64,
    tasks_by_sprint: Vec<u32>,
    lecture_topic_tasks: u32,
    base_points_by_label: IndexMap<String, f64>,
}

/// Folds one milestone's issues into its [`MilestoneData`].
pub struct MilestoneAnalyzer<'a> {
    params: MilestoneParams,
    roster: &'a Roster,
    schedule: SprintSchedule,
    totals: IndexMap<String, DeveloperTotals>,
    labels: IndexSet<String>,
    total_points: f64,
    counted: usize,
}

// Create
impl<'a> MilestoneAnalyzer<'a> {
    pub fn new(params: MilestoneParams, roster: &'a Roster) -> Result<Self, ConfigError> {
        params.validate()?;
        let schedule = SprintSchedule::new(params.start, params.end, params.sprints);
        let totals = roster
            .developers
            .iter()
            .map(|dev| {
                let totals = DeveloperTotals {
                    tasks_by_sprint: vec![0; params.sprints as usize],
                    ..DeveloperTotals::default()
                };
                (dev.clone(), totals)
            })
            .collect();
        Ok(Self {
            params,
            roster,
            schedule,
            totals,
            labels: IndexSet::new(),
            total_points: 0.0,
            counted: 0,
        })
    }
}

impl MilestoneAnalyzer<'_> {
    pub fn params(&self) -> &MilestoneParams {
        &self.params
    }

    pub fn counted_issues(&self) -> usize {
        self.counted
    }

    /// Validates, scores and accumulates one issue. Returns whether it counted.
    pub fn ingest(&mut self, issue: &Issue) -> bool {
        let validator = IssueValidator::new(
            Some(self.params.milestone.as_str()),
            self.roster,
            self.params.count_open_issues,
        );
        if !validator.should_count(issue) {
            return false;
        }
        debug!(issue = issue.number, "Successfully validated Issue #{}", issue.number);

        let scorer = IssueScorer::new(
            self.roster,
            self.params.start,
            self.params.end,
            self.params.scoring_policy(),
        );
        let metrics = match scorer.score(issue) {
            Ok(metrics) => metrics,
            Err(err) => {
                error!(issue = issue.number, error = %err, "Issue #{} could not be scored", issue.number);
                return false;
            }
        };

        let sprint = self.schedule.index_of(issue.completed_at());
        for (dev, points) in &metrics.points_by_developer {
            let Some(totals) = self.totals.get_mut(dev) else {
                continue;
            };
            totals.points += points;
            totals.base_points += points;
            if let Some(tasks) = totals.tasks_by_sprint.get_mut(sprint) {
                *tasks += 1;
            }
            if issue.is_lecture_topic_task {
                totals.lecture_topic_tasks += 1;
            }
            for label in &issue.labels {
                *totals.base_points_by_label.entry(label.clone()).or_insert(0.0) += points;
                self.labels.insert(label.clone());
            }
        }
        for (dev, bonus) in &metrics.bonuses_by_developer {
            if let Some(totals) = self.totals.get_mut(dev) {
                totals.points += bonus;
            }
        }
        self.total_points += metrics.total_points();
        self.counted += 1;
        true
    }

    /// Benchmarks the team and produces the report. Sprints up to the one
    /// containing `now` are checked against the minimum task count.
    pub fn finish(self, now: DateTime<FixedOffset>) -> MilestoneData {
        let params = &self.params;
        let dev_points = self.totals.values().map(|t| t.points).collect::<Vec<_>>();
        let benchmark = Benchmark::compute(
            self.total_points,
            &dev_points,
            params.milestone_grade,
            params.outlier_trim,
        );
        debug!(
            milestone = %params.milestone,
            benchmark = benchmark.value(),
            total_points = self.total_points,
            "benchmark computed"
        );

        let mut labels = self.labels.into_iter().collect::<Vec<_>>();
        labels.sort();
        let current_sprint = self.schedule.index_of(now);

        let mut data = MilestoneData::new(&params.milestone, params.sprints, params.start, params.end);
        data.total_points_closed = self.total_points;
        for (dev, totals) in self.totals {
            let mut expected_grade = benchmark.individual_grade(totals.points);
            for (sprint, &tasks) in totals.tasks_by_sprint.iter().enumerate().take(current_sprint + 1) {
                if tasks >= params.min_tasks_per_sprint {
                    continue;
                }
                warn!(
                    developer = %dev,
                    sprint,
                    "{} hasn't completed the minimum {} task(s) required for sprint {}",
                    dev,
                    params.min_tasks_per_sprint,
                    self.schedule.date_range_label(sprint)
                );
                if !params.count_open_issues {
                    expected_grade = 0.0;
                }
            }

            let point_percent_by_label = labels
                .iter()
                .map(|label| {
                    let points = totals.base_points_by_label.get(label).copied().unwrap_or(0.0);
                    let percent = if totals.base_points > 0.0 {
                        points / totals.base_points * 100.0
                    } else {
                        0.0
                    };
                    (label.clone(), percent)
                })
                .collect();

            let metrics = DeveloperMetrics {
                tasks_by_sprint: totals.tasks_by_sprint,
                points_closed: totals.points,
                percent_contribution: totals.points / self.total_points.max(1.0) * 100.0,
                expected_grade,
                blended_grade: params.grade_blend.blend(params.milestone_grade, expected_grade),
                lecture_topic_tasks_closed: totals.lecture_topic_tasks,
                point_percent_by_label,
            };
            data.dev_metrics.insert(dev, metrics);
        }
        data
    }
}

/// Runs one milestone over `issues` in arrival order.
///
/// A source error ends the run; malformed records were already dropped by
/// the intake.
pub fn analyze_milestone<I>(
    params: MilestoneParams,
    roster: &Roster,
    issues: I,
    now: DateTime<FixedOffset>,
) -> Result<MilestoneData, EngineError>
where
    I: IntoIterator<Item = Result<Issue, SourceError>>,
{
    let mut analyzer = MilestoneAnalyzer::new(params, roster)?;
    for issue in issues {
        analyzer.ingest(&issue?);
    }
    Ok(analyzer.finish(now))
}

/// Like [`analyze_milestone`], while a worker tallies lecture topic tasks
/// over the same issues.
pub async fn analyze_milestone_with_tally<I>(
    params: MilestoneParams,
    roster: &Roster,
    issues: I,
    queue_capacity: usize,
    now: DateTime<FixedOffset>,
) -> Result<(MilestoneData, LectureTopicTaskData), EngineError>
where
    I: Iterator<Item = Result<Issue, SourceError>> + Send + 'static,
{
    let mut analyzer = MilestoneAnalyzer::new(params, roster)?;
    let tally = LectureTopicTally::new(roster.clone(), analyzer.params().count_open_issues);

    let (mut scoring, lecture_topics, producer) = fan_out(issues, queue_capacity);
    let tally = tokio::spawn(tally.consume(lecture_topics));
    let ((), tally, ()) = futures::try_join!(
        consume(&mut analyzer, &mut scoring),
        async { tally.await? },
        async { Ok::<(), EngineError>(producer.await?) },
    )?;
    Ok((analyzer.finish(now), tally))
}

async fn consume(
    analyzer: &mut MilestoneAnalyzer<'_>,
    subscriber: &mut Subscriber,
) -> Result<(), EngineError> {
    while let Some(issue) = subscriber.recv().await {
        let issue = issue?;
        analyzer.ingest(&issue);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Reaction, ReactionKind};
    use pretty_assertions::assert_eq;

    fn at(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    fn params() -> MilestoneParams {
        MilestoneParams {
            milestone: "v1.0".to_string(),
            start: at("2025-01-01T00:00:00Z"),
            end: at("2025-01-31T00:00:00Z"),
            sprints: 2,
            min_tasks_per_sprint: 0,
            use_decay: false,
            milestone_grade: 100.0,
            count_open_issues: false,
            documentation_bonus_rate: 0.1,
            grade_blend: GradeBlend::default(),
            outlier_trim: OutlierTrim::default(),
        }
    }

    fn roster() -> Roster {
        Roster::new(vec!["dev1", "dev2", "dev3"], vec!["manager1"])
    }

    fn issue(number: u64, assignees: &[&str], closed_at: &str) -> Issue {
        let mut issue = Issue::new(number, "Task", at("2025-01-02T00:00:00Z"));
        issue.milestone = Some("v1.0".to_string());
        issue.assignees = assignees.iter().map(|a| a.to_string()).collect();
        issue.closed = true;
        issue.closed_at = Some(at(closed_at));
        issue.closed_by = Some("manager1".to_string());
        issue.urgency = Some(3.0);
        issue.difficulty = Some(2.0);
        issue
    }

    #[test]
    fn rejects_bad_params_before_any_issue() {
        let roster = roster();
        let mut bad = params();
        bad.sprints = 0;
        assert!(matches!(
            MilestoneAnalyzer::new(bad, &roster),
            Err(ConfigError::InvalidSprintCount(0))
        ));
        let mut bad = params();
        bad.end = bad.start;
        assert!(matches!(
            MilestoneAnalyzer::new(bad, &roster),
            Err(ConfigError::InvertedDateRange { .. })
        ));
        let mut bad = params();
        bad.use_decay = true;
        bad.end = at("2025-01-01T12:00:00Z");
        assert!(matches!(
            MilestoneAnalyzer::new(bad, &roster),
            Err(ConfigError::EmptyMilestoneWindow { .. })
        ));
        let mut bad = params();
        bad.milestone_grade = 120.0;
        assert!(matches!(
            MilestoneAnalyzer::new(bad, &roster),
            Err(ConfigError::InvalidMilestoneGrade(_))
        ));
    }

    #[test]
    fn accumulates_points_tasks_and_sprints() {
        let roster = roster();
        let mut analyzer = MilestoneAnalyzer::new(params(), &roster).unwrap();
        assert!(analyzer.ingest(&issue(1, &["dev1"], "2025-01-05T00:00:00Z")));
        assert!(analyzer.ingest(&issue(2, &["dev1", "dev2"], "2025-01-25T00:00:00Z")));
        let mut other = issue(3, &["dev3"], "2025-01-25T00:00:00Z");
        other.milestone = Some("v2.0".to_string());
        assert!(!analyzer.ingest(&other));
        assert_eq!(analyzer.counted_issues(), 2);

        let data = analyzer.finish(at("2025-02-01T00:00:00Z"));
        assert_eq!(data.total_points_closed, 12.0);
        assert_eq!(data.dev_metrics["dev1"].points_closed, 9.0);
        assert_eq!(data.dev_metrics["dev1"].tasks_by_sprint, vec![1, 1]);
        assert_eq!(data.dev_metrics["dev2"].tasks_by_sprint, vec![0, 1]);
        assert_eq!(data.dev_metrics["dev3"].points_closed, 0.0);
        assert_eq!(data.dev_metrics["dev1"].percent_contribution, 75.0);
        assert_eq!(data.dev_metrics.len(), 3);
    }

    #[test]
    fn grades_against_benchmark() {
        let roster = roster();
        let mut analyzer = MilestoneAnalyzer::new(params(), &roster).unwrap();
        analyzer.ingest(&issue(1, &["dev1"], "2025-01-05T00:00:00Z"));
        analyzer.ingest(&issue(2, &["dev2"], "2025-01-05T00:00:00Z"));
        analyzer.ingest(&issue(3, &["dev2"], "2025-01-05T00:00:00Z"));
        let data = analyzer.finish(at("2025-01-10T00:00:00Z"));

        // plain average 18 / 3 = 6, trimmed average (drop 12, keep 0 and 6) = 3
        assert_eq!(data.dev_metrics["dev1"].expected_grade, 100.0);
        assert_eq!(data.dev_metrics["dev2"].expected_grade, 100.0);
        assert_eq!(data.dev_metrics["dev3"].expected_grade, 0.0);
        assert_eq!(data.dev_metrics["dev3"].blended_grade, 40.0);
    }

    #[test]
    fn sprint_gate_only_checks_sprints_up_to_now() {
        let roster = Roster::new(vec!["dev1"], vec!["manager1"]);
        let mut params = params();
        params.min_tasks_per_sprint = 1;
        let run = |now: &str| {
            let mut analyzer = MilestoneAnalyzer::new(params.clone(), &roster).unwrap();
            analyzer.ingest(&issue(1, &["dev1"], "2025-01-05T00:00:00Z"));
            analyzer.finish(at(now))
        };
        assert_eq!(run("2025-01-10T00:00:00Z").dev_metrics["dev1"].expected_grade, 100.0);
        assert_eq!(run("2025-01-25T00:00:00Z").dev_metrics["dev1"].expected_grade, 0.0);
    }

    #[test]
    fn bonus_raises_points_but_not_total() {
        let roster = roster();
        let mut analyzer = MilestoneAnalyzer::new(params(), &roster).unwrap();
        let mut bonused = issue(1, &["dev1"], "2025-01-05T00:00:00Z");
        bonused.author = "dev2".to_string();
        bonused.reactions = vec![Reaction::new("manager1", ReactionKind::Hooray)];
        analyzer.ingest(&bonused);
        let data = analyzer.finish(at("2025-01-10T00:00:00Z"));
        assert_eq!(data.total_points_closed, 6.0);
        assert!((data.dev_metrics["dev2"].points_closed - 0.6).abs() < 1e-9);
        assert_eq!(data.dev_metrics["dev2"].tasks_by_sprint, vec![0, 0]);
    }

    #[test]
    fn label_percentages_share_keys() {
        let roster = roster();
        let mut analyzer = MilestoneAnalyzer::new(params(), &roster).unwrap();
        let mut backend = issue(1, &["dev1"], "2025-01-05T00:00:00Z");
        backend.labels = vec!["backend".to_string()];
        let mut docs = issue(2, &["dev1"], "2025-01-05T00:00:00Z");
        docs.labels = vec!["docs".to_string(), "backend".to_string()];
        docs.is_lecture_topic_task = true;
        analyzer.ingest(&backend);
        analyzer.ingest(&docs);
        let data = analyzer.finish(at("2025-01-10T00:00:00Z"));

        let dev1 = &data.dev_metrics["dev1"];
        assert_eq!(dev1.point_percent_by_label.keys().collect::<Vec<_>>(), vec!["backend", "docs"]);
        assert_eq!(dev1.point_percent_by_label["backend"], 100.0);
        assert_eq!(dev1.point_percent_by_label["docs"], 50.0);
        assert_eq!(dev1.lecture_topic_tasks_closed, 1);
        assert_eq!(data.dev_metrics["dev2"].point_percent_by_label["docs"], 0.0);
        assert_eq!(data.total_lecture_topic_tasks(), 1);
    }

    #[test]
    fn source_error_aborts_sync_run() {
        let roster = roster();
        let issues = vec![
            Ok(issue(1, &["dev1"], "2025-01-05T00:00:00Z")),
            Err(SourceError::GraphQl("boom".to_string())),
        ];
        let result = analyze_milestone(params(), &roster, issues, at("2025-01-10T00:00:00Z"));
        assert!(matches!(result, Err(EngineError::Source(_))));
    }
}
