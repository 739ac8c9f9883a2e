use crate::analyze::SprintSchedule;
use crate::error::ReportError;
use crate::model::{LectureTopicTaskData, MilestoneData};
use chrono::{DateTime, FixedOffset};
use markdown_builder::Markdown;
use markdown_table::{Heading, HeadingAlignment, MarkdownTable};
use std::fs;
use std::path::{Path, PathBuf};

const SPRINT_BOUND_FORMAT: &str = "%Y/%m/%d, %I:%M %p";

pub trait MarkdownReport {
    fn render(&self) -> Result<String, ReportError>;

    fn report_create(&self, path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render()?)?;
        Ok(())
    }
}

/// `<milestone>-<team>-<organization>.md` under `dir`.
pub fn report_path(dir: &Path, milestone: &str, team: &str, organization: &str) -> PathBuf {
    dir.join(format!("{milestone}-{team}-{organization}.md"))
}

/// One team's milestone metrics with the warnings raised while computing them.
pub struct MilestoneReport<'a> {
    pub data: &'a MilestoneData,
    pub min_tasks_per_sprint: u32,
    pub generated_at: DateTime<FixedOffset>,
    pub logs: &'a [String],
}

impl MarkdownReport for MilestoneReport<'_> {
    fn render(&self) -> Result<String, ReportError> {
        let mut doc = Markdown::new();
        doc.header1(format!("{} Data", self.data.milestone));
        doc.header2(format!("Date Generated: {}", self.generated_at.date_naive()));
        doc.add_milestone_table(self.data)?;
        doc.add_sprint_completion(self.data, self.min_tasks_per_sprint, self.generated_at)?;
        doc.add_point_percent_by_label(self.data)?;
        doc.add_logs(self.logs)?;
        Ok(doc.render())
    }
}

/// Lecture topic task progress of a team against the course quota.
pub struct LectureTopicReport<'a> {
    pub team: &'a str,
    pub data: &'a LectureTopicTaskData,
    pub quota: u32,
}

impl MarkdownReport for LectureTopicReport<'_> {
    fn render(&self) -> Result<String, ReportError> {
        let mut doc = Markdown::new();
        doc.header1(format!("{} Lecture Topic Tasks", self.team));
        doc.paragraph(format!(
            "Quota: {} task(s) across at least {} milestones. Total closed: {}",
            self.quota,
            crate::model::MIN_MILESTONES_FOR_QUOTA,
            self.data.total_lecture_topic_tasks
        ));

        let milestones = self.data.milestones.iter().cloned().collect::<Vec<_>>();
        let header = [
            vec!["Developer".to_string()],
            milestones.clone(),
            vec!["Total".to_string(), "Met Quota".to_string()],
        ]
        .concat();
        let rows = self
            .data
            .tasks_by_developer_by_milestone
            .iter()
            .map(|(dev, by_milestone)| {
                let counts = milestones
                    .iter()
                    .map(|m| by_milestone.get(m).copied().unwrap_or(0).to_string())
                    .collect::<Vec<_>>();
                let met = if self.data.met_quota(dev, self.quota) {
                    "Yes"
                } else {
                    "No"
                };
                [
                    vec![dev.clone()],
                    counts,
                    vec![self.data.tasks_for(dev).to_string(), met.to_string()],
                ]
                .concat()
            })
            .collect::<Vec<_>>();
        doc.add_table(header, rows, "There are no developers on the team")?;
        Ok(doc.render())
    }
}

trait MarkdownExt {
    fn add_table(
        &mut self,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        empty: &str,
    ) -> Result<(), ReportError>;
    fn add_milestone_table(&mut self, data: &MilestoneData) -> Result<(), ReportError>;
    fn add_sprint_completion(
        &mut self,
        data: &MilestoneData,
        min_tasks_per_sprint: u32,
        now: DateTime<FixedOffset>,
    ) -> Result<(), ReportError>;
    fn add_point_percent_by_label(&mut self, data: &MilestoneData) -> Result<(), ReportError>;
    fn add_logs(&mut self, logs: &[String]) -> Result<(), ReportError>;
}

impl MarkdownExt for Markdown {
    fn add_table(
        &mut self,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        empty: &str,
    ) -> Result<(), ReportError> {
        if rows.is_empty() {
            self.paragraph(empty.to_string());
            return Ok(());
        }
        let header = header
            .into_iter()
            .map(|h| Heading::new(h, Some(HeadingAlignment::Left)))
            .collect::<Vec<_>>();
        let mut table = MarkdownTable::new(rows);
        table.with_headings(header);
        let rendered = table
            .as_markdown()
            .map_err(|e| ReportError::Table(format!("{e:?}")))?;
        // tables are pushed as is, paragraphs wrap at 80 columns
        self.elements.push(rendered.into());
        Ok(())
    }

    fn add_milestone_table(&mut self, data: &MilestoneData) -> Result<(), ReportError> {
        let header = [
            "Developer",
            "Points Closed",
            "Percent Contribution",
            "Projected Grade",
            "Blended Grade",
            "Lecture Topic Tasks",
        ]
        .map(String::from)
        .to_vec();
        let mut rows = data
            .dev_metrics
            .iter()
            .map(|(dev, metrics)| {
                vec![
                    dev.clone(),
                    format!("{:.1}", metrics.points_closed),
                    format!("{:.1}%", metrics.percent_contribution),
                    format!("{:.1}%", metrics.expected_grade),
                    format!("{:.1}%", metrics.blended_grade),
                    metrics.lecture_topic_tasks_closed.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        rows.push(vec![
            "Total".to_string(),
            format!("{:.1}", data.total_points_closed),
            "/100%".to_string(),
            "/100%".to_string(),
            "/100%".to_string(),
            data.total_lecture_topic_tasks().to_string(),
        ]);
        self.add_table(header, rows, "")
    }

    fn add_sprint_completion(
        &mut self,
        data: &MilestoneData,
        min_tasks_per_sprint: u32,
        now: DateTime<FixedOffset>,
    ) -> Result<(), ReportError> {
        self.header2("Sprint Task Completion".to_string());
        let schedule = SprintSchedule::new(data.start_date, data.end_date, data.sprints);
        let sprints = (0..schedule.sprint_count())
            .map(|i| {
                let (since, until) = schedule.bounds(i);
                let current = if schedule.is_current(i, now) {
                    " [current]"
                } else {
                    ""
                };
                format!(
                    "Sprint {}{}<br>{}<br>{}",
                    i + 1,
                    current,
                    since.format(SPRINT_BOUND_FORMAT),
                    until.format(SPRINT_BOUND_FORMAT)
                )
            })
            .collect::<Vec<_>>();
        let header = [vec!["Developer".to_string()], sprints].concat();
        let rows = data
            .dev_metrics
            .iter()
            .map(|(dev, metrics)| {
                let tasks = metrics
                    .tasks_by_sprint
                    .iter()
                    .map(|tasks| format!("{tasks}/{min_tasks_per_sprint}"));
                [vec![dev.clone()], tasks.collect()].concat()
            })
            .collect::<Vec<_>>();
        self.add_table(header, rows, "There are no developers on the team")
    }

    fn add_point_percent_by_label(&mut self, data: &MilestoneData) -> Result<(), ReportError> {
        self.header2("Point Percent by Label".to_string());
        let labels = data
            .dev_metrics
            .values()
            .next()
            .map(|m| m.point_percent_by_label.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        if labels.is_empty() {
            self.paragraph("There are no labels assigned to any issue".to_string());
            return Ok(());
        }
        let header = [vec!["Developer".to_string()], labels.clone()].concat();
        let rows = data
            .dev_metrics
            .iter()
            .map(|(dev, metrics)| {
                let percents = labels.iter().map(|label| {
                    let percent = metrics.point_percent_by_label.get(label).copied();
                    format!("{:.1}%", percent.unwrap_or(0.0))
                });
                [vec![dev.clone()], percents.collect()].concat()
            })
            .collect::<Vec<_>>();
        self.add_table(header, rows, "")
    }

    fn add_logs(&mut self, logs: &[String]) -> Result<(), ReportError> {
        self.header1("Metrics Generation Logs".to_string());
        let rows = logs
            .iter()
            .map(|log| vec![log.replace('|', "\\|")])
            .collect::<Vec<_>>();
        self.add_table(vec!["Message".to_string()], rows, "Nothing to report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeveloperMetrics;
    use indexmap::IndexMap;

    fn at(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    fn data() -> MilestoneData {
        let mut data = MilestoneData::new(
            "Milestone #1",
            2,
            at("2025-01-01T00:00:00-04:00"),
            at("2025-01-31T00:00:00-04:00"),
        );
        data.total_points_closed = 12.0;
        data.dev_metrics.insert(
            "dev1".to_string(),
            DeveloperMetrics {
                tasks_by_sprint: vec![2, 1],
                points_closed: 9.0,
                percent_contribution: 75.0,
                expected_grade: 100.0,
                blended_grade: 100.0,
                lecture_topic_tasks_closed: 1,
                point_percent_by_label: IndexMap::from([("backend".to_string(), 66.666)]),
            },
        );
        data
    }

    #[test]
    fn milestone_report_has_every_section() {
        let data = data();
        let logs = vec!["dev2 hasn't completed the minimum 1 task(s) | sprint".to_string()];
        let report = MilestoneReport {
            data: &data,
            min_tasks_per_sprint: 1,
            generated_at: at("2025-01-20T12:00:00-04:00"),
            logs: &logs,
        };
        let rendered = report.render().unwrap();
        assert!(rendered.contains("Milestone #1 Data"));
        assert!(rendered.contains("Date Generated: 2025-01-20"));
        assert!(rendered.contains("75.0%"));
        assert!(rendered.contains("Sprint 2 [current]"));
        assert!(!rendered.contains("Sprint 1 [current]"));
        assert!(rendered.contains("2/1"));
        assert!(rendered.contains("66.7%"));
        assert!(rendered.contains("Metrics Generation Logs"));
        assert!(rendered.contains("hasn't completed the minimum 1 task(s)"));
    }

    #[test]
    fn wide_table_rows_stay_on_one_line() {
        let data = data();
        let logs = vec![
            "dev2 hasn't completed the minimum 1 task(s) required for sprint 2025/01/16-2025/01/31"
                .to_string(),
        ];
        let rendered = MilestoneReport {
            data: &data,
            min_tasks_per_sprint: 1,
            generated_at: at("2025-01-20T12:00:00-04:00"),
            logs: &logs,
        }
        .render()
        .unwrap();
        let table_lines = rendered
            .lines()
            .filter(|line| line.starts_with('|'))
            .collect::<Vec<_>>();
        assert!(table_lines.iter().any(|line| line.len() > 80));
        for line in table_lines {
            assert!(line.ends_with('|'), "broken table row: {line}");
        }
        assert!(rendered.contains(&logs[0]));
        assert!(!rendered.contains("\n[current]"));
    }

    #[test]
    fn writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = report_path(dir.path(), "Milestone #1", "Team", "org");
        assert!(path.ends_with("Milestone #1-Team-org.md"));
        let data = data();
        let report = MilestoneReport {
            data: &data,
            min_tasks_per_sprint: 1,
            generated_at: at("2025-01-20T12:00:00-04:00"),
            logs: &[],
        };
        report.report_create(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("Nothing to report"));
    }

    #[test]
    fn lecture_topic_report_marks_quota() {
        let mut data = LectureTopicTaskData::new(&["dev1".to_string(), "dev2".to_string()]);
        data.milestones.insert("M1".to_string());
        data.milestones.insert("M2".to_string());
        data.total_lecture_topic_tasks = 2;
        data.tasks_by_developer_by_milestone["dev1"].insert("M1".to_string(), 1);
        data.tasks_by_developer_by_milestone["dev1"].insert("M2".to_string(), 1);
        let rendered = LectureTopicReport {
            team: "Team",
            data: &data,
            quota: 2,
        }
        .render()
        .unwrap();
        assert!(rendered.contains("Team Lecture Topic Tasks"));
        assert!(rendered.contains("Yes"));
        assert!(rendered.contains("No"));
    }
}
