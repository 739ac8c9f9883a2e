use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use clap::Parser;
use indicatif::MultiProgress;
use serde_json::Value;
use std::path::PathBuf;
use team_metrics::analyze::{analyze_milestone_with_tally, IssueStream, DEFAULT_QUEUE_CAPACITY};
use team_metrics::error::SourceError;
use team_metrics::github::dump::save_items;
use team_metrics::github::{DumpIssueSource, GraphQlClient, IssueSource, ProjectIssueSource};
use team_metrics::model::{CourseConfig, LectureTopicTaskData, MilestoneConfig, Roster};
use team_metrics::report::{json, report_path, LectureTopicReport, MarkdownReport, MilestoneReport};
use team_metrics::telemetry::{self, WarningCollector};
use team_metrics::utils::{MultiProgressNew, ProgressStyleTemplate};
use tracing::info;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Contribution scores and projected grades for a course team")]
struct Args {
    #[arg(long = "config", default_value = "course_config.json")]
    config_path: PathBuf,
    /// Milestones to report on, all configured ones by default.
    #[arg(long = "milestone")]
    milestones: Vec<String>,
    /// Only report on the milestone in progress.
    #[arg(long, conflicts_with = "milestones")]
    current: bool,
    /// Replay project items saved with `--save-items` instead of querying GitHub.
    #[arg(long = "input")]
    input: Option<PathBuf>,
    #[arg(long = "save-items")]
    save_items: Option<PathBuf>,
    #[arg(long, env = "ORGANIZATION")]
    organization: Option<String>,
    #[arg(long, env = "GITHUB_API_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long = "output-dir", default_value = "metrics")]
    output_dir: PathBuf,
    #[arg(long = "json-dir", default_value = "metrics/json")]
    json_dir: PathBuf,
    #[arg(long = "queue-capacity", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let collector = WarningCollector::new();
    telemetry::init(collector.clone());
    run(&args, &collector).await
}

async fn run(args: &Args, collector: &WarningCollector) -> Result<()> {
    let course = CourseConfig::from_config(&args.config_path)
        .with_context(|| format!("Loading course config `{}`", args.config_path.display()))?;
    let organization = args
        .organization
        .clone()
        .or_else(|| course.organization.clone())
        .context("No organization: pass --organization or set `organization` in the course config")?;
    let now = Utc::now().with_timezone(&course.utc_offset);
    let milestones = select_milestones(args, &course, now)?;

    let (items, members) = {
        let args = args.clone();
        let course = course.clone();
        let organization = organization.clone();
        tokio::task::spawn_blocking(move || fetch(&args, &course, &organization)).await??
    };
    let roster = Roster::new(members, course.managers.clone());
    info!(
        developers = roster.developers.len(),
        managers = roster.managers.len(),
        items = items.len(),
        "Team `{}` loaded",
        course.project_name
    );
    if let Some(path) = &args.save_items {
        save_items(path, &items).with_context(|| format!("Saving items to `{}`", path.display()))?;
    }

    let multi_progress = MultiProgress::default();
    let milestones_pb = multi_progress.add_with_style(
        indicatif::ProgressBar::new(milestones.len() as u64),
        ProgressStyleTemplate::milestones_bar(),
    );
    // warnings raised while fetching belong to no milestone
    collector.drain();

    let mut lecture_topics: Option<LectureTopicTaskData> = None;
    for milestone in milestones {
        milestones_pb.set_message(milestone.name.clone());
        let params = course.milestone_params(milestone);
        let issues = IssueStream::new(
            items.clone().into_iter().map(Ok::<Value, SourceError>),
            course.issue_rules.clone(),
            params.rule_context(),
        );
        let (data, tally) =
            analyze_milestone_with_tally(params, &roster, issues, args.queue_capacity, now)
                .await
                .with_context(|| format!("Computing metrics for `{}`", milestone.name))?;
        let logs = collector.drain();

        let path = report_path(&args.output_dir, &milestone.name, &course.project_name, &organization);
        MilestoneReport {
            data: &data,
            min_tasks_per_sprint: course.min_tasks_per_sprint,
            generated_at: now,
            logs: &logs,
        }
        .report_create(&path)?;
        info!(path = %path.display(), "Report for `{}` written", milestone.name);

        let stem = format!("{}-{}-{}", milestone.name, course.project_name, organization);
        json::dump_if_changed(&data, &args.json_dir, &stem, now)?;
        lecture_topics = Some(tally);
        milestones_pb.inc(1);
    }
    milestones_pb.finish_with_message("✅ Completed milestones");

    if let Some(data) = lecture_topics {
        let path = args.output_dir.join(format!(
            "Lecture Topic Tasks-{}-{}.md",
            course.project_name, organization
        ));
        LectureTopicReport {
            team: &course.project_name,
            data: &data,
            quota: course.lecture_topic_task_quota,
        }
        .report_create(&path)?;
    }
    Ok(())
}

fn select_milestones<'a>(
    args: &Args,
    course: &'a CourseConfig,
    now: DateTime<FixedOffset>,
) -> Result<Vec<&'a MilestoneConfig>> {
    if args.current {
        let Some(current) = course.current_milestone(now) else {
            bail!("The course config has no milestones");
        };
        return Ok(vec![current]);
    }
    if args.milestones.is_empty() {
        return Ok(course.milestones.iter().collect());
    }
    args.milestones
        .iter()
        .map(|name| course.milestone(name).map_err(anyhow::Error::from))
        .collect()
}

/// Raw project items and the team's members, from a dump or from GitHub.
fn fetch(args: &Args, course: &CourseConfig, organization: &str) -> Result<(Vec<Value>, Vec<String>)> {
    let multi_progress = MultiProgress::default();
    let items_pb = multi_progress.add_spinner(ProgressStyleTemplate::items_counter(), "Fetching items");

    if let Some(input) = &args.input {
        let Some(members) = course.members.clone() else {
            bail!("`members` must be listed in the course config when replaying `--input`");
        };
        let items = DumpIssueSource::from_file(input)
            .with_context(|| format!("Reading items from `{}`", input.display()))?
            .raw_issues()
            .collect::<Result<Vec<_>, _>>()?;
        items_pb.finish_with_message(format!("✅ Read {} items", items.len()));
        return Ok((items, members));
    }

    let Some(token) = &args.token else {
        bail!("No GitHub token: pass --token or set GITHUB_API_TOKEN");
    };
    let members = match &course.members {
        Some(members) => members.clone(),
        None => GraphQlClient::new(token)
            .team_members(organization, &course.project_name)
            .with_context(|| format!("Fetching members of team `{}`", course.project_name))?,
    };
    let source = ProjectIssueSource::find(GraphQlClient::new(token), organization, &course.project_name)?;
    let progress_pb = items_pb.clone();
    let items = source
        .raw_issues()
        .with_progress(Box::new(move |page, items| {
            progress_pb.set_message(format!("Fetching items (#{page} page)"));
            progress_pb.set_position(items as u64);
        }))
        .collect::<Result<Vec<_>, _>>()?;
    items_pb.finish_with_message(format!("✅ Completed fetch ({} items)", items.len()));
    Ok((items, members))
}
