use crate::analyze::{GradeBlend, MilestoneParams, OutlierTrim, DOCUMENTATION_BONUS_RATE};
use crate::error::ConfigError;
use crate::rules::RuleSet;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde_json::{from_str, Value};
use std::fs;
use std::path::Path;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Course time zone (America/Puerto_Rico, no daylight saving).
pub const DEFAULT_UTC_OFFSET: &str = "-04:00";
pub const DEFAULT_SPRINTS: u32 = 2;
pub const DEFAULT_MIN_TASKS_PER_SPRINT: u32 = 1;

#[derive(Debug, Clone)]
pub struct MilestoneConfig {
    pub name: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub projected_group_grade: f64,
    pub use_decay: bool,
}

/// One team's grading setup for a course.
#[derive(Debug, Clone)]
pub struct CourseConfig {
    pub organization: Option<String>,
    pub project_name: String,
    pub members: Option<Vec<String>>,
    pub managers: Vec<String>,
    pub sprints: u32,
    pub min_tasks_per_sprint: u32,
    pub count_open_issues: bool,
    pub lecture_topic_task_quota: u32,
    pub utc_offset: FixedOffset,
    pub documentation_bonus_rate: f64,
    pub grade_blend: GradeBlend,
    pub outlier_trim: OutlierTrim,
    pub milestones: Vec<MilestoneConfig>,
    pub issue_rules: RuleSet,
}

// Create
impl CourseConfig {
    pub fn from_config(path: impl AsRef<Path>) -> Result<Self> {
        let json_str = fs::read_to_string(path)?;
        Self::parse(&json_str)
    }

    pub fn milestone(&self, name: &str) -> Result<&MilestoneConfig> {
        self.milestones
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| ConfigError::UnknownMilestone(name.to_string()))
    }

    /// The latest milestone that has already started, or the first one.
    pub fn current_milestone(&self, today: DateTime<FixedOffset>) -> Option<&MilestoneConfig> {
        let mut current = self.milestones.first()?;
        for milestone in &self.milestones {
            if milestone.start <= today {
                current = milestone;
            } else {
                break;
            }
        }
        Some(current)
    }

    pub fn milestone_params(&self, milestone: &MilestoneConfig) -> MilestoneParams {
        MilestoneParams {
            milestone: milestone.name.clone(),
            start: milestone.start,
            end: milestone.end,
            sprints: self.sprints,
            min_tasks_per_sprint: self.min_tasks_per_sprint,
            use_decay: milestone.use_decay,
            milestone_grade: milestone.projected_group_grade,
            count_open_issues: self.count_open_issues,
            documentation_bonus_rate: self.documentation_bonus_rate,
            grade_blend: self.grade_blend,
            outlier_trim: self.outlier_trim,
        }
    }
}

// Parser
impl CourseConfig {
    pub fn parse(json_str: &str) -> Result<Self> {
        let details: Value = from_str(json_str)?;
        if !details.is_object() {
            return Err(invalid("expected a JSON object"));
        }

        let Some(project_name) = details["projectName"].as_str() else {
            return Err(invalid("Not found 'projectName' field"));
        };
        let organization = details["organization"].as_str().map(String::from);
        let members = match &details["members"] {
            Value::Null => None,
            members => Some(logins(members, "members")?),
        };
        let managers = logins(&details["managers"], "managers")?;

        let utc_offset = match details["utcOffset"].as_str() {
            Some(offset) => offset.parse::<FixedOffset>(),
            None => DEFAULT_UTC_OFFSET.parse::<FixedOffset>(),
        }
        .map_err(|e| invalid(format!("'utcOffset' is not a UTC offset: {e}")))?;

        let sprints = optional_u32(&details, "sprints", DEFAULT_SPRINTS)?;
        let min_tasks_per_sprint =
            optional_u32(&details, "minTasksPerSprint", DEFAULT_MIN_TASKS_PER_SPRINT)?;
        let lecture_topic_task_quota = optional_u32(&details, "lectureTopicTaskQuota", 0)?;
        let count_open_issues = details["countOpenIssues"].as_bool().unwrap_or(false);
        let documentation_bonus_rate = details["documentationBonusRate"]
            .as_f64()
            .unwrap_or(DOCUMENTATION_BONUS_RATE);

        let grade_blend = match &details["gradeWeights"] {
            Value::Null => GradeBlend::default(),
            weights => {
                let (Some(milestone), Some(individual)) =
                    (weights["milestone"].as_f64(), weights["individual"].as_f64())
                else {
                    return Err(invalid(
                        "'gradeWeights' needs numeric 'milestone' and 'individual'",
                    ));
                };
                GradeBlend::new(milestone, individual)?
            }
        };
        let outlier_trim = match &details["outlierTrim"] {
            Value::Null => OutlierTrim::default(),
            trim => OutlierTrim {
                lowest: optional_u32(trim, "lowest", 1)? as usize,
                highest: optional_u32(trim, "highest", 1)? as usize,
            },
        };

        let Some(milestones) = details["milestones"].as_object() else {
            return Err(invalid("Not found 'milestones' field"));
        };
        let mut parsed = Vec::new();
        for (name, milestone) in milestones {
            parsed.push(parse_milestone(name.clone(), milestone, utc_offset)?);
        }

        let issue_rules = match &details["issueRules"] {
            Value::Null => RuleSet::default(),
            rules => RuleSet::from_value(rules.clone())?,
        };

        Ok(Self {
            organization,
            project_name: project_name.to_string(),
            members,
            managers,
            sprints,
            min_tasks_per_sprint,
            count_open_issues,
            lecture_topic_task_quota,
            utc_offset,
            documentation_bonus_rate,
            grade_blend,
            outlier_trim,
            milestones: parsed,
            issue_rules,
        })
    }
}

fn parse_milestone(name: String, details: &Value, offset: FixedOffset) -> Result<MilestoneConfig> {
    let Some(start) = details["startDate"].as_str() else {
        return Err(invalid(format!("Not found 'startDate' field for `{name}`")));
    };
    let Some(end) = details["endDate"].as_str() else {
        return Err(invalid(format!("Not found 'endDate' field for `{name}`")));
    };
    let start = parse_boundary(start, offset, NaiveTime::MIN)?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    let end = parse_boundary(end, offset, end_of_day)?;
    Ok(MilestoneConfig {
        name,
        start,
        end,
        projected_group_grade: details["projectedGroupGrade"].as_f64().unwrap_or(100.0),
        use_decay: details["useDecay"].as_bool().unwrap_or(true),
    })
}

/// RFC 3339 as given, or a bare date at `time` in the course offset.
pub fn parse_boundary(
    raw: &str,
    offset: FixedOffset,
    time: NaiveTime,
) -> Result<DateTime<FixedOffset>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Ok(datetime);
    }
    let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
        return Err(invalid(format!("Not a valid date: {raw}")));
    };
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| invalid(format!("Not a valid local time: {raw}")))
}

fn logins(value: &Value, name: &str) -> Result<Vec<String>> {
    let Some(list) = value.as_array() else {
        return Err(invalid(format!("Not found '{name}' field")));
    };
    Ok(list
        .iter()
        .filter_map(|entry| match entry {
            Value::String(login) => Some(login.clone()),
            // legacy shape: { "name": "login" }
            Value::Object(_) => entry["name"].as_str().map(String::from),
            _ => None,
        })
        .collect())
}

fn optional_u32(details: &Value, name: &str, default: u32) -> Result<u32> {
    match &details[name] {
        Value::Null => Ok(default),
        value => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| invalid(format!("'{name}' must be a non-negative integer"))),
    }
}

fn invalid(message: impl ToString) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
