use crate::error::IssueError;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

pub const LECTURE_TOPIC_TASK_MARKER: &str = "[Lecture Topic Task]";
pub const LECTURE_TOPIC_TASK_LABEL: &str = "Lecture Topic Task";

/// Login GitHub reports for deleted accounts.
pub const GHOST_LOGIN: &str = "ghost";

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum ReactionKind {
    ThumbsUp,
    ThumbsDown,
    Laugh,
    Hooray,
    Confused,
    Heart,
    Rocket,
    Eyes,
}

impl ReactionKind {
    pub fn from_content(content: &str) -> Option<Self> {
        let kind = match content {
            "THUMBS_UP" => Self::ThumbsUp,
            "THUMBS_DOWN" => Self::ThumbsDown,
            "LAUGH" => Self::Laugh,
            "HOORAY" => Self::Hooray,
            "CONFUSED" => Self::Confused,
            "HEART" => Self::Heart,
            "ROCKET" => Self::Rocket,
            "EYES" => Self::Eyes,
            _ => return None,
        };
        Some(kind)
    }

    /// 🎉 is how managers sign off on documentation.
    pub fn is_approval(&self) -> bool {
        matches!(self, Self::Hooray)
    }
}

#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct Reaction {
    pub user: String,
    pub kind: ReactionKind,
}

impl Reaction {
    pub fn new(user: impl ToString, kind: ReactionKind) -> Self {
        Self {
            user: user.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub author: String,
    pub reactions: Vec<Reaction>,
}

impl Comment {
    pub fn new(author: impl ToString, reactions: Vec<Reaction>) -> Self {
        Self {
            author: author.to_string(),
            reactions,
        }
    }
}

/// One tracked unit of work on the team's project board.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub number: u64,
    pub url: String,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<FixedOffset>,
    pub closed_at: Option<DateTime<FixedOffset>>,
    pub closed: bool,
    pub closed_by: Option<String>,
    pub milestone: Option<String>,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    pub reactions: Vec<Reaction>,
    pub comments: Vec<Comment>,
    pub urgency: Option<f64>,
    pub difficulty: Option<f64>,
    pub modifier: Option<f64>,
    pub is_lecture_topic_task: bool,
}

// Create
impl Issue {
    /// A bare open issue; tests and rules fill in the rest.
    pub fn new(number: u64, title: impl ToString, created_at: DateTime<FixedOffset>) -> Self {
        let title = title.to_string();
        Self {
            number,
            url: String::new(),
            is_lecture_topic_task: title.contains(LECTURE_TOPIC_TASK_MARKER),
            title,
            author: GHOST_LOGIN.to_string(),
            created_at,
            closed_at: None,
            closed: false,
            closed_by: None,
            milestone: None,
            assignees: vec![],
            labels: vec![],
            reactions: vec![],
            comments: vec![],
            urgency: None,
            difficulty: None,
            modifier: None,
        }
    }

    /// When the work counts as done for sprint bookkeeping.
    pub fn completed_at(&self) -> DateTime<FixedOffset> {
        self.closed_at.unwrap_or(self.created_at)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}

// Parser
impl Issue {
    /// Parses one project item as returned by the project items query.
    ///
    /// Project scoped fields (`Urgency`, `Difficulty`, `Modifier`) live on the
    /// item, everything else under `content`.
    pub fn parse(item: &Value) -> Result<Self, IssueError> {
        let urgency = project_number(item, "Urgency")?;
        let difficulty = project_number(item, "Difficulty")?;
        let modifier = project_number(item, "Modifier")?;

        let content = match item.get("content") {
            Some(Value::Object(map)) if !map.is_empty() => &item["content"],
            _ => return Err(IssueError::MissingContent),
        };

        let url = str_field(content, "url")?;
        let Some(number) = field(content, "number")?.as_u64() else {
            return Err(invalid("number", "expected a positive integer"));
        };
        let title = str_field(content, "title")?;
        let author = login(field(content, "author")?, "author")?;
        let created_at = datetime(content, "createdAt")?;
        let Some(closed) = field(content, "closed")?.as_bool() else {
            return Err(invalid("closed", "expected a boolean"));
        };

        let closed_at = match field(content, "closedAt")? {
            Value::Null => None,
            _ => Some(datetime(content, "closedAt")?),
        };
        let closed_by = match nodes(content, "timelineItems")?.last() {
            Some(event) => Some(login(field(event, "actor")?, "timelineItems.actor")?),
            None => None,
        };
        let milestone = match field(content, "milestone")? {
            Value::Null => None,
            milestone => Some(str_field(milestone, "title")?),
        };

        let assignees = nodes(content, "assignees")?
            .iter()
            .map(|assignee| str_field(assignee, "login"))
            .collect::<Result<Vec<_>, _>>()?;
        let labels = match content.get("labels") {
            None | Some(Value::Null) => vec![],
            Some(_) => nodes(content, "labels")?
                .iter()
                .map(|label| str_field(label, "name"))
                .collect::<Result<Vec<_>, _>>()?,
        };
        let issue_reactions = reactions(content)?;
        let comments = nodes(content, "comments")?
            .iter()
            .map(|comment| {
                Ok(Comment::new(
                    login(field(comment, "author")?, "comments.author")?,
                    reactions(comment)?,
                ))
            })
            .collect::<Result<Vec<_>, IssueError>>()?;

        let is_lecture_topic_task = title.contains(LECTURE_TOPIC_TASK_MARKER)
            || labels
                .iter()
                .any(|l| l.eq_ignore_ascii_case(LECTURE_TOPIC_TASK_LABEL));

        Ok(Self {
            number,
            url,
            title,
            author,
            created_at,
            closed_at,
            closed,
            closed_by,
            milestone,
            assignees,
            labels,
            reactions: issue_reactions,
            comments,
            urgency,
            difficulty,
            modifier,
            is_lecture_topic_task,
        })
    }
}

fn invalid(field: &str, reason: impl ToString) -> IssueError {
    IssueError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value, IssueError> {
    value
        .get(name)
        .ok_or_else(|| IssueError::MissingField(name.to_string()))
}

fn str_field(value: &Value, name: &str) -> Result<String, IssueError> {
    let Some(s) = field(value, name)?.as_str() else {
        return Err(invalid(name, "expected a string"));
    };
    Ok(s.to_string())
}

fn datetime(value: &Value, name: &str) -> Result<DateTime<FixedOffset>, IssueError> {
    let raw = str_field(value, name)?;
    DateTime::parse_from_rfc3339(&raw).map_err(|e| invalid(name, format!("{raw}: {e}")))
}

/// `{ "login": .. }` or null for a deleted account.
fn login(actor: &Value, name: &str) -> Result<String, IssueError> {
    match actor {
        Value::Null => Ok(GHOST_LOGIN.to_string()),
        Value::Object(_) => str_field(actor, "login"),
        _ => Err(invalid(name, "expected an actor object")),
    }
}

fn nodes<'a>(value: &'a Value, name: &str) -> Result<&'a Vec<Value>, IssueError> {
    let Some(nodes) = field(field(value, name)?, "nodes")?.as_array() else {
        return Err(invalid(name, "expected a `nodes` list"));
    };
    Ok(nodes)
}

fn reactions(value: &Value) -> Result<Vec<Reaction>, IssueError> {
    nodes(value, "reactions")?
        .iter()
        .map(|reaction| {
            let content = str_field(reaction, "content")?;
            let Some(kind) = ReactionKind::from_content(&content) else {
                return Err(invalid("reactions.content", content));
            };
            Ok(Reaction::new(login(field(reaction, "user")?, "reactions.user")?, kind))
        })
        .collect()
}

fn project_number(item: &Value, name: &str) -> Result<Option<f64>, IssueError> {
    match field(item, name)? {
        Value::Null => Ok(None),
        value => match field(value, "number")?.as_f64() {
            Some(number) => Ok(Some(number)),
            None => Err(invalid(name, "expected a number field value")),
        },
    }
}
