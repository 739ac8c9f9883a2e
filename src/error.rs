use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Why a raw project item could not become an [`Issue`](crate::model::Issue).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IssueError {
    /// The item has no issue content. Usually a draft item, a pull request on
    /// the board, or a token that cannot see the repository.
    #[error("issue content is missing, empty, or not an object")]
    MissingContent,

    #[error("field `{0}` is missing from the issue record")]
    MissingField(String),

    #[error("field `{field}` is malformed: {reason}")]
    InvalidField { field: String, reason: String },
}

impl IssueError {
    /// Missing or malformed fields mean the upstream API shape moved under us.
    pub fn is_schema_drift(&self) -> bool {
        !matches!(self, IssueError::MissingContent)
    }
}

/// Fatal problems with the run's parameters. Nothing is processed once one of
/// these is raised.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("sprint count must be at least 1 (got {0})")]
    InvalidSprintCount(u32),

    #[error("milestone end {end} is not after its start {start}")]
    InvertedDateRange {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    #[error("milestone window {start} - {end} is shorter than one day")]
    EmptyMilestoneWindow {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    #[error("milestone grade must be within 0 and 100 (got {0})")]
    InvalidMilestoneGrade(f64),

    #[error("grade weights must be non-negative and add up to 1 (got {milestone} + {individual})")]
    InvalidGradeWeights { milestone: f64, individual: f64 },

    #[error("documentation bonus rate must be within 0 and 1 (got {0})")]
    InvalidBonusRate(f64),

    #[error("unknown milestone `{0}`")]
    UnknownMilestone(String),

    #[error("invalid issue rule: {0}")]
    InvalidRule(String),

    #[error("course config: {0}")]
    Invalid(String),

    #[error("course config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read course config: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("milestone window {start} - {end} is shorter than one day")]
    EmptyMilestoneWindow {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    #[error("issue #{0} has no urgency and/or difficulty")]
    MissingEstimate(u64),
}

/// Failures of the external issue source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] ureq::Error),

    #[error("query failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("query returned errors: {0}")]
    GraphQl(String),

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("project board `{name}` not found in organization `{organization}`")]
    ProjectNotFound { organization: String, name: String },

    #[error("cannot read issue dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("issue dump is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("issue source failed: {0}")]
    Source(#[from] Arc<SourceError>),

    #[error("lecture topic task consumer failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl From<SourceError> for EngineError {
    fn from(err: SourceError) -> Self {
        EngineError::Source(Arc::new(err))
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("cannot write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot serialize metrics: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot render table: {0}")]
    Table(String),
}
