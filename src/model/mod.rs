mod course;
mod issue;
mod metrics;
mod roster;

pub use course::{parse_boundary, CourseConfig, MilestoneConfig};
pub use issue::{
    Comment, Issue, Reaction, ReactionKind, GHOST_LOGIN, LECTURE_TOPIC_TASK_LABEL,
    LECTURE_TOPIC_TASK_MARKER,
};
pub use metrics::{
    DeveloperMetrics, IssueMetrics, LectureTopicTaskData, MilestoneData, MIN_MILESTONES_FOR_QUOTA,
    NO_MILESTONE,
};
pub use roster::Roster;
