pub mod json;
pub mod markdown;

pub use markdown::{report_path, LectureTopicReport, MarkdownReport, MilestoneReport};
