pub mod analyzer;
pub mod benchmark;
pub mod decay;
pub mod fan_out;
pub mod intake;
pub mod lecture_topic;
pub mod scorer;
pub mod sprint;
pub mod validator;

pub use analyzer::{analyze_milestone, analyze_milestone_with_tally, MilestoneAnalyzer, MilestoneParams};
pub use benchmark::{outlier_trimmed_average, Benchmark, GradeBlend, OutlierTrim};
pub use decay::decay;
pub use fan_out::{fan_out, Subscriber, DEFAULT_QUEUE_CAPACITY};
pub use intake::IssueStream;
pub use lecture_topic::LectureTopicTally;
pub use scorer::{BonusAttribution, IssueScorer, ScoringPolicy, DOCUMENTATION_BONUS_RATE};
pub use sprint::{current_sprint_index, generate_sprint_cutoffs, SprintSchedule};
pub use validator::IssueValidator;
