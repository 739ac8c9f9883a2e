//! Contribution scores and projected grades for course teams, computed from
//! the issues on each team's GitHub project board.

pub mod analyze;
pub mod error;
pub mod github;
pub mod model;
pub mod report;
pub mod rules;
pub mod telemetry;
pub mod utils;
