use crate::error::ReportError;
use crate::model::MilestoneData;
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DUMP_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

pub fn dump(data: &MilestoneData, path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(data)?)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<MilestoneData, ReportError> {
    let json_str = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json_str)?)
}

/// Newest `<stem>-<timestamp>.json` in `dir`.
pub fn latest_dump(dir: &Path, stem: &str) -> Result<Option<PathBuf>, ReportError> {
    if !dir.exists() {
        return Ok(None);
    }
    let pattern = format!(r"^{}-\d{{8}}T\d{{6}}\.json$", regex::escape(stem));
    let Ok(pattern) = Regex::new(&pattern) else {
        return Ok(None);
    };
    let mut dumps = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| pattern.is_match(name))
        .collect::<Vec<_>>();
    dumps.sort();
    Ok(dumps.pop().map(|name| dir.join(name)))
}

/// Writes `<stem>-<now>.json` unless the newest dump of `stem` holds the same data.
/// Returns the path written, if any.
pub fn dump_if_changed(
    data: &MilestoneData,
    dir: &Path,
    stem: &str,
    now: DateTime<FixedOffset>,
) -> Result<Option<PathBuf>, ReportError> {
    if let Some(latest) = latest_dump(dir, stem)? {
        if load(&latest).is_ok_and(|previous| previous == *data) {
            info!(
                path = %latest.display(),
                "Generated metrics equal to most recent metrics. Metrics will not be dumped"
            );
            return Ok(None);
        }
    }
    let path = dir.join(format!("{stem}-{}.json", now.format(DUMP_TIME_FORMAT)));
    dump(data, &path)?;
    info!(path = %path.display(), "Metrics dumped");
    Ok(Some(path))
}
