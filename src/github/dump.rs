use crate::error::SourceError;
use crate::github::{IssuePage, IssueSource};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Raw project items saved earlier, served as a single page.
#[derive(Debug, Clone, Default)]
pub struct DumpIssueSource {
    items: Vec<Value>,
}

// Create
impl DumpIssueSource {
    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }

    /// Reads a JSON list of project items.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let json_str = fs::read_to_string(path)?;
        match serde_json::from_str::<Value>(&json_str)? {
            Value::Array(items) => Ok(Self::new(items)),
            _ => Err(SourceError::Shape(
                "issue dump must be a list of project items".to_string(),
            )),
        }
    }
}

impl IssueSource for DumpIssueSource {
    fn fetch_page(&mut self, _cursor: Option<&str>) -> Result<IssuePage, SourceError> {
        Ok(IssuePage {
            items: std::mem::take(&mut self.items),
            next_cursor: None,
        })
    }
}

/// Saves raw project items so a later run can replay them with [`DumpIssueSource`].
pub fn save_items(path: impl AsRef<Path>, items: &[Value]) -> Result<(), SourceError> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(items)?)?;
    Ok(())
}
