use crate::error::SourceError;
use crate::model::Issue;
use crate::rules::{RuleContext, RuleSet};
use serde_json::Value;
use tracing::error;

/// Turns raw project items into typed issues, applying the issue rules.
///
/// Items that cannot be parsed are dropped: those without content silently,
/// those whose shape changed with an error log. Source errors pass through and
/// end the stream.
pub struct IssueStream<I> {
    raw: I,
    rules: RuleSet,
    ctx: RuleContext,
    failed: bool,
}

impl<I> IssueStream<I>
where
    I: Iterator<Item = Result<Value, SourceError>>,
{
    pub fn new(raw: I, rules: RuleSet, ctx: RuleContext) -> Self {
        Self {
            raw,
            rules,
            ctx,
            failed: false,
        }
    }
}

impl<I> Iterator for IssueStream<I>
where
    I: Iterator<Item = Result<Value, SourceError>>,
{
    type Item = Result<Issue, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let value = match self.raw.next()? {
                Ok(value) => value,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            };
            match Issue::parse(&value) {
                Ok(mut issue) => {
                    self.rules.apply(&mut issue, &self.ctx);
                    return Some(Ok(issue));
                }
                Err(err) if !err.is_schema_drift() => continue,
                Err(err) => {
                    error!(
                        error = %err,
                        "{err}. The GitHub GraphQL Issue type may have changed; the parser needs updating"
                    );
                    continue;
                }
            }
        }
    }
}
