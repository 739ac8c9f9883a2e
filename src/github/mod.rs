pub mod client;
pub mod dump;
pub mod project;
pub mod queries;

pub use client::GraphQlClient;
pub use dump::DumpIssueSource;
pub use project::ProjectIssueSource;

use crate::error::SourceError;
use serde_json::Value;
use std::collections::VecDeque;

/// One page of raw project items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssuePage {
    pub items: Vec<Value>,
    /// Cursor of the following page, `None` on the last one.
    pub next_cursor: Option<String>,
}

/// Where raw issue records come from.
pub trait IssueSource {
    fn fetch_page(&mut self, cursor: Option<&str>) -> Result<IssuePage, SourceError>;

    fn raw_issues(self) -> RawIssues<Self>
    where
        Self: Sized,
    {
        RawIssues::new(self)
    }
}

pub type PageProgress = Box<dyn FnMut(usize, usize) + Send>;

/// Pulls pages lazily and yields their items in order.
///
/// The first error is yielded once and ends the iteration.
pub struct RawIssues<S> {
    source: S,
    buffered: VecDeque<Value>,
    cursor: Option<String>,
    pages: usize,
    items: usize,
    done: bool,
    progress: Option<PageProgress>,
}

impl<S: IssueSource> RawIssues<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffered: VecDeque::new(),
            cursor: None,
            pages: 0,
            items: 0,
            done: false,
            progress: None,
        }
    }

    /// Called after every page with the pages and items fetched so far.
    pub fn with_progress(mut self, progress: PageProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl<S: IssueSource> Iterator for RawIssues<S> {
    type Item = Result<Value, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            match self.source.fetch_page(self.cursor.as_deref()) {
                Ok(page) => {
                    self.pages += 1;
                    self.items += page.items.len();
                    self.buffered.extend(page.items);
                    self.done = page.next_cursor.is_none();
                    self.cursor = page.next_cursor;
                    if let Some(progress) = self.progress.as_mut() {
                        progress(self.pages, self.items);
                    }
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
