//! Recording adapter for the `IssueSource` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::adapters::{issue_page_input, ISSUES_PORT};
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{IssuePage, IssueSource, PortFuture};

/// Records issue pages while delegating to an inner source.
pub struct RecordingIssueSource {
    inner: Arc<dyn IssueSource>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingIssueSource {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn IssueSource>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl IssueSource for RecordingIssueSource {
    fn search_page<'a>(
        &'a self,
        query: &'a str,
        start_at: u32,
        max_results: u32,
    ) -> PortFuture<'a, IssuePage> {
        Box::pin(async move {
            let result = self.inner.search_page(query, start_at, max_results).await;
            let input = issue_page_input(query, start_at, max_results);
            record_result(&self.recorder, ISSUES_PORT, "search_page", &input, &result);
            result
        })
    }
}
