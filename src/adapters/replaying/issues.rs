//! Replaying adapter for the `IssueSource` port.

use std::sync::{Arc, Mutex};

use super::replay;
use crate::adapters::{issue_page_input, ISSUES_PORT};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{IssuePage, IssueSource, PortFuture};

/// Serves recorded issue pages.
pub struct ReplayingIssueSource {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingIssueSource {
    /// Creates a source backed by `replayer`.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl IssueSource for ReplayingIssueSource {
    fn search_page<'a>(
        &'a self,
        query: &'a str,
        start_at: u32,
        max_results: u32,
    ) -> PortFuture<'a, IssuePage> {
        let input = issue_page_input(query, start_at, max_results);
        let result = replay(&self.replayer, ISSUES_PORT, "search_page", &input);
        Box::pin(async move { result })
    }
}
