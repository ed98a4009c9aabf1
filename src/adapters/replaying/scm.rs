//! Replaying adapter for the `CommitSource` port.

use std::sync::{Arc, Mutex};

use super::replay;
use crate::adapters::{commit_page_input, COMMITS_PORT};
use crate::cassette::replayer::CassetteReplayer;
use crate::model::{RepoBranch, Window};
use crate::ports::{CommitPage, CommitSource, PortFuture};

/// Serves recorded commit pages. The window is not part of the lookup; the
/// recorded pages already reflect the window of the recording run.
pub struct ReplayingCommitSource {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingCommitSource {
    /// Creates a source backed by `replayer`.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl CommitSource for ReplayingCommitSource {
    fn commits_page<'a>(
        &'a self,
        target: &'a RepoBranch,
        _window: &'a Window,
        start: u32,
    ) -> PortFuture<'a, CommitPage> {
        let input = commit_page_input(target, start);
        let result = replay(&self.replayer, COMMITS_PORT, "commits_page", &input);
        Box::pin(async move { result })
    }
}
