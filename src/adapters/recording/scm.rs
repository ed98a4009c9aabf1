//! Recording adapter for the `CommitSource` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::adapters::{commit_page_input, COMMITS_PORT};
use crate::cassette::recorder::CassetteRecorder;
use crate::model::{RepoBranch, Window};
use crate::ports::{CommitPage, CommitSource, PortFuture};

/// Records commit pages while delegating to an inner source.
pub struct RecordingCommitSource {
    inner: Arc<dyn CommitSource>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingCommitSource {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn CommitSource>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl CommitSource for RecordingCommitSource {
    fn commits_page<'a>(
        &'a self,
        target: &'a RepoBranch,
        window: &'a Window,
        start: u32,
    ) -> PortFuture<'a, CommitPage> {
        Box::pin(async move {
            let result = self.inner.commits_page(target, window, start).await;
            let input = commit_page_input(target, start);
            record_result(&self.recorder, COMMITS_PORT, "commits_page", &input, &result);
            result
        })
    }
}
