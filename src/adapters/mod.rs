//! Adapters implementing the ports: live HTTP clients, and recording and
//! replaying wrappers around them.

pub mod live;
pub mod recording;
pub mod replaying;

use serde_json::{json, Value};

use crate::model::RepoBranch;

pub(crate) const ISSUES_PORT: &str = "issues";
pub(crate) const COMMITS_PORT: &str = "commits";
pub(crate) const LLM_PORT: &str = "llm";

/// Cassette input identifying one issue page request.
pub(crate) fn issue_page_input(query: &str, start_at: u32, max_results: u32) -> Value {
    json!({ "query": query, "start_at": start_at, "max_results": max_results })
}

/// Cassette input identifying one commit page request.
pub(crate) fn commit_page_input(target: &RepoBranch, start: u32) -> Value {
    json!({ "repo": target.repo, "branch": target.branch, "start": start })
}
