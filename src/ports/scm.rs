//! Source-control port for listing branch history.

use serde::{Deserialize, Serialize};

use super::PortFuture;
use crate::model::{RepoBranch, Window};

/// One page of commit history, in the host's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPage {
    /// Commits on this page, newest first.
    #[serde(default)]
    pub values: Vec<RawCommit>,
    /// Whether this is the final page.
    #[serde(default = "default_last_page")]
    pub is_last_page: bool,
    /// Cursor for the next page, present when `is_last_page` is false.
    #[serde(default)]
    pub next_page_start: Option<u32>,
}

fn default_last_page() -> bool {
    true
}

/// A commit exactly as the host returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommit {
    /// Commit hash.
    #[serde(default)]
    pub id: Option<String>,
    /// Author block; may be missing entirely.
    #[serde(default)]
    pub author: Option<RawAuthor>,
    /// Author timestamp in epoch milliseconds.
    #[serde(default)]
    pub author_timestamp: Option<i64>,
    /// Commit message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Author block of a commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAuthor {
    /// Author display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Lists commits from a source-control host.
pub trait CommitSource: Send + Sync {
    /// Returns one page of `target`'s history starting at cursor `start`.
    ///
    /// The window is passed through so hosts that can filter server-side may
    /// do so; callers still enforce it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be decoded.
    fn commits_page<'a>(
        &'a self,
        target: &'a RepoBranch,
        window: &'a Window,
        start: u32,
    ) -> PortFuture<'a, CommitPage>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_page_and_defaults_last_page_flag() {
        let page: CommitPage = serde_json::from_value(json!({
            "values": [{
                "id": "abc",
                "authorTimestamp": 1_705_312_800_000_i64,
                "message": "ABC-1 fix"
            }]
        }))
        .unwrap();

        assert!(page.is_last_page);
        assert_eq!(page.next_page_start, None);
        assert_eq!(page.values[0].author, None);
        assert_eq!(page.values[0].author_timestamp, Some(1_705_312_800_000));
    }

    #[test]
    fn decodes_author_without_name() {
        let page: CommitPage = serde_json::from_value(json!({
            "values": [{"id": "abc", "author": {}}],
            "isLastPage": false,
            "nextPageStart": 25
        }))
        .unwrap();

        assert_eq!(page.values[0].author, Some(RawAuthor { name: None }));
        assert!(!page.is_last_page);
        assert_eq!(page.next_page_start, Some(25));
    }
}
