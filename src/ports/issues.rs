//! Issue tracker port for searching work items.

use serde::{Deserialize, Serialize};

use super::PortFuture;

/// One page of a tracker search, in the tracker's wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePage {
    /// Offset of the first item in this page.
    #[serde(default)]
    pub start_at: u32,
    /// Page size the server applied.
    #[serde(default)]
    pub max_results: u32,
    /// Total number of results the query matches.
    #[serde(default)]
    pub total: u32,
    /// Items on this page.
    #[serde(default)]
    pub issues: Vec<RawIssue>,
}

/// A work item exactly as the tracker returned it.
///
/// Everything is optional here; the issue fetcher decides which fields are
/// required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    /// Tracker key.
    #[serde(default)]
    pub key: Option<String>,
    /// Field bag.
    #[serde(default)]
    pub fields: RawIssueFields,
}

/// The subset of issue fields the audit reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIssueFields {
    /// One-line summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Long-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Components, each with a name.
    #[serde(default)]
    pub components: Option<Vec<NamedRef>>,
    /// Fix versions, each with a name.
    #[serde(default)]
    pub fix_versions: Option<Vec<NamedRef>>,
    /// Last-updated timestamp, e.g. `2024-01-15T10:00:00.000+0000`.
    #[serde(default)]
    pub updated: Option<String>,
}

/// A named reference such as a component or a version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Searches an external issue tracker.
///
/// Abstracting the tracker allows deterministic replay and testing
/// without touching a real tracker API.
pub trait IssueSource: Send + Sync {
    /// Returns one page of results for `query`, starting at `start_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be decoded.
    fn search_page<'a>(
        &'a self,
        query: &'a str,
        start_at: u32,
        max_results: u32,
    ) -> PortFuture<'a, IssuePage>;
}
