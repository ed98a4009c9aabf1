//! End-to-end audit orchestration with result caching.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::fetch::{fetch_commits_concurrent, fetch_issues};
use super::matching::match_commits;
use super::window::derive_window;
use crate::cache::ResultCache;
use crate::config::Settings;
use crate::error::AuditError;
use crate::model::{AuditResult, RepoBranch, Window};
use crate::ports::{CommitSource, IssueSource};

/// Parameters of one audit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditRequest {
    /// Issue tracker query.
    pub query: String,
    /// Repository/branch pairs whose commits are inspected.
    pub targets: Vec<RepoBranch>,
    /// Explicit window start; requires `end`.
    pub start: Option<String>,
    /// Explicit window end; requires `start`.
    pub end: Option<String>,
    /// Skip the cache lookup and recompute.
    pub force_refresh: bool,
}

impl AuditRequest {
    /// Request for `query` over `targets` with a derived window.
    pub fn new(query: impl Into<String>, targets: Vec<RepoBranch>) -> Self {
        Self { query: query.into(), targets, ..Self::default() }
    }

    /// Resolves the caller-supplied window, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidInput`] if only one bound is given or the
    /// bounds do not parse.
    pub fn explicit_window(&self) -> Result<Option<Window>, AuditError> {
        match (self.start.as_deref(), self.end.as_deref()) {
            (Some(start), Some(end)) => Window::parse(start, end).map(Some),
            (None, None) => Ok(None),
            _ => Err(AuditError::InvalidInput(
                "an explicit window needs both a start and an end date".into(),
            )),
        }
    }
}

/// Runs audits against injected sources, memoizing results in a cache.
pub struct AuditPipeline {
    issues: Arc<dyn IssueSource>,
    commits: Arc<dyn CommitSource>,
    cache: Option<ResultCache>,
    cache_ttl: Option<Duration>,
    workers: usize,
    window_buffer: TimeDelta,
}

impl AuditPipeline {
    /// Builds a pipeline configured from `settings`. `cache` of `None`
    /// disables both lookup and persistence.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] if the window buffer setting is
    /// out of range.
    pub fn new(
        issues: Arc<dyn IssueSource>,
        commits: Arc<dyn CommitSource>,
        cache: Option<ResultCache>,
        settings: &Settings,
    ) -> Result<Self, AuditError> {
        Ok(Self {
            issues,
            commits,
            cache,
            cache_ttl: settings.cache_ttl(),
            workers: settings.threads.max(1),
            window_buffer: settings.window_buffer()?,
        })
    }

    /// Runs one audit.
    ///
    /// A fresh cached result for the same inputs is returned verbatim unless
    /// `force_refresh` is set. Otherwise issues are fetched, the window is
    /// taken from the request or derived from the issues, commits are fetched
    /// for every pair, and the matched result is persisted before returning.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidInput`] for a malformed window or, when
    /// no window is given, an empty issue set. Returns [`AuditError::Fetch`]
    /// if any issue or commit retrieval fails; nothing is cached then.
    pub async fn run_audit(&self, request: &AuditRequest) -> Result<AuditResult, AuditError> {
        let explicit = request.explicit_window()?;
        let key = cache_key(request, explicit.as_ref(), self.window_buffer);

        if !request.force_refresh {
            if let Some(cached) = self.cached(&key) {
                info!(%key, "returning cached audit");
                return Ok(cached);
            }
        }

        info!(query = %request.query, "fetching issues");
        let issues = fetch_issues(self.issues.as_ref(), &request.query).await?;
        info!(issues = issues.len(), "fetched issues");

        let window = match explicit {
            Some(window) => window,
            None => derive_window(&issues, self.window_buffer)?,
        };
        info!(
            start = %window.start_text(),
            end = %window.end_text(),
            explicit = explicit.is_some(),
            "resolved window"
        );

        let commits = fetch_commits_concurrent(
            Arc::clone(&self.commits),
            &request.targets,
            window,
            self.workers,
        )
        .await?;

        let matching = match_commits(&issues, &commits);
        info!(
            coverage = matching.coverage,
            missing = matching.missing.len(),
            "matched commits to issues"
        );

        let result = AuditResult { issues, commits, matching, window };
        self.persist(&key, &result);
        Ok(result)
    }

    fn cached(&self, key: &str) -> Option<AuditResult> {
        let payload = self.cache.as_ref()?.read(key, self.cache_ttl)?;
        match serde_json::from_str(&payload) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(%key, error = %e, "cached audit does not decode; recomputing");
                None
            }
        }
    }

    fn persist(&self, key: &str, result: &AuditResult) {
        let Some(cache) = &self.cache else {
            return;
        };
        let written = serde_json::to_string(result)
            .map_err(std::io::Error::other)
            .and_then(|payload| cache.write(key, &payload));
        if let Err(e) = written {
            warn!(%key, error = %e, "failed to cache audit result");
        }
    }
}

/// Content-addressed cache key for `request`.
///
/// Covers the query text byte for byte, the sorted pair set, and the
/// explicit window, or the derivation buffer when the window is derived.
#[must_use]
pub fn cache_key(request: &AuditRequest, explicit: Option<&Window>, buffer: TimeDelta) -> String {
    let mut targets: Vec<&RepoBranch> = request.targets.iter().collect();
    targets.sort_by(|a, b| (&a.repo, &a.branch).cmp(&(&b.repo, &b.branch)));

    let mut hasher = Sha256::new();
    hasher.update(b"query\0");
    hasher.update(request.query.as_bytes());
    for target in targets {
        hasher.update(b"\0pair\0");
        hasher.update(target.repo.as_bytes());
        hasher.update(b"\0");
        hasher.update(target.branch.as_bytes());
    }
    match explicit {
        Some(window) => {
            hasher.update(b"\0window\0");
            hasher.update(window.start_text().as_bytes());
            hasher.update(b"\0");
            hasher.update(window.end_text().as_bytes());
        }
        None => {
            hasher.update(b"\0buffer\0");
            hasher.update(buffer.num_seconds().to_string().as_bytes());
        }
    }
    format!("audit-{:x}", hasher.finalize())
}
