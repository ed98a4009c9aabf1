//! Paginated retrieval of issues and commits through the ports.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::AuditError;
use crate::model::{Commit, Issue, RepoBranch, Window};
use crate::ports::{CommitSource, IssueSource, NamedRef, RawCommit, RawIssue};

/// Number of issues requested per tracker page.
pub const ISSUE_PAGE_SIZE: u32 = 50;

/// Default bound on concurrent repository/branch fetches.
pub const DEFAULT_WORKERS: usize = 4;

/// Fetches every issue matching `query`.
///
/// Pages are requested from offset 0 in steps of [`ISSUE_PAGE_SIZE`] until
/// the offset reaches the total the tracker reports.
///
/// # Errors
///
/// Returns [`AuditError::Fetch`] if any page fails or an item lacks a key or
/// a parseable update time.
pub async fn fetch_issues(source: &dyn IssueSource, query: &str) -> Result<Vec<Issue>, AuditError> {
    let mut issues = Vec::new();
    let mut start_at = 0;
    loop {
        let page = source
            .search_page(query, start_at, ISSUE_PAGE_SIZE)
            .await
            .map_err(|e| AuditError::fetch(format!("issue page at offset {start_at}"), e))?;
        debug!(start_at, total = page.total, items = page.issues.len(), "fetched issue page");

        for raw in page.issues {
            issues.push(parse_issue(raw)?);
        }

        start_at = next_issue_offset(start_at)?;
        if start_at >= page.total {
            break;
        }
    }
    Ok(issues)
}

fn next_issue_offset(start_at: u32) -> Result<u32, AuditError> {
    start_at.checked_add(ISSUE_PAGE_SIZE).ok_or_else(|| {
        AuditError::fetch(
            format!("issue page after offset {start_at}"),
            "reported total exceeds the addressable range",
        )
    })
}

fn parse_issue(raw: RawIssue) -> Result<Issue, AuditError> {
    let key = raw
        .key
        .filter(|key| !key.is_empty())
        .ok_or_else(|| AuditError::fetch("issue record", "missing required field `key`"))?;
    let fields = raw.fields;
    let updated = fields
        .updated
        .as_deref()
        .ok_or_else(|| {
            AuditError::fetch(format!("issue {key}"), "missing required field `updated`")
        })
        .and_then(|text| {
            parse_tracker_timestamp(text).ok_or_else(|| {
                AuditError::fetch(
                    format!("issue {key}"),
                    format!("unparseable `updated` value {text:?}"),
                )
            })
        })?;

    Ok(Issue {
        summary: fields.summary.unwrap_or_default(),
        description: fields.description.unwrap_or_default(),
        components: names(fields.components),
        fix_versions: names(fields.fix_versions),
        updated,
        key,
    })
}

fn names(refs: Option<Vec<NamedRef>>) -> Vec<String> {
    refs.unwrap_or_default().into_iter().filter_map(|r| r.name).collect()
}

/// Parses tracker timestamps such as `2024-01-15T10:00:00.000+0000`.
fn parse_tracker_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Fetches all commits of one repository/branch pair inside `window`.
///
/// Follows the host's `nextPageStart` cursor until it reports the last page.
/// Commits dated outside the window are dropped.
///
/// # Errors
///
/// Returns [`AuditError::Fetch`] if a page fails, a commit lacks its hash or
/// timestamp, or a non-final page carries no cursor.
pub async fn fetch_commits(
    source: &dyn CommitSource,
    target: &RepoBranch,
    window: &Window,
) -> Result<Vec<Commit>, AuditError> {
    let mut commits = Vec::new();
    let mut start = 0;
    loop {
        let page = source
            .commits_page(target, window, start)
            .await
            .map_err(|e| AuditError::fetch(format!("commits of {target} at cursor {start}"), e))?;
        debug!(
            %target,
            start,
            items = page.values.len(),
            last = page.is_last_page,
            "fetched commit page"
        );

        for raw in page.values {
            let commit = parse_commit(raw, target)?;
            if window.contains(commit.date) {
                commits.push(commit);
            }
        }

        if page.is_last_page {
            break;
        }
        start = page.next_page_start.ok_or_else(|| {
            AuditError::fetch(
                format!("commits of {target}"),
                "page is not last but has no nextPageStart",
            )
        })?;
    }
    Ok(commits)
}

fn parse_commit(raw: RawCommit, target: &RepoBranch) -> Result<Commit, AuditError> {
    let sha = raw.id.ok_or_else(|| {
        AuditError::fetch(format!("commit on {target}"), "missing required field `id`")
    })?;
    let millis = raw.author_timestamp.ok_or_else(|| {
        AuditError::fetch(format!("commit {sha}"), "missing required field `authorTimestamp`")
    })?;
    let date = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        AuditError::fetch(format!("commit {sha}"), format!("timestamp {millis} out of range"))
    })?;

    Ok(Commit {
        author: raw.author.and_then(|author| author.name),
        message: raw.message.unwrap_or_default(),
        repo: target.repo.clone(),
        branch: target.branch.clone(),
        date,
        sha,
    })
}

/// Fetches every pair's commits with at most `workers` fetches in flight.
///
/// Each pair runs as its own task; results are joined before being
/// concatenated in the order `targets` was given. The first failure aborts
/// the remaining tasks and is returned; no partial list is produced.
///
/// # Errors
///
/// Returns the first [`AuditError`] any pair produced, or a fetch error if a
/// worker task panicked.
pub async fn fetch_commits_concurrent(
    source: Arc<dyn CommitSource>,
    targets: &[RepoBranch],
    window: Window,
    workers: usize,
) -> Result<Vec<Commit>, AuditError> {
    info!(pairs = targets.len(), workers, "fetching commits");
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for (index, target) in targets.iter().cloned().enumerate() {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| AuditError::fetch("commit worker pool", e))?;
            let commits = fetch_commits(source.as_ref(), &target, &window).await?;
            Ok::<_, AuditError>((index, commits))
        });
    }

    let mut per_target: Vec<Option<Vec<Commit>>> = vec![None; targets.len()];
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.map_err(|e| AuditError::fetch("commit worker", e));
        match outcome.and_then(|result| result) {
            Ok((index, commits)) => per_target[index] = Some(commits),
            Err(err) => {
                tasks.abort_all();
                return Err(err);
            }
        }
    }

    let commits: Vec<Commit> = per_target.into_iter().flatten().flatten().collect();
    info!(commits = commits.len(), "fetched commits");
    Ok(commits)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::ports::{CommitPage, RawAuthor};
    use crate::testing::{raw_commit, raw_issue, utc, FakeCommitSource, FakeIssueSource};

    fn window() -> Window {
        Window { start: utc(2024, 1, 8), end: utc(2024, 1, 27) }
    }

    #[tokio::test]
    async fn pages_through_all_issues() {
        let raws: Vec<_> = (1..=120)
            .map(|n| raw_issue(&format!("ABC-{n}"), "2024-01-15T10:00:00.000+0000"))
            .collect();
        let source = FakeIssueSource::new(raws);

        let issues = fetch_issues(&source, "project = ABC").await.unwrap();

        assert_eq!(issues.len(), 120);
        assert_eq!(issues[0].key, "ABC-1");
        assert_eq!(issues[119].key, "ABC-120");
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_result_makes_one_request() {
        let source = FakeIssueSource::new(Vec::new());
        let issues = fetch_issues(&source, "project = NONE").await.unwrap();
        assert!(issues.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn optional_issue_fields_default_to_empty() {
        let mut raw = raw_issue("ABC-1", "2024-01-15T10:00:00.000+0200");
        raw.fields.summary = None;
        raw.fields.components = None;
        let issues = fetch_issues(&FakeIssueSource::new(vec![raw]), "q").await.unwrap();

        let issue = &issues[0];
        assert_eq!(issue.summary, "");
        assert_eq!(issue.description, "");
        assert!(issue.components.is_empty());
        assert!(issue.fix_versions.is_empty());
        assert_eq!(issue.updated, utc(2024, 1, 15) + chrono::Duration::hours(8));
    }

    #[tokio::test]
    async fn issue_without_key_is_fatal() {
        let mut raw = raw_issue("ABC-1", "2024-01-15T10:00:00.000+0000");
        raw.key = None;
        let err = fetch_issues(&FakeIssueSource::new(vec![raw]), "q").await.unwrap_err();
        assert!(err.to_string().contains("key"));
    }

    #[tokio::test]
    async fn issue_with_bad_timestamp_is_fatal() {
        let raw = raw_issue("ABC-1", "last tuesday");
        let err = fetch_issues(&FakeIssueSource::new(vec![raw]), "q").await.unwrap_err();
        assert!(matches!(err, AuditError::Fetch { .. }));
    }

    #[test]
    fn issue_offset_overflow_is_a_fetch_error() {
        assert_eq!(next_issue_offset(0).unwrap(), ISSUE_PAGE_SIZE);
        let err = next_issue_offset(u32::MAX - 10).unwrap_err();
        assert!(matches!(err, AuditError::Fetch { .. }));
        assert!(err.to_string().contains("addressable range"));
    }

    #[tokio::test]
    async fn issue_page_failure_propagates() {
        let raws: Vec<_> = (1..=60)
            .map(|n| raw_issue(&format!("ABC-{n}"), "2024-01-15T10:00:00.000+0000"))
            .collect();
        let source = FakeIssueSource::new(raws).failing_at(50);

        let err = fetch_issues(&source, "q").await.unwrap_err();
        assert!(err.to_string().contains("offset 50"));
    }

    #[tokio::test]
    async fn follows_server_cursor_not_client_offset() {
        let target = RepoBranch::new("ABC/app", "develop");
        let at = utc(2024, 1, 16);
        let source = FakeCommitSource::default().with_pages(
            target.clone(),
            vec![
                (
                    0,
                    CommitPage {
                        values: vec![raw_commit("c1", "ABC-1", at), raw_commit("c2", "ABC-2", at)],
                        is_last_page: false,
                        next_page_start: Some(7),
                    },
                ),
                (
                    7,
                    CommitPage {
                        values: vec![raw_commit("c3", "misc", at)],
                        is_last_page: true,
                        next_page_start: None,
                    },
                ),
            ],
        );

        let commits = fetch_commits(&source, &target, &window()).await.unwrap();

        let shas: Vec<&str> = commits.iter().map(|c| c.sha.as_str()).collect();
        assert_eq!(shas, vec!["c1", "c2", "c3"]);
        assert!(commits.iter().all(|c| c.repo == "ABC/app" && c.branch == "develop"));
    }

    #[tokio::test]
    async fn missing_author_stays_absent() {
        let target = RepoBranch::new("ABC/app", "develop");
        let mut no_block = raw_commit("c1", "x", utc(2024, 1, 16));
        no_block.author = None;
        let mut no_name = raw_commit("c2", "y", utc(2024, 1, 16));
        no_name.author = Some(RawAuthor { name: None });
        let source =
            FakeCommitSource::default().with_single_page(target.clone(), vec![no_block, no_name]);

        let commits = fetch_commits(&source, &target, &window()).await.unwrap();

        assert_eq!(commits[0].author, None);
        assert_eq!(commits[1].author, None);
    }

    #[tokio::test]
    async fn converts_epoch_millis_and_drops_commits_outside_window() {
        let target = RepoBranch::new("ABC/app", "develop");
        let source = FakeCommitSource::default().with_single_page(
            target.clone(),
            vec![
                raw_commit("inside", "x", utc(2024, 1, 16)),
                raw_commit("before", "x", utc(2024, 1, 1)),
                raw_commit("edge", "x", utc(2024, 1, 27)),
            ],
        );

        let commits = fetch_commits(&source, &target, &window()).await.unwrap();

        let shas: Vec<&str> = commits.iter().map(|c| c.sha.as_str()).collect();
        assert_eq!(shas, vec!["inside", "edge"]);
        assert_eq!(commits[0].date, utc(2024, 1, 16));
    }

    #[tokio::test]
    async fn non_final_page_without_cursor_is_fatal() {
        let target = RepoBranch::new("ABC/app", "develop");
        let source = FakeCommitSource::default().with_pages(
            target.clone(),
            vec![(0, CommitPage { values: vec![], is_last_page: false, next_page_start: None })],
        );

        let err = fetch_commits(&source, &target, &window()).await.unwrap_err();
        assert!(err.to_string().contains("nextPageStart"));
    }

    #[tokio::test]
    async fn commit_without_hash_is_fatal() {
        let target = RepoBranch::new("ABC/app", "develop");
        let mut raw = raw_commit("c1", "x", utc(2024, 1, 16));
        raw.id = None;
        let source = FakeCommitSource::default().with_single_page(target.clone(), vec![raw]);

        assert!(fetch_commits(&source, &target, &window()).await.is_err());
    }

    #[tokio::test]
    async fn fan_out_returns_union_of_every_pair() {
        let at = utc(2024, 1, 16);
        let targets: Vec<RepoBranch> = (0..6)
            .map(|n| {
                RepoBranch::new(format!("ABC/repo{n}"), if n % 2 == 0 { "develop" } else { "main" })
            })
            .collect();
        let mut source = FakeCommitSource::default();
        for (n, target) in targets.iter().enumerate() {
            let delay = Duration::from_millis(((6 - n) * 5) as u64);
            let values =
                vec![raw_commit(&format!("{n}a"), "m", at), raw_commit(&format!("{n}b"), "m", at)];
            source =
                source.with_single_page(target.clone(), values).with_delay(target.clone(), delay);
        }

        let commits =
            fetch_commits_concurrent(Arc::new(source), &targets, window(), 2).await.unwrap();

        let got: HashSet<(String, String)> =
            commits.iter().map(|c| (c.repo.clone(), c.sha.clone())).collect();
        let expected: HashSet<(String, String)> = (0..6)
            .flat_map(|n| {
                let repo = format!("ABC/repo{n}");
                [(repo.clone(), format!("{n}a")), (repo, format!("{n}b"))]
            })
            .collect();
        assert_eq!(commits.len(), 12);
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn same_hash_on_two_branches_is_two_records() {
        let at = utc(2024, 1, 16);
        let develop = RepoBranch::new("ABC/app", "develop");
        let release = RepoBranch::new("ABC/app", "release/r-1");
        let source = FakeCommitSource::default()
            .with_single_page(develop.clone(), vec![raw_commit("same", "ABC-1", at)])
            .with_single_page(release.clone(), vec![raw_commit("same", "ABC-1", at)]);

        let commits = fetch_commits_concurrent(Arc::new(source), &[develop, release], window(), 4)
            .await
            .unwrap();

        assert_eq!(commits.len(), 2);
        assert_ne!(commits[0].branch, commits[1].branch);
    }

    #[tokio::test]
    async fn fan_out_fails_as_a_whole_when_one_pair_fails() {
        let at = utc(2024, 1, 16);
        let good = RepoBranch::new("ABC/good", "develop");
        let bad = RepoBranch::new("ABC/bad", "develop");
        let source = FakeCommitSource::default()
            .with_single_page(good.clone(), vec![raw_commit("c1", "ABC-1", at)])
            .with_failure(bad.clone(), "HTTP 500");

        let err = fetch_commits_concurrent(Arc::new(source), &[good, bad], window(), 4)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("ABC/bad@develop"));
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn fan_out_over_no_pairs_is_empty() {
        let source = Arc::new(FakeCommitSource::default());
        let commits = fetch_commits_concurrent(source, &[], window(), 4).await.unwrap();
        assert!(commits.is_empty());
    }
}
