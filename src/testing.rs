//! In-memory port implementations for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::model::{Issue, RepoBranch, Window};
use crate::ports::{
    Clock, CommitPage, CommitSource, CompletionFuture, CompletionRequest, CompletionResponse,
    IssuePage, IssueSource, LlmClient, NamedRef, PortFuture, RawAuthor, RawCommit, RawIssue,
    RawIssueFields,
};

/// Clock pinned to a settable instant.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn issue(key: &str, updated: DateTime<Utc>) -> Issue {
    Issue {
        key: key.to_string(),
        summary: format!("summary of {key}"),
        description: String::new(),
        components: Vec::new(),
        fix_versions: Vec::new(),
        updated,
    }
}

pub fn raw_issue(key: &str, updated: &str) -> RawIssue {
    RawIssue {
        key: Some(key.to_string()),
        fields: RawIssueFields {
            summary: Some(format!("summary of {key}")),
            description: None,
            components: Some(vec![NamedRef { name: Some("core".into()) }]),
            fix_versions: None,
            updated: Some(updated.to_string()),
        },
    }
}

pub fn raw_commit(sha: &str, message: &str, at: DateTime<Utc>) -> RawCommit {
    RawCommit {
        id: Some(sha.to_string()),
        author: Some(RawAuthor { name: Some("dev".into()) }),
        author_timestamp: Some(at.timestamp_millis()),
        message: Some(message.to_string()),
    }
}

/// Serves a fixed list of issues, paginated by the requested offset.
pub struct FakeIssueSource {
    issues: Vec<RawIssue>,
    fail_at: Option<u32>,
    pub calls: AtomicUsize,
}

impl FakeIssueSource {
    pub fn new(issues: Vec<RawIssue>) -> Self {
        Self { issues, fail_at: None, calls: AtomicUsize::new(0) }
    }

    pub fn failing_at(mut self, offset: u32) -> Self {
        self.fail_at = Some(offset);
        self
    }
}

impl IssueSource for FakeIssueSource {
    fn search_page<'a>(
        &'a self,
        _query: &'a str,
        start_at: u32,
        max_results: u32,
    ) -> PortFuture<'a, IssuePage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_at == Some(start_at) {
            Err("tracker unavailable".into())
        } else {
            let issues = self
                .issues
                .iter()
                .skip(start_at as usize)
                .take(max_results as usize)
                .cloned()
                .collect();
            Ok(IssuePage {
                start_at,
                max_results,
                total: u32::try_from(self.issues.len()).unwrap(),
                issues,
            })
        };
        Box::pin(async move { result })
    }
}

/// Serves scripted commit pages per repository/branch pair.
///
/// Pages are looked up by the requested cursor. A pair mapped to an error
/// fails every request; an optional delay lets tests shuffle completion order.
#[derive(Default)]
pub struct FakeCommitSource {
    pages: HashMap<RepoBranch, Result<HashMap<u32, CommitPage>, String>>,
    delays: HashMap<RepoBranch, Duration>,
    pub calls: AtomicUsize,
}

impl FakeCommitSource {
    pub fn with_pages(mut self, target: RepoBranch, pages: Vec<(u32, CommitPage)>) -> Self {
        self.pages.insert(target, Ok(pages.into_iter().collect()));
        self
    }

    pub fn with_single_page(self, target: RepoBranch, values: Vec<RawCommit>) -> Self {
        let page = CommitPage { values, is_last_page: true, next_page_start: None };
        self.with_pages(target, vec![(0, page)])
    }

    pub fn with_failure(mut self, target: RepoBranch, message: &str) -> Self {
        self.pages.insert(target, Err(message.to_string()));
        self
    }

    pub fn with_delay(mut self, target: RepoBranch, delay: Duration) -> Self {
        self.delays.insert(target, delay);
        self
    }
}

impl CommitSource for FakeCommitSource {
    fn commits_page<'a>(
        &'a self,
        target: &'a RepoBranch,
        _window: &'a Window,
        start: u32,
    ) -> PortFuture<'a, CommitPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.get(target).copied();
        let result = match self.pages.get(target) {
            None => Err(format!("unknown repository {target}").into()),
            Some(Err(message)) => Err(message.clone().into()),
            Some(Ok(pages)) => pages
                .get(&start)
                .cloned()
                .ok_or_else(|| format!("no page at cursor {start} for {target}").into()),
        };
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

/// Language model that answers every prompt with the same text and keeps the
/// prompts it saw.
pub struct FakeLlm {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn replying(text: &str) -> Self {
        Self { reply: Ok(text.to_string()), prompts: Mutex::new(Vec::new()) }
    }

    pub fn failing(message: &str) -> Self {
        Self { reply: Err(message.to_string()), prompts: Mutex::new(Vec::new()) }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LlmClient for FakeLlm {
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let result = match &self.reply {
            Ok(text) => Ok(CompletionResponse {
                text: text.clone(),
                prompt_tokens: 10,
                completion_tokens: 5,
            }),
            Err(message) => Err(message.clone().into()),
        };
        Box::pin(async move { result })
    }
}
