//! Bitbucket Server commits API adapter for the `CommitSource` port.

use std::sync::Arc;

use super::http::HttpClient;
use crate::model::{RepoBranch, Window};
use crate::ports::{CommitPage, CommitSource, CredentialProvider, PortFuture};

/// Commits requested per page.
pub const COMMIT_PAGE_SIZE: u32 = 100;

/// Pages through `GET {base}/rest/api/1.0/projects/{project}/repos/{slug}/commits`.
///
/// The API has no date filter; the window is applied by the caller.
pub struct BitbucketCommitSource {
    http: HttpClient,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl BitbucketCommitSource {
    /// Creates a source for the Bitbucket Server at `base_url`.
    pub fn new(http: HttpClient, base_url: &str, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), credentials }
    }

    fn commits_url(&self, repo: &str) -> Result<String, String> {
        match repo.split_once('/') {
            Some((project, slug))
                if !project.is_empty() && !slug.is_empty() && !slug.contains('/') =>
            {
                Ok(format!(
                    "{}/rest/api/1.0/projects/{project}/repos/{slug}/commits",
                    self.base_url
                ))
            }
            _ => Err(format!("repository {repo:?} is not of the form PROJECT/slug")),
        }
    }
}

impl CommitSource for BitbucketCommitSource {
    fn commits_page<'a>(
        &'a self,
        target: &'a RepoBranch,
        _window: &'a Window,
        start: u32,
    ) -> PortFuture<'a, CommitPage> {
        Box::pin(async move {
            let url = self.commits_url(&target.repo)?;
            let authorization = self.credentials.authorization().await?;
            let params = [
                ("until", target.branch.clone()),
                ("limit", COMMIT_PAGE_SIZE.to_string()),
                ("start", start.to_string()),
            ];
            Ok(self.http.get_json(&url, &params, authorization.as_deref()).await?)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::audit::fetch::fetch_commits;
    use crate::auth::StaticCredential;
    use crate::testing::utc;

    fn source(base: &str) -> BitbucketCommitSource {
        BitbucketCommitSource::new(
            HttpClient::new(reqwest::Client::new()),
            base,
            Arc::new(StaticCredential::anonymous()),
        )
    }

    #[tokio::test]
    async fn follows_next_page_start_and_filters_window() {
        let server = MockServer::start().await;
        let inside = utc(2024, 1, 16).timestamp_millis();
        let outside = utc(2023, 12, 1).timestamp_millis();
        Mock::given(method("GET"))
            .and(path("/rest/api/1.0/projects/ABC/repos/app/commits"))
            .and(query_param("until", "develop"))
            .and(query_param("limit", "100"))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{
                    "id": "c1",
                    "author": {"name": "dev"},
                    "authorTimestamp": inside,
                    "message": "ABC-1 fix"
                }],
                "isLastPage": false,
                "nextPageStart": 100
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/1.0/projects/ABC/repos/app/commits"))
            .and(query_param("start", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{"id": "c0", "authorTimestamp": outside, "message": "old"}],
                "isLastPage": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let target = RepoBranch::new("ABC/app", "develop");
        let window = Window { start: utc(2024, 1, 8), end: utc(2024, 1, 27) };
        let commits = fetch_commits(&source(&server.uri()), &target, &window).await.unwrap();

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha, "c1");
        assert_eq!(commits[0].author.as_deref(), Some("dev"));
        assert_eq!(commits[0].branch, "develop");
    }

    #[tokio::test]
    async fn malformed_repository_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let window = Window { start: utc(2024, 1, 8), end: utc(2024, 1, 27) };
        for repo in ["app", "/app", "ABC/", "ABC/app/extra"] {
            let target = RepoBranch::new(repo, "develop");
            let err = source(&server.uri()).commits_page(&target, &window, 0).await.unwrap_err();
            assert!(err.to_string().contains("PROJECT/slug"), "{repo}");
        }
    }
}
