//! Jira search API adapter for the `IssueSource` port.

use std::sync::Arc;

use super::http::HttpClient;
use crate::ports::{CredentialProvider, IssuePage, IssueSource, PortFuture};

/// Issue fields requested from the search endpoint.
const FIELDS: &str = "summary,description,components,fixVersions,updated";

/// Pages through `GET {base}/rest/api/2/search`.
pub struct JiraIssueSource {
    http: HttpClient,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl JiraIssueSource {
    /// Creates a source for the Jira instance at `base_url`.
    pub fn new(http: HttpClient, base_url: &str, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), credentials }
    }
}

impl IssueSource for JiraIssueSource {
    fn search_page<'a>(
        &'a self,
        query: &'a str,
        start_at: u32,
        max_results: u32,
    ) -> PortFuture<'a, IssuePage> {
        Box::pin(async move {
            let authorization = self.credentials.authorization().await?;
            let url = format!("{}/rest/api/2/search", self.base_url);
            let params = [
                ("jql", query.to_string()),
                ("startAt", start_at.to_string()),
                ("maxResults", max_results.to_string()),
                ("fields", FIELDS.to_string()),
            ];
            Ok(self.http.get_json(&url, &params, authorization.as_deref()).await?)
        })
    }
}
