//! Refresh-token grant against the configured OAuth token endpoint.

use serde::Serialize;

use super::http::HttpClient;
use crate::auth::{TokenEndpoint, TokenGrant};
use crate::config::Settings;
use crate::ports::PortFuture;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'a str,
    refresh_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

/// `POST {oauth_token_url}` with a JSON refresh-token grant.
pub struct HttpTokenEndpoint {
    http: HttpClient,
    url: String,
    client_id: String,
    client_secret: String,
}

impl HttpTokenEndpoint {
    /// Creates an endpoint from the OAuth settings.
    #[must_use]
    pub fn from_settings(http: HttpClient, settings: &Settings) -> Self {
        Self {
            http,
            url: settings.oauth_token_url.clone(),
            client_id: settings.oauth_client_id.clone(),
            client_secret: settings.oauth_client_secret.clone(),
        }
    }
}

impl TokenEndpoint for HttpTokenEndpoint {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> PortFuture<'a, TokenGrant> {
        Box::pin(async move {
            let body = RefreshRequest {
                grant_type: "refresh_token",
                refresh_token,
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            };
            Ok(self.http.post_json(&self.url, &body, None).await?)
        })
    }
}
