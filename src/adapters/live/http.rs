//! Shared HTTP transport: TLS setup, timeouts, retry with backoff, JSON decoding.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Certificate, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::AuditError;

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How failed requests are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after each further one.
    pub initial_delay: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Failure of one HTTP exchange after retries.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status.
        status: StatusCode,
        /// Response body, truncated.
        body: String,
    },
    /// The body was not the expected JSON.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// JSON-over-HTTP client shared by the live adapters.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Builds a client trusting the system roots plus any configured PEM
    /// bundle (`pem_path`, else `SSL_CERT_FILE`).
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] if the bundle cannot be read or
    /// parsed, or the client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self, AuditError> {
        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(bundle) = ca_bundle(settings) {
            let pem = std::fs::read(&bundle).map_err(|e| {
                AuditError::Configuration(format!(
                    "failed to read CA bundle {}: {e}",
                    bundle.display()
                ))
            })?;
            let certificates = Certificate::from_pem_bundle(&pem).map_err(|e| {
                AuditError::Configuration(format!("invalid CA bundle {}: {e}", bundle.display()))
            })?;
            debug!(
                bundle = %bundle.display(),
                certificates = certificates.len(),
                "using extra CA bundle"
            );
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }
        let client = builder
            .build()
            .map_err(|e| AuditError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self::new(client))
    }

    /// Wraps an existing client with the default retry policy.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client, retry: RetryPolicy::default() }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// `GET url?query` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] once retries are exhausted, on a non-retryable
    /// status, or if the body does not decode.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        authorization: Option<&str>,
    ) -> Result<T, HttpError> {
        let body = self
            .send(url, || with_auth(self.client.get(url).query(query), authorization))
            .await?;
        decode(url, &body)
    }

    /// `POST url` with a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::get_json`].
    pub async fn post_json<B, T>(
        &self,
        url: &str,
        body: &B,
        authorization: Option<&str>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self
            .send(url, || with_auth(self.client.post(url).json(body), authorization))
            .await?;
        decode(url, &text)
    }

    /// Sends the request built by `build`, retrying transport failures,
    /// `429`, and `5xx` with exponential backoff.
    async fn send(
        &self,
        url: &str,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<String, HttpError> {
        let mut attempt = 1;
        loop {
            let failure = match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|source| HttpError::Transport { url: url.to_string(), source })?;
                    if status.is_success() {
                        return Ok(body);
                    }
                    let error =
                        HttpError::Status { url: url.to_string(), status, body: truncate(body) };
                    if !is_retryable(status) {
                        return Err(error);
                    }
                    error
                }
                Err(source) => HttpError::Transport { url: url.to_string(), source },
            };

            if attempt >= self.retry.max_attempts {
                return Err(failure);
            }
            let delay = self.retry.delay_after(attempt);
            warn!(attempt, delay_ms = delay.as_millis(), error = %failure, "retrying request");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn with_auth(request: RequestBuilder, authorization: Option<&str>) -> RequestBuilder {
    match authorization {
        Some(value) => request.header(AUTHORIZATION, value),
        None => request,
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, HttpError> {
    serde_json::from_str(body).map_err(|source| HttpError::Decode { url: url.to_string(), source })
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn truncate(mut body: String) -> String {
    const LIMIT: usize = 500;
    if body.len() > LIMIT {
        let mut end = LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}

fn ca_bundle(settings: &Settings) -> Option<PathBuf> {
    if let Some(path) = &settings.pem_path {
        if path.exists() {
            return Some(path.clone());
        }
        warn!(
            path = %path.display(),
            "configured PEM bundle not found; falling back to SSL_CERT_FILE"
        );
    }
    std::env::var_os("SSL_CERT_FILE").map(PathBuf::from).filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fast_client() -> HttpClient {
        HttpClient::new(Client::new()).with_retry(RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        })
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=5).map(|n| policy.delay_after(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 10]);
    }

    #[tokio::test]
    async fn sends_query_and_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .and(query_param("q", "a b"))
            .and(header("authorization", "Bearer t"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let value: serde_json::Value = fast_client()
            .get_json(&format!("{}/thing", server.uri()), &[("q", "a b".into())], Some("Bearer t"))
            .await
            .unwrap();

        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1])))
            .expect(1)
            .mount(&server)
            .await;

        let value: Vec<u32> = fast_client().get_json(&server.uri(), &[], None).await.unwrap();

        assert_eq!(value, vec![1]);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let err = fast_client()
            .get_json::<serde_json::Value>(&server.uri(), &[], None)
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::Status { status: StatusCode::TOO_MANY_REQUESTS, .. }));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .expect(1)
            .mount(&server)
            .await;

        let err = fast_client()
            .get_json::<serde_json::Value>(&server.uri(), &[], None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("bad credentials"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = fast_client()
            .post_json::<_, serde_json::Value>(&server.uri(), &serde_json::json!({}), None)
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::Decode { .. }));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = truncate("é".repeat(400));
        assert!(body.ends_with("..."));
        assert!(body.len() <= 503);
    }
}
