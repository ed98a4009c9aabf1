//! Credential providers for the tracker and the source-control host.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::write_atomic;
use crate::config::Settings;
use crate::error::AuditError;
use crate::ports::{Clock, CredentialProvider, PortFuture};

/// Seconds shaved off a token's lifetime so it is never used right at expiry.
pub const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: i64 = 3600;

/// A fixed header value, or anonymous access.
pub struct StaticCredential(Option<String>);

impl StaticCredential {
    /// Bearer token credential; an empty token means anonymous.
    #[must_use]
    pub fn bearer(token: &str) -> Self {
        Self((!token.is_empty()).then(|| format!("Bearer {token}")))
    }

    /// Anonymous access.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl CredentialProvider for StaticCredential {
    fn authorization(&self) -> PortFuture<'_, Option<String>> {
        let header = self.0.clone();
        Box::pin(async move { Ok(header) })
    }
}

/// Jira credentials: an OAuth token file if it yields an access token,
/// otherwise basic auth from e-mail and API token.
pub struct JiraCredential {
    token_file: Option<PathBuf>,
    basic: Option<String>,
}

impl JiraCredential {
    /// Builds the provider from settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let has_basic = !settings.jira_email.is_empty() && !settings.jira_api_token.is_empty();
        let basic = has_basic.then(|| {
            let raw = format!("{}:{}", settings.jira_email, settings.jira_api_token);
            format!("Basic {}", STANDARD.encode(raw))
        });
        Self { token_file: settings.jira_token_file.clone(), basic }
    }

    fn header(&self) -> Option<String> {
        // The token file is re-read on every call; another process may rotate it.
        let from_file = self.token_file.as_deref().and_then(read_access_token);
        from_file.map(|token| format!("Bearer {token}")).or_else(|| self.basic.clone())
    }
}

fn read_access_token(path: &Path) -> Option<String> {
    #[derive(Deserialize)]
    struct TokenFile {
        access_token: Option<String>,
    }

    let content = std::fs::read_to_string(path).ok()?;
    let file: TokenFile = serde_json::from_str(&content).ok()?;
    file.access_token.filter(|token| !token.is_empty())
}

impl CredentialProvider for JiraCredential {
    fn authorization(&self) -> PortFuture<'_, Option<String>> {
        let header = self.header();
        Box::pin(async move { Ok(header) })
    }
}

/// A persisted OAuth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    /// Bearer token sent with requests.
    pub access_token: String,
    /// Token exchanged for a new access token.
    pub refresh_token: String,
    /// Lifetime in seconds from `obtained_at`.
    pub expires_in: i64,
    /// When the token was issued.
    pub obtained_at: DateTime<Utc>,
}

impl OAuthToken {
    /// Absolute expiry time; `None` when `expires_in` is out of range.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_seconds(self.expires_in)
            .and_then(|ttl| self.obtained_at.checked_add_signed(ttl))
    }

    /// Returns `true` while `now` is more than [`EXPIRY_SKEW_SECONDS`] before
    /// expiry. An out-of-range lifetime counts as stale.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_in
            .checked_sub(EXPIRY_SKEW_SECONDS)
            .and_then(TimeDelta::try_seconds)
            .and_then(|usable| self.obtained_at.checked_add_signed(usable))
            .is_some_and(|until| until > now)
    }
}

/// Response of a refresh-token grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// New access token.
    pub access_token: String,
    /// Rotated refresh token, if the server issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Exchanges a refresh token for a new grant.
pub trait TokenEndpoint: Send + Sync {
    /// Performs the refresh-token grant.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint rejects the token or is unreachable.
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> PortFuture<'a, TokenGrant>;
}

/// Hands out a valid access token, refreshing and persisting it when stale.
///
/// Refreshes are serialized so concurrent callers holding an expired token
/// trigger a single grant.
pub struct OAuthTokenManager {
    store: PathBuf,
    endpoint: Arc<dyn TokenEndpoint>,
    clock: Arc<dyn Clock>,
    refresh_lock: Mutex<()>,
}

impl OAuthTokenManager {
    /// Creates a manager persisting tokens at `store`.
    pub fn new(
        store: impl Into<PathBuf>,
        endpoint: Arc<dyn TokenEndpoint>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store: store.into(), endpoint, clock, refresh_lock: Mutex::new(()) }
    }

    /// Reads the stored token; `None` if none has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Auth`] if the token file exists but cannot be read.
    pub fn load(&self) -> Result<Option<OAuthToken>, AuditError> {
        let content = match std::fs::read_to_string(&self.store) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuditError::Auth(format!(
                    "failed to read {}: {e}",
                    self.store.display()
                )))
            }
        };
        serde_json::from_str(&content).map(Some).map_err(|e| {
            AuditError::Auth(format!("corrupt token file {}: {e}", self.store.display()))
        })
    }

    /// Persists `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Auth`] if the token cannot be written.
    pub fn save(&self, token: &OAuthToken) -> Result<(), AuditError> {
        let json = serde_json::to_vec_pretty(token).map_err(|e| AuditError::Auth(e.to_string()))?;
        write_atomic(&self.store, &json)
            .map_err(|e| AuditError::Auth(format!("failed to write {}: {e}", self.store.display())))
    }

    /// Returns a currently valid access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Auth`] if no token is stored (initial
    /// authentication has not happened) or the refresh fails.
    pub async fn access_token(&self) -> Result<String, AuditError> {
        let _guard = self.refresh_lock.lock().await;
        let token = self.load()?.ok_or_else(|| {
            AuditError::Auth(format!(
                "no OAuth token at {}; perform initial authentication",
                self.store.display()
            ))
        })?;

        let now = self.clock.now();
        if token.is_fresh(now) {
            debug!(expires_at = ?token.expires_at(), "using stored access token");
            return Ok(token.access_token);
        }

        info!(expired_at = ?token.expires_at(), "refreshing access token");
        let grant = self
            .endpoint
            .refresh(&token.refresh_token)
            .await
            .map_err(|e| AuditError::Auth(format!("token refresh failed: {e}")))?;
        let refreshed = OAuthToken {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.unwrap_or(token.refresh_token),
            expires_in: grant.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
            obtained_at: now,
        };
        self.save(&refreshed)?;
        Ok(refreshed.access_token)
    }
}

impl CredentialProvider for OAuthTokenManager {
    fn authorization(&self) -> PortFuture<'_, Option<String>> {
        Box::pin(async move {
            let token = self.access_token().await?;
            Ok(Some(format!("Bearer {token}")))
        })
    }
}
