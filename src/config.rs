//! Application settings.
//!
//! Settings are built once at startup and passed by reference into the
//! pipeline, fetchers, cache, and adapters. Precedence, highest first:
//! environment variables, `.env`, `config.yaml`, built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::audit::fetch::DEFAULT_WORKERS;
use crate::audit::window::DEFAULT_BUFFER_DAYS;
use crate::error::AuditError;

/// Default location of the YAML settings file.
pub const CONFIG_FILE: &str = "config.yaml";

/// Largest accepted `window_buffer_days`.
pub const MAX_WINDOW_BUFFER_DAYS: i64 = 3650;

/// Bitbucket repository defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitbucketSettings {
    /// Project key prefixed to bare repository slugs.
    pub project_key: String,
    /// Repository slugs audited when none are given on the command line.
    pub repos: Vec<String>,
    /// Branches audited when none are given on the command line.
    pub branch_defaults: Vec<String>,
}

impl Default for BitbucketSettings {
    fn default() -> Self {
        Self {
            project_key: String::new(),
            repos: Vec::new(),
            branch_defaults: vec!["develop".into()],
        }
    }
}

/// Jira query defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraDefaults {
    /// JQL used when none is given on the command line.
    pub jql_default: String,
}

/// All runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Jira base URL, e.g. `https://jira.example.com`.
    pub jira_base_url: String,
    /// Jira account e-mail for basic auth.
    pub jira_email: String,
    /// Jira API token for basic auth.
    pub jira_api_token: String,
    /// JSON file holding a Jira OAuth `access_token`; preferred over basic auth.
    pub jira_token_file: Option<PathBuf>,

    /// Bitbucket Server base URL.
    pub bitbucket_base_url: String,
    /// Static Bitbucket bearer token, used when OAuth is not configured.
    pub bitbucket_token: String,

    /// OAuth token endpoint for Bitbucket refresh-token flow.
    pub oauth_token_url: String,
    /// OAuth client id.
    pub oauth_client_id: String,
    /// OAuth client secret.
    pub oauth_client_secret: String,
    /// Where the OAuth token is persisted between runs.
    pub oauth_token_path: PathBuf,

    /// API key for the chat-completions endpoint.
    pub openai_api_key: String,
    /// Model used for summaries.
    pub openai_model: String,
    /// Base URL of the chat-completions API.
    pub openai_base_url: String,

    /// Extra root CA bundle (PEM) for outbound TLS.
    pub pem_path: Option<PathBuf>,

    /// Directory holding cached audit results.
    pub cache_dir: PathBuf,
    /// Maximum age of a cached audit; negative disables expiry.
    pub cache_ttl_seconds: i64,
    /// Concurrent repository/branch fetches.
    pub threads: usize,
    /// Days of padding around the issue update range.
    pub window_buffer_days: i64,

    /// Bitbucket repository defaults.
    pub bitbucket: BitbucketSettings,
    /// Jira query defaults.
    pub jira: JiraDefaults,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jira_base_url: String::new(),
            jira_email: String::new(),
            jira_api_token: String::new(),
            jira_token_file: None,
            bitbucket_base_url: String::new(),
            bitbucket_token: String::new(),
            oauth_token_url: String::new(),
            oauth_client_id: String::new(),
            oauth_client_secret: String::new(),
            oauth_token_path: PathBuf::from("cache/oauth_token.json"),
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".into(),
            openai_base_url: "https://api.openai.com".into(),
            pem_path: None,
            cache_dir: PathBuf::from("cache"),
            cache_ttl_seconds: 3600,
            threads: DEFAULT_WORKERS,
            window_buffer_days: DEFAULT_BUFFER_DAYS,
            bitbucket: BitbucketSettings::default(),
            jira: JiraDefaults::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `config.yaml`, `.env`, and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] if the YAML file cannot be read
    /// or parsed, `.env` exists but is malformed, or an environment
    /// override has the wrong type.
    pub fn load() -> Result<Self, AuditError> {
        load_dotenv(Path::new(".env"))?;
        Self::load_from(Path::new(CONFIG_FILE), |name| std::env::var(name).ok())
    }

    /// Loads settings from `yaml_path` (if it exists) and then applies
    /// overrides looked up through `env`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] on unreadable or invalid input.
    pub fn load_from<F>(yaml_path: &Path, env: F) -> Result<Self, AuditError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = if yaml_path.exists() {
            let content = std::fs::read_to_string(yaml_path).map_err(|e| {
                AuditError::Configuration(format!("failed to read {}: {e}", yaml_path.display()))
            })?;
            Self::from_yaml(&content).map_err(|e| {
                AuditError::Configuration(format!("failed to parse {}: {e}", yaml_path.display()))
            })?
        } else {
            Self::default()
        };
        settings.apply_env(env)?;
        Ok(settings)
    }

    fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Applies `UPPER_CASE` environment overrides for every scalar setting.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] if a numeric override does not parse.
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), AuditError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str, slot: &mut String| {
            if let Some(value) = env(name) {
                *slot = value;
            }
        };
        text("JIRA_BASE_URL", &mut self.jira_base_url);
        text("JIRA_EMAIL", &mut self.jira_email);
        text("JIRA_API_TOKEN", &mut self.jira_api_token);
        text("BITBUCKET_BASE_URL", &mut self.bitbucket_base_url);
        text("BITBUCKET_TOKEN", &mut self.bitbucket_token);
        text("OAUTH_TOKEN_URL", &mut self.oauth_token_url);
        text("OAUTH_CLIENT_ID", &mut self.oauth_client_id);
        text("OAUTH_CLIENT_SECRET", &mut self.oauth_client_secret);
        text("OPENAI_API_KEY", &mut self.openai_api_key);
        text("OPENAI_MODEL", &mut self.openai_model);
        text("OPENAI_BASE_URL", &mut self.openai_base_url);

        if let Some(value) = env("JIRA_TOKEN_FILE") {
            self.jira_token_file = Some(PathBuf::from(value));
        }
        if let Some(value) = env("OAUTH_TOKEN_PATH") {
            self.oauth_token_path = PathBuf::from(value);
        }
        if let Some(value) = env("PEM_PATH") {
            self.pem_path = Some(PathBuf::from(value));
        }
        if let Some(value) = env("CACHE_DIR") {
            self.cache_dir = PathBuf::from(value);
        }
        if let Some(value) = env("CACHE_TTL_SECONDS") {
            self.cache_ttl_seconds = parse_number("CACHE_TTL_SECONDS", &value)?;
        }
        if let Some(value) = env("THREADS") {
            self.threads = parse_number("THREADS", &value)?;
        }
        if let Some(value) = env("WINDOW_BUFFER_DAYS") {
            self.window_buffer_days = parse_number("WINDOW_BUFFER_DAYS", &value)?;
        }
        Ok(())
    }

    /// Checks the settings an audit cannot run without.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] naming the first missing setting.
    pub fn validate_for_audit(&self) -> Result<(), AuditError> {
        if self.jira_base_url.trim().is_empty() {
            return Err(AuditError::Configuration("JIRA_BASE_URL is not set".into()));
        }
        if self.bitbucket_base_url.trim().is_empty() {
            return Err(AuditError::Configuration("BITBUCKET_BASE_URL is not set".into()));
        }
        if self.threads == 0 {
            return Err(AuditError::Configuration("THREADS must be at least 1".into()));
        }
        self.window_buffer()?;
        Ok(())
    }

    /// Cache time-to-live; `None` when expiry is disabled.
    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        u64::try_from(self.cache_ttl_seconds).ok().map(Duration::from_secs)
    }

    /// Padding around the issue update range.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] unless `window_buffer_days` is
    /// between 0 and [`MAX_WINDOW_BUFFER_DAYS`].
    pub fn window_buffer(&self) -> Result<TimeDelta, AuditError> {
        let days = self.window_buffer_days;
        (0..=MAX_WINDOW_BUFFER_DAYS)
            .contains(&days)
            .then(|| TimeDelta::try_days(days))
            .flatten()
            .ok_or_else(|| {
                AuditError::Configuration(format!(
                    "WINDOW_BUFFER_DAYS must be between 0 and {MAX_WINDOW_BUFFER_DAYS}, got {days}"
                ))
            })
    }

    /// Returns `true` when the Bitbucket OAuth refresh flow is configured.
    #[must_use]
    pub fn oauth_enabled(&self) -> bool {
        !self.oauth_token_url.is_empty()
    }
}

/// Applies `path` to the process environment without overriding variables
/// that are already set. A missing file is not an error.
fn load_dotenv(path: &Path) -> Result<(), AuditError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(AuditError::Configuration(format!("failed to load {}: {e}", path.display()))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AuditError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        AuditError::Configuration(format!("{name}={value:?} is not a valid number: {e}"))
    })
}
