//! Service context bundling the port trait objects for one run.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::adapters::live::bitbucket::BitbucketCommitSource;
use crate::adapters::live::clock::SystemClock;
use crate::adapters::live::http::HttpClient;
use crate::adapters::live::jira::JiraIssueSource;
use crate::adapters::live::llm::LiveLlmClient;
use crate::adapters::live::oauth::HttpTokenEndpoint;
use crate::adapters::recording::{RecordingCommitSource, RecordingIssueSource, RecordingLlmClient};
use crate::adapters::replaying::{ReplayingCommitSource, ReplayingIssueSource, ReplayingLlmClient};
use crate::auth::{JiraCredential, OAuthTokenManager, StaticCredential};
use crate::cassette::{Cassette, CassetteRecorder, CassetteReplayer};
use crate::config::Settings;
use crate::error::AuditError;
use crate::ports::{Clock, CommitSource, CredentialProvider, IssueSource, LlmClient};

/// The ports one command works against.
///
/// Constructors wire live adapters, live adapters wrapped for recording, or
/// cassette-backed replaying adapters.
pub struct ServiceContext {
    /// Wall clock for cache ages and token expiry.
    pub clock: Arc<dyn Clock>,
    /// Issue tracker search.
    pub issues: Arc<dyn IssueSource>,
    /// Source-control commit listing.
    pub commits: Arc<dyn CommitSource>,
    /// Language model for summaries.
    pub llm: Arc<dyn LlmClient>,
    replaying: bool,
    /// Cassette recorder; written to disk on drop.
    recorder: Option<Arc<Mutex<CassetteRecorder>>>,
}

impl ServiceContext {
    /// Creates a context talking to the configured services.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn live(settings: &Settings) -> Result<Self, AuditError> {
        let http = HttpClient::from_settings(settings)?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let jira_credentials: Arc<dyn CredentialProvider> =
            Arc::new(JiraCredential::from_settings(settings));
        let bitbucket_credentials: Arc<dyn CredentialProvider> = if settings.oauth_enabled() {
            Arc::new(OAuthTokenManager::new(
                &settings.oauth_token_path,
                Arc::new(HttpTokenEndpoint::from_settings(http.clone(), settings)),
                Arc::clone(&clock),
            ))
        } else {
            Arc::new(StaticCredential::bearer(&settings.bitbucket_token))
        };

        Ok(Self {
            issues: Arc::new(JiraIssueSource::new(
                http.clone(),
                &settings.jira_base_url,
                jira_credentials,
            )),
            commits: Arc::new(BitbucketCommitSource::new(
                http.clone(),
                &settings.bitbucket_base_url,
                bitbucket_credentials,
            )),
            llm: Arc::new(LiveLlmClient::new(reqwest::Client::new(), settings)),
            clock,
            replaying: false,
            recorder: None,
        })
    }

    /// Creates a live context that records every port call to a cassette at
    /// `path`, written when the context is dropped.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceContext::live`].
    pub fn recording(settings: &Settings, path: &Path) -> Result<Self, AuditError> {
        let live = Self::live(settings)?;
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(path, "release-audit")));
        info!(cassette = %path.display(), "recording port interactions");

        Ok(Self {
            clock: Arc::clone(&live.clock),
            issues: Arc::new(RecordingIssueSource::new(
                Arc::clone(&live.issues),
                Arc::clone(&recorder),
            )),
            commits: Arc::new(RecordingCommitSource::new(
                Arc::clone(&live.commits),
                Arc::clone(&recorder),
            )),
            llm: Arc::new(RecordingLlmClient::new(Arc::clone(&live.llm), Arc::clone(&recorder))),
            replaying: false,
            recorder: Some(recorder),
        })
    }

    /// Creates a context answering every port call from the cassette at
    /// `path`. No network access happens.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] if the cassette cannot be read.
    pub fn replaying(path: &Path) -> Result<Self, AuditError> {
        let cassette = Cassette::load(path)?;
        info!(
            cassette = %path.display(),
            interactions = cassette.interactions.len(),
            "replaying cassette"
        );
        let replayer = Arc::new(Mutex::new(CassetteReplayer::new(&cassette)));

        Ok(Self {
            clock: Arc::new(SystemClock),
            issues: Arc::new(ReplayingIssueSource::new(Arc::clone(&replayer))),
            commits: Arc::new(ReplayingCommitSource::new(Arc::clone(&replayer))),
            llm: Arc::new(ReplayingLlmClient::new(replayer)),
            replaying: true,
            recorder: None,
        })
    }

    /// Returns `true` when answers come from a cassette.
    #[must_use]
    pub fn is_replaying(&self) -> bool {
        self.replaying
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            return;
        };
        let Ok(recorder) = recorder.lock() else {
            warn!("cassette recorder lock poisoned; cassette not written");
            return;
        };
        match recorder.write() {
            Ok(path) => {
                let interactions = recorder.len();
                info!(cassette = %path.display(), interactions, "cassette written");
            }
            Err(e) => warn!(error = %e, "failed to write cassette"),
        }
    }
}
