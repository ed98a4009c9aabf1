//! Natural-language summaries of audit results.

use tracing::debug;

use crate::error::AuditError;
use crate::model::{Commit, Issue};
use crate::ports::{CompletionRequest, LlmClient};

/// Reply used when no issue is missing commits; no model call is made.
pub const ALL_LINKED: &str = "All stories are linked to commits.";

const MAX_TOKENS: u32 = 1024;

/// Builds prompts from audit data and sends them to a language model.
pub struct Summarizer<'a> {
    llm: &'a dyn LlmClient,
    model: String,
}

impl<'a> Summarizer<'a> {
    /// Creates a summarizer using `model`.
    pub fn new(llm: &'a dyn LlmClient, model: impl Into<String>) -> Self {
        Self { llm, model: model.into() }
    }

    /// Summarizes the issues that have no linked commit.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Summary`] if the model call fails.
    pub async fn summarize_missing(&self, missing: &[String]) -> Result<String, AuditError> {
        if missing.is_empty() {
            return Ok(ALL_LINKED.to_string());
        }
        let prompt = format!(
            "You are a release auditor. Summarize the following Jira keys that are missing commits: {}",
            missing.join(", ")
        );
        self.ask(prompt).await
    }

    /// Suggests regression-test areas from commit messages.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Summary`] if the model call fails.
    pub async fn suggest_regression_areas(&self, commits: &[Commit]) -> Result<String, AuditError> {
        let messages: Vec<&str> = commits.iter().map(|commit| commit.message.trim()).collect();
        let prompt = format!(
            "Suggest regression test areas based on these commit messages:\n{}",
            messages.join("\n")
        );
        self.ask(prompt).await
    }

    /// Drafts release notes from issue summaries.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Summary`] if the model call fails.
    pub async fn release_notes(&self, issues: &[Issue]) -> Result<String, AuditError> {
        let lines: Vec<String> =
            issues.iter().map(|issue| format!("- {}: {}", issue.key, issue.summary)).collect();
        let prompt = format!(
            "Generate concise release notes from the following issues:\n{}",
            lines.join("\n")
        );
        self.ask(prompt).await
    }

    async fn ask(&self, prompt: String) -> Result<String, AuditError> {
        let request =
            CompletionRequest { model: self.model.clone(), prompt, max_tokens: MAX_TOKENS };
        let response =
            self.llm.complete(&request).await.map_err(|e| AuditError::Summary(e.to_string()))?;
        debug!(
            model = %self.model,
            prompt_tokens = response.prompt_tokens,
            completion_tokens = response.completion_tokens,
            "summary generated"
        );
        Ok(response.text.trim().to_string())
    }
}
