//! Language-model port used for audit summaries.

use serde::{Deserialize, Serialize};

use super::PortFuture;

/// Boxed future returned by [`LlmClient::complete`].
pub type CompletionFuture<'a> = PortFuture<'a, CompletionResponse>;

/// A single-turn prompt sent as the user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Chat model name, e.g. `gpt-4o-mini`.
    pub model: String,
    /// User prompt.
    pub prompt: String,
    /// Cap on generated tokens.
    pub max_tokens: u32,
}

/// Text of the first choice plus token accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text, trimmed.
    pub text: String,
    /// Prompt tokens billed.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Completion tokens billed.
    #[serde(default)]
    pub completion_tokens: u32,
}

/// Chat-completions backend.
pub trait LlmClient: Send + Sync {
    /// Completes `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing, the request fails, or the
    /// response carries no choice.
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_>;
}
