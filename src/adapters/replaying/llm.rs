//! Replaying adapter for the `LlmClient` port.

use std::sync::{Arc, Mutex};

use super::replay;
use crate::adapters::LLM_PORT;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{CompletionFuture, CompletionRequest, LlmClient};

/// Serves recorded completions.
pub struct ReplayingLlmClient {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingLlmClient {
    /// Creates a client backed by `replayer`.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl LlmClient for ReplayingLlmClient {
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_> {
        let result = serde_json::to_value(request)
            .map_err(Into::into)
            .and_then(|input| replay(&self.replayer, LLM_PORT, "complete", &input));
        Box::pin(async move { result })
    }
}
