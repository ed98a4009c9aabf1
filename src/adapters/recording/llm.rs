//! Recording adapter for the `LlmClient` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::adapters::LLM_PORT;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{CompletionFuture, CompletionRequest, LlmClient};

/// Records completions while delegating to an inner client.
pub struct RecordingLlmClient {
    inner: Arc<dyn LlmClient>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingLlmClient {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn LlmClient>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl LlmClient for RecordingLlmClient {
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.complete(&request).await;
            match serde_json::to_value(&request) {
                Ok(input) => record_result(&self.recorder, LLM_PORT, "complete", &input, &result),
                Err(e) => tracing::warn!(error = %e, "completion request not recorded"),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlm;

    #[tokio::test]
    async fn records_request_and_response() {
        let dir = tempfile::tempdir().unwrap();
        let recorder =
            Arc::new(Mutex::new(CassetteRecorder::new(dir.path().join("llm.yaml"), "test")));
        let client =
            RecordingLlmClient::new(Arc::new(FakeLlm::replying("ok")), Arc::clone(&recorder));
        let request = CompletionRequest { model: "m".into(), prompt: "hi".into(), max_tokens: 8 };

        client.complete(&request).await.unwrap();

        assert_eq!(recorder.lock().unwrap().len(), 1);
    }
}
