//! Live adapter for the `LlmClient` port using an OpenAI-compatible
//! chat-completions API.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::PortError;
use crate::ports::llm::{CompletionFuture, CompletionRequest, CompletionResponse, LlmClient};

/// Live client for `POST {base}/v1/chat/completions`.
pub struct LiveLlmClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LiveLlmClient {
    /// Creates a client from the `openai_*` settings.
    #[must_use]
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            api_key: settings.openai_api_key.clone(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl LlmClient for LiveLlmClient {
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(PortError::from("OPENAI_API_KEY is not set"));
            }

            let body = ChatRequest {
                model: &request.model,
                max_tokens: request.max_tokens,
                messages: vec![ChatMessage { role: "user", content: &request.prompt }],
            };

            let response = self
                .client
                .post(format!("{}/v1/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| -> PortError {
                    format!("chat completion request failed: {e}").into()
                })?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| -> PortError {
                    format!("failed to read chat completion response: {e}").into()
                })?;

            if !status.is_success() {
                let message = serde_json::from_str::<ApiError>(&text)
                    .map(|e| e.error.message)
                    .unwrap_or(text);
                return Err(
                    format!("chat completion error ({}): {message}", status.as_u16()).into()
                );
            }

            let parsed: ChatResponse = serde_json::from_str(&text)
                .map_err(|e| -> PortError {
                    format!("failed to parse chat completion response: {e}").into()
                })?;
            let text = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| PortError::from("chat completion returned no choices"))?;

            Ok(CompletionResponse {
                text: text.trim().to_string(),
                prompt_tokens: parsed.usage.prompt_tokens,
                completion_tokens: parsed.usage.completion_tokens,
            })
        })
    }
}
