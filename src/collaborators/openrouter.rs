//! `OpenRouter` chat completions client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Completion, CompletionRequest, LanguageModel};
use crate::config::LlmConfig;
use crate::{Error, Result};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Language model reached through an OpenAI-compatible chat endpoint
pub struct OpenRouterClient {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenRouterClient {
    #[must_use]
    pub fn new(llm: &LlmConfig, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: llm.url.clone(),
            model: llm.model.clone(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::Collaborator("OPENROUTER_API_KEY is not set".to_string()));
        };

        tracing::debug!(model = %self.model, command = %request.user_text, "sending completion");

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_persona,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_text,
                },
            ],
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("language model unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "language model error");
            return Err(Error::Collaborator(format!("language model error {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Collaborator(format!("malformed completion: {e}")))?;

        let completion = first_completion(parsed)?;
        tracing::debug!(response_len = completion.text.len(), "completion received");
        Ok(completion)
    }
}

fn first_completion(response: ChatResponse) -> Result<Completion> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .map(|text| Completion { text })
        .ok_or_else(|| Error::Collaborator("language model returned no content".to_string()))
}
