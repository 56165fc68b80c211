//! OpenAI-compatible `/chat/completions` client (Groq, Mistral, SambaNova, OpenRouter).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commit::prompt::build_commit_prompt;
use crate::error::GenerateError;
use crate::llm::MessageGenerator;
use crate::llm::http::{ClientSettings, build_client, send, truncate_chars};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for providers exposing the OpenAI chat-completions API.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    settings: ClientSettings,
}

impl OpenAiCompatibleClient {
    pub fn new(settings: ClientSettings) -> Result<Self, GenerateError> {
        let http = build_client(&settings)?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    /// Send a prompt and return the generated text.
    pub async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = self.endpoint();
        debug!(%url, model = %self.settings.model, prompt_chars = prompt.len(), "Sending chat completion request");

        let body = ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .http
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&body);

        let raw = send(&self.settings, request).await?;
        parse_response(self.settings.provider.display_name(), &raw)
    }
}

#[async_trait]
impl MessageGenerator for OpenAiCompatibleClient {
    async fn generate(&self, change_set: &str) -> Result<String, GenerateError> {
        self.complete(&build_commit_prompt(change_set)).await
    }
}

fn parse_response(provider: &'static str, raw: &str) -> Result<String, GenerateError> {
    let response: ChatResponse =
        serde_json::from_str(raw).map_err(|e| GenerateError::InvalidResponse {
            provider,
            reason: format!("{}. Body: {}", e, truncate_chars(raw, 200)),
        })?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .ok_or_else(|| GenerateError::InvalidResponse {
            provider,
            reason: "no choices in response".to_string(),
        })?
        .content
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(GenerateError::EmptyResponse { provider });
    }

    Ok(content.trim().to_string())
}
