//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commit::prompt::build_commit_prompt;
use crate::error::GenerateError;
use crate::llm::MessageGenerator;
use crate::llm::http::{ClientSettings, build_client, send, truncate_chars};

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Client for the Gemini REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    settings: ClientSettings,
}

impl GeminiClient {
    pub fn new(settings: ClientSettings) -> Result<Self, GenerateError> {
        let http = build_client(&settings)?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    /// Send a prompt and return the generated text.
    pub async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = self.endpoint();
        debug!(%url, prompt_chars = prompt.len(), "Sending Gemini request");

        let body = GenerateContentRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let request = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body);

        let raw = send(&self.settings, request).await?;
        parse_response(&raw)
    }
}

#[async_trait]
impl MessageGenerator for GeminiClient {
    async fn generate(&self, change_set: &str) -> Result<String, GenerateError> {
        self.complete(&build_commit_prompt(change_set)).await
    }
}

/// Extract the generated text from a `generateContent` response body.
fn parse_response(raw: &str) -> Result<String, GenerateError> {
    const PROVIDER: &str = "Gemini";

    let response: GenerateContentResponse =
        serde_json::from_str(raw).map_err(|e| GenerateError::InvalidResponse {
            provider: PROVIDER,
            reason: format!("{}. Body: {}", e, truncate_chars(raw, 200)),
        })?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerateError::InvalidResponse {
            provider: PROVIDER,
            reason: "no candidates in response".to_string(),
        })?;

    let content = candidate
        .content
        .ok_or_else(|| GenerateError::InvalidResponse {
            provider: PROVIDER,
            reason: "candidate has no content".to_string(),
        })?;

    let text: String = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(GenerateError::EmptyResponse { provider: PROVIDER });
    }

    Ok(text.trim().to_string())
}
