//! Shared HTTP plumbing for provider clients.

use std::fmt;
use std::time::Duration;

use reqwest::RequestBuilder;
use tracing::debug;

use crate::error::GenerateError;
use crate::llm::Provider;

/// Maximum characters of an error response body kept in error messages.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Everything a provider client needs to make a request.
#[derive(Clone)]
pub struct ClientSettings {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Build a `reqwest` client with the configured request timeout.
pub(crate) fn build_client(settings: &ClientSettings) -> Result<reqwest::Client, GenerateError> {
    reqwest::Client::builder()
        .timeout(settings.timeout)
        .user_agent(concat!("fdev/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| GenerateError::Request {
            provider: settings.provider.display_name(),
            source,
        })
}

/// Send a request and return the body of a successful response.
///
/// Timeouts map to [`GenerateError::Timeout`], other transport failures to
/// [`GenerateError::Request`], and non-2xx statuses to [`GenerateError::HttpStatus`].
pub(crate) async fn send(
    settings: &ClientSettings,
    request: RequestBuilder,
) -> Result<String, GenerateError> {
    let provider = settings.provider.display_name();

    let response = request
        .send()
        .await
        .map_err(|e| transport_error(settings, e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(settings, e))?;

    debug!(provider, status = status.as_u16(), bytes = body.len(), "Provider responded");

    if !status.is_success() {
        return Err(GenerateError::HttpStatus {
            provider,
            status: status.as_u16(),
            body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
        });
    }

    Ok(body)
}

fn transport_error(settings: &ClientSettings, err: reqwest::Error) -> GenerateError {
    let provider = settings.provider.display_name();
    if err.is_timeout() {
        GenerateError::Timeout {
            provider,
            secs: settings.timeout.as_secs(),
        }
    } else {
        GenerateError::Request {
            provider,
            source: err,
        }
    }
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let settings = ClientSettings {
            provider: Provider::Groq,
            api_key: "gsk_secret".into(),
            model: "m".into(),
            base_url: "http://localhost".into(),
            timeout: Duration::from_secs(5),
        };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé...");
    }
}
