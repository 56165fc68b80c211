//! Text-generation providers behind the [`MessageGenerator`] trait.

pub mod gemini;
pub mod http;
pub mod openai;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{ConfigError, GenerateError};

pub use gemini::GeminiClient;
pub use openai::OpenAiCompatibleClient;

/// Supported text-generation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
    Groq,
    Mistral,
    Sambanova,
    Openrouter,
}

/// Wire protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFamily {
    /// Google `generateContent`.
    Gemini,
    /// `/chat/completions` with bearer auth.
    OpenAiCompatible,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Gemini,
        Provider::Groq,
        Provider::Mistral,
        Provider::Sambanova,
        Provider::Openrouter,
    ];

    /// Config/CLI name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Groq => "groq",
            Provider::Mistral => "mistral",
            Provider::Sambanova => "sambanova",
            Provider::Openrouter => "openrouter",
        }
    }

    /// Human-readable name used in messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Groq => "Groq",
            Provider::Mistral => "Mistral",
            Provider::Sambanova => "SambaNova",
            Provider::Openrouter => "OpenRouter",
        }
    }

    /// Provider-specific environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Groq => "GROQ_API_KEY",
            Provider::Mistral => "MISTRAL_API_KEY",
            Provider::Sambanova => "SAMBANOVA_API_KEY",
            Provider::Openrouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn family(&self) -> ApiFamily {
        match self {
            Provider::Gemini => ApiFamily::Gemini,
            _ => ApiFamily::OpenAiCompatible,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::Mistral => "https://api.mistral.ai/v1",
            Provider::Sambanova => "https://api.sambanova.ai/v1",
            Provider::Openrouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-flash-lite-latest",
            Provider::Groq => "llama-3.3-70b-versatile",
            Provider::Mistral => "mistral-small-latest",
            Provider::Sambanova => "Meta-Llama-3.3-70B-Instruct",
            Provider::Openrouter => "openrouter/auto",
        }
    }

    /// Comma-separated list of valid names, for error messages.
    pub fn valid_names() -> String {
        Provider::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownProvider {
                name: s.to_string(),
                valid: Provider::valid_names(),
            })
    }
}

/// Turns ChangeSet text into a raw commit message.
///
/// This abstraction allows substituting the remote service in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    /// Generate a raw commit message for the given diff text.
    async fn generate(&self, change_set: &str) -> Result<String, GenerateError>;
}

/// Build the generator for the configured provider.
///
/// Fails with [`GenerateError::MissingCredential`] before any client is
/// created when no API key is configured.
pub fn build_generator(config: &Config) -> Result<Box<dyn MessageGenerator>, GenerateError> {
    let settings = client_settings(config)?;

    let generator: Box<dyn MessageGenerator> = match config.provider.family() {
        ApiFamily::Gemini => Box::new(GeminiClient::new(settings)?),
        ApiFamily::OpenAiCompatible => Box::new(OpenAiCompatibleClient::new(settings)?),
    };
    Ok(generator)
}

/// Send a trivial prompt to the configured provider to verify connectivity and credentials.
pub async fn check_connection(config: &Config) -> Result<String, GenerateError> {
    const PING_PROMPT: &str = "Hello, respond with 'API connection successful'";

    let settings = client_settings(config)?;
    match config.provider.family() {
        ApiFamily::Gemini => GeminiClient::new(settings)?.complete(PING_PROMPT).await,
        ApiFamily::OpenAiCompatible => {
            OpenAiCompatibleClient::new(settings)?
                .complete(PING_PROMPT)
                .await
        }
    }
}

fn client_settings(config: &Config) -> Result<http::ClientSettings, GenerateError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or(GenerateError::MissingCredential {
            provider: config.provider.display_name(),
            env_var: config.provider.api_key_env(),
        })?;

    Ok(http::ClientSettings {
        provider: config.provider,
        api_key,
        model: config.model(),
        base_url: config.base_url(),
        timeout: config.timeout,
    })
}
