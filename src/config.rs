//! Provider configuration: loading, layering, and in-place editing.
//!
//! Priority (highest to lowest):
//! 1. Environment variables
//! 2. `.fdev.toml` in the repository root
//! 3. `<config dir>/fdev/config.toml`
//! 4. Built-in defaults

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use toml_edit::{DocumentMut, Item, table, value};
use tracing::{debug, warn};

use crate::atomic_write::write_atomic;
use crate::error::ConfigError;
use crate::llm::Provider;

/// Project-local config file name, looked up at the repository root.
pub const PROJECT_CONFIG_FILE: &str = ".fdev.toml";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const PROVIDER_ENV_VAR: &str = "FDEV_PROVIDER";
pub const API_KEY_ENV_VAR: &str = "FDEV_API_KEY";
pub const MODEL_ENV_VAR: &str = "FDEV_MODEL";
pub const TIMEOUT_ENV_VAR: &str = "FDEV_TIMEOUT";

/// Resolved configuration for one invocation.
#[derive(Clone)]
pub struct Config {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Values read from a single config file. Every key is optional.
#[derive(Debug, Default)]
struct FileLayer {
    provider: Option<Provider>,
    api_key: Option<String>,
    api_keys: HashMap<Provider, String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl FileLayer {
    /// Whether this file's top-level `api_key`, `model` and `base_url` may be
    /// used for `provider`. They belong to the provider the file names.
    fn applies_to(&self, provider: Provider) -> bool {
        self.provider.is_none_or(|p| p == provider)
    }

    /// The `[api_keys]` entry for `provider` wins over the top-level `api_key`.
    fn key_for(&self, provider: Provider) -> Option<String> {
        self.api_keys.get(&provider).cloned().or_else(|| {
            self.applies_to(provider)
                .then(|| self.api_key.clone())
                .flatten()
        })
    }

    fn model_for(&self, provider: Provider) -> Option<String> {
        self.applies_to(provider).then(|| self.model.clone()).flatten()
    }

    fn base_url_for(&self, provider: Provider) -> Option<String> {
        self.applies_to(provider)
            .then(|| self.base_url.clone())
            .flatten()
    }
}

impl Config {
    /// Built-in defaults for a provider, with no credential.
    pub fn defaults(provider: Provider) -> Self {
        Self {
            provider,
            api_key: None,
            model: None,
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Model name, falling back to the provider default.
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// API base URL, falling back to the provider default.
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    /// Load configuration for a repository rooted at `project_root`.
    ///
    /// A missing user config directory is not an error; that layer is skipped.
    pub fn load(project_root: Option<&Path>) -> Result<Self, ConfigError> {
        let user_file = match user_config_path() {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Skipping user config: {}", e);
                None
            }
        };
        let project_file = project_root.map(|root| root.join(PROJECT_CONFIG_FILE));
        Self::load_from(user_file.as_deref(), project_file.as_deref())
    }

    /// Load configuration from explicit file locations plus the environment.
    ///
    /// Files that do not exist are treated as empty.
    pub fn load_from(
        user_file: Option<&Path>,
        project_file: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let user = match user_file {
            Some(path) => read_layer(path)?,
            None => FileLayer::default(),
        };
        let project = match project_file {
            Some(path) => read_layer(path)?,
            None => FileLayer::default(),
        };

        let provider = match env_value(PROVIDER_ENV_VAR) {
            Some(name) => name.parse::<Provider>()?,
            None => project
                .provider
                .or(user.provider)
                .unwrap_or(Provider::Gemini),
        };

        let api_key = env_value(API_KEY_ENV_VAR)
            .or_else(|| env_value(provider.api_key_env()))
            .or_else(|| project.key_for(provider))
            .or_else(|| user.key_for(provider));

        let model = env_value(MODEL_ENV_VAR)
            .or_else(|| project.model_for(provider))
            .or_else(|| user.model_for(provider));

        let base_url = project
            .base_url_for(provider)
            .or_else(|| user.base_url_for(provider));

        let file_timeout = project
            .timeout_secs
            .or(user.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let timeout = timeout_from_env(file_timeout);

        let config = Self {
            provider,
            api_key,
            model,
            base_url,
            timeout,
        };
        debug!(?config, "Loaded configuration");
        Ok(config)
    }
}

/// Location of the per-user config file.
pub fn user_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("fdev").join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Top-level keys that only make sense for the provider they were written for.
const PROVIDER_BOUND_KEYS: [&str; 3] = ["api_key", "model", "base_url"];

/// Persist `provider = "<name>"` into the config file at `path`.
///
/// Comments and unrelated keys are preserved. The file and its parent
/// directory are created when missing. When the provider changes, the
/// top-level `model` and `base_url` are removed and a top-level `api_key`
/// moves to `[api_keys].<previous provider>`. Returns the top-level keys
/// that were cleared.
pub fn set_provider(path: &Path, provider: Provider) -> Result<Vec<&'static str>, ConfigError> {
    let mut doc = if path.exists() {
        let content = read_file(path)?;
        parse_document(path, &content)?
    } else {
        DocumentMut::new()
    };

    let previous = match doc.get("provider").and_then(Item::as_str) {
        Some(name) => name.parse::<Provider>().ok(),
        None => Some(Provider::Gemini),
    };

    let mut cleared = Vec::new();
    if previous != Some(provider) {
        for key in PROVIDER_BOUND_KEYS {
            let Some(item) = doc.remove(key) else {
                continue;
            };
            cleared.push(key);
            match previous {
                Some(previous) if key == "api_key" => rebind_api_key(&mut doc, previous, item),
                _ => {}
            }
        }
    }

    doc["provider"] = value(provider.as_str());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
    }

    write_atomic(path, &doc.to_string()).map_err(|source| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), provider = %provider, ?cleared, "Updated provider in config file");
    Ok(cleared)
}

/// Keep a top-level key as `[api_keys].<provider>` unless that entry already exists.
fn rebind_api_key(doc: &mut DocumentMut, provider: Provider, key: Item) {
    if !doc.contains_key("api_keys") {
        doc["api_keys"] = table();
    }
    let Some(api_keys) = doc["api_keys"].as_table_like_mut() else {
        warn!("`api_keys` is not a table; dropping the top-level api_key");
        return;
    };
    if api_keys.contains_key(provider.as_str()) {
        debug!(provider = %provider, "Top-level api_key shadowed by [api_keys] entry; dropping it");
        return;
    }
    api_keys.insert(provider.as_str(), key);
}

/// Read an environment variable, treating unset and empty the same.
fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn timeout_from_env(fallback_secs: u64) -> Duration {
    match env_value(TIMEOUT_ENV_VAR) {
        Some(v) => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(
                    "Invalid {} value '{}', using {}s",
                    TIMEOUT_ENV_VAR, v, fallback_secs
                );
                Duration::from_secs(fallback_secs)
            }
        },
        None => Duration::from_secs(fallback_secs),
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_document(path: &Path, content: &str) -> Result<DocumentMut, ConfigError> {
    content
        .parse::<DocumentMut>()
        .map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
}

fn read_layer(path: &Path) -> Result<FileLayer, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file not present");
        return Ok(FileLayer::default());
    }

    let content = read_file(path)?;
    let doc = parse_document(path, &content)?;

    let provider = match string_key(&doc, path, "provider")? {
        Some(name) => Some(name.parse::<Provider>()?),
        None => None,
    };

    let timeout_secs = match doc.get("timeout_secs") {
        None => None,
        Some(item) => {
            let secs = item
                .as_integer()
                .and_then(|n| u64::try_from(n).ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    path: path.to_path_buf(),
                    key: "timeout_secs",
                    expected: "a positive integer",
                })?;
            Some(secs)
        }
    };

    let mut api_keys = HashMap::new();
    if let Some(table) = doc.get("api_keys").and_then(Item::as_table_like) {
        for (name, item) in table.iter() {
            let Ok(provider) = name.parse::<Provider>() else {
                warn!(path = %path.display(), "Ignoring api_keys entry for unknown provider '{}'", name);
                continue;
            };
            let key = item
                .as_str()
                .ok_or_else(|| ConfigError::InvalidValue {
                    path: path.to_path_buf(),
                    key: "api_keys",
                    expected: "string values",
                })?
                .trim();
            if !key.is_empty() {
                api_keys.insert(provider, key.to_string());
            }
        }
    }

    Ok(FileLayer {
        provider,
        api_key: string_key(&doc, path, "api_key")?,
        api_keys,
        model: string_key(&doc, path, "model")?,
        base_url: string_key(&doc, path, "base_url")?,
        timeout_secs,
    })
}

/// Read an optional top-level string key. Empty strings are treated as absent.
fn string_key(
    doc: &DocumentMut,
    path: &Path,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match doc.get(key) {
        None => Ok(None),
        Some(item) => {
            let s = item.as_str().ok_or_else(|| ConfigError::InvalidValue {
                path: path.to_path_buf(),
                key,
                expected: "a string",
            })?;
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
    }
}
