//! Error types for fdev modules using thiserror.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from git operations that are not part of the commit flow.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to enumerate tags: {0}")]
    TagEnumeration(#[source] git2::Error),

    #[error("Repository has no working directory (bare repositories are not supported)")]
    BareRepository,
}

/// Errors from text-generation providers.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(
        "No API key configured for {provider}. Set {env_var} (or FDEV_API_KEY), or add `api_key` to the fdev config file"
    )]
    MissingCredential {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("{provider} request timed out after {secs} seconds")]
    Timeout { provider: &'static str, secs: u64 },

    #[error("{provider} request failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    HttpStatus {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unexpected response: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: &'static str },
}

/// Errors from configuration loading and editing.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },

    #[error("Failed to write config file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for `{key}` in {path}: expected {expected}")]
    InvalidValue {
        path: PathBuf,
        key: &'static str,
        expected: &'static str,
    },

    #[error("Unknown provider '{name}'. Valid options: {valid}")]
    UnknownProvider { name: String, valid: String },

    #[error("Could not determine the user config directory")]
    NoConfigDir,
}

/// The six outcome kinds of the commit flow, independent of the underlying cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoChanges,
    MissingCredential,
    NetworkError,
    MalformedResponse,
    UserAborted,
    VcsError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoChanges => "NoChanges",
            ErrorKind::MissingCredential => "MissingCredential",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::MalformedResponse => "MalformedResponse",
            ErrorKind::UserAborted => "UserAborted",
            ErrorKind::VcsError => "VcsError",
        };
        f.write_str(name)
    }
}

/// Errors from commit message generation operations.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("No changes to commit (working tree is clean)")]
    NoChanges,

    #[error(
        "No API key configured for {provider}. Set {env_var} (or FDEV_API_KEY), or add `api_key` to the fdev config file"
    )]
    MissingCredential {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("Text generation failed: {0}")]
    Network(#[source] GenerateError),

    #[error("Could not build a commit message from the response: {0}")]
    MalformedResponse(String),

    #[error("Commit cancelled")]
    UserAborted,

    #[error("Failed to collect diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to stage changes: {0}")]
    StagingFailed(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    ConfigError(#[source] git2::Error),
}

impl CommitError {
    /// Classify this error into one of the commit-flow outcome kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommitError::NoChanges => ErrorKind::NoChanges,
            CommitError::MissingCredential { .. } => ErrorKind::MissingCredential,
            CommitError::Network(_) => ErrorKind::NetworkError,
            CommitError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            CommitError::UserAborted => ErrorKind::UserAborted,
            CommitError::DiffFailed(_)
            | CommitError::StagingFailed(_)
            | CommitError::CommitFailed(_)
            | CommitError::ConfigError(_) => ErrorKind::VcsError,
        }
    }

    /// Whether this outcome is informational rather than a failure.
    pub fn is_informational(&self) -> bool {
        self.kind() == ErrorKind::NoChanges
    }
}

impl From<GenerateError> for CommitError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::MissingCredential { provider, env_var } => {
                CommitError::MissingCredential { provider, env_var }
            }
            GenerateError::InvalidResponse { .. } | GenerateError::EmptyResponse { .. } => {
                CommitError::MalformedResponse(err.to_string())
            }
            GenerateError::Timeout { .. }
            | GenerateError::Request { .. }
            | GenerateError::HttpStatus { .. } => CommitError::Network(err),
        }
    }
}

/// Errors from the release tagging pipeline.
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("pubspec.yaml not found at {0}. Run fdev from the root of a Flutter project.")]
    PubspecNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    PubspecRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    PubspecWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not find a valid `version:` field in {0}")]
    NoVersionInPubspec(PathBuf),

    #[error("Tag {0} already exists")]
    TagAlreadyExists(String),

    #[error("git executable not found on PATH")]
    GitNotInstalled,

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("Failed to stage {path}: {source}")]
    StagingFailed {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Failed to create tag {name}: {source}")]
    TagFailed {
        name: String,
        #[source]
        source: git2::Error,
    },

    #[error("{0}")]
    PushFailed(String),

    #[error("Could not read remote tags: {0}")]
    RemoteTagsUnavailable(String),

    #[error("Release cancelled")]
    Cancelled,
}

/// Errors from discarding uncommitted changes.
#[derive(Error, Debug)]
pub enum DiscardError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error("Failed to read repository status: {0}")]
    Status(#[source] git2::Error),

    #[error("Cannot reset: the repository has no commits yet")]
    UnbornHead,

    #[error("Failed to reset to HEAD: {0}")]
    ResetFailed(#[source] git2::Error),

    #[error("Failed to remove {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Discard cancelled")]
    Cancelled,
}
