//! fdev - developer conveniences for Flutter projects.
//!
//! # Overview
//!
//! The core is AI-assisted committing: collect the pending changes, ask a
//! text-generation provider for a Conventional Commit message, show it, and
//! commit only after explicit confirmation. Release tagging bumps the
//! `pubspec.yaml` version, commits, tags and pushes. Discarding resets
//! uncommitted work back to HEAD.

mod atomic_write;

pub mod commit;
pub mod config;
pub mod discard;
pub mod error;
pub mod git;
pub mod llm;
pub mod release;

// Re-export commonly used types
pub use commit::{ChangeSet, CommitMessage, Confirmer, DialoguerConfirmer};
pub use config::Config;
pub use error::{
    CommitError, ConfigError, DiscardError, ErrorKind, GenerateError, GitError, ReleaseError,
};
pub use git::CommitType;
pub use llm::{MessageGenerator, Provider};
