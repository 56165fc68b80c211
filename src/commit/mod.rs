//! AI-generated commit messages: diff collection, generation, confirmation.

pub mod confirm;
pub mod diff;
pub mod message;
pub mod prompt;
pub mod workflow;

pub use confirm::{Confirmer, DialoguerConfirmer};
pub use diff::{ChangeSet, ChangedFile, FileStatus, collect_change_set};
pub use message::{CommitMessage, commit_staged};
pub use prompt::build_commit_prompt;
pub use workflow::{CommitOptions, CommitOutcome, commit_with_config, run_commit, synthesize};
