//! Throwing away uncommitted work: reset tracked files to HEAD and delete untracked ones.

use std::path::{Path, PathBuf};

use git2::{Repository, ResetType, Status, StatusOptions};
use tracing::{debug, warn};

use crate::commit::Confirmer;
use crate::error::{DiscardError, GitError};

/// How many paths of each kind are listed before summarising the rest.
const MAX_LISTED_PATHS: usize = 10;

/// Flags for the `discard` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardOptions {
    /// Leave untracked files in place.
    pub keep_untracked: bool,
}

/// Uncommitted changes, split by how they are discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    /// Modified, deleted, renamed or staged paths. Reset to HEAD.
    pub tracked: Vec<String>,
    /// Paths git does not know about. Deleted unless kept. Ignored files are never listed.
    pub untracked: Vec<String>,
}

/// What a discard run ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardOutcome {
    NothingToDiscard,
    Discarded { reset: usize, removed: usize },
}

/// Collect the uncommitted changes in the working tree and index.
pub fn pending_changes(repo: &Repository) -> Result<PendingChanges, DiscardError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    let statuses = repo.statuses(Some(&mut opts)).map_err(DiscardError::Status)?;

    let mut pending = PendingChanges::default();
    for entry in statuses.iter() {
        let status = entry.status();
        if status.is_empty() || status.is_ignored() {
            continue;
        }
        let Some(path) = entry.path() else {
            warn!("Skipping path that is not valid UTF-8");
            continue;
        };
        if status == Status::WT_NEW {
            pending.untracked.push(path.to_string());
        } else {
            pending.tracked.push(path.to_string());
        }
    }

    pending.tracked.sort();
    pending.untracked.sort();
    Ok(pending)
}

/// Discard uncommitted changes after confirmation.
///
/// Tracked changes are reset to HEAD (index and working tree). Untracked files
/// are deleted unless `keep_untracked` is set, along with directories left empty.
pub fn run_discard(
    repo: &Repository,
    confirmer: &dyn Confirmer,
    options: DiscardOptions,
) -> Result<DiscardOutcome, DiscardError> {
    let workdir = repo.workdir().ok_or(GitError::BareRepository)?;

    let mut pending = pending_changes(repo)?;
    if options.keep_untracked {
        pending.untracked.clear();
    }
    if pending.tracked.is_empty() && pending.untracked.is_empty() {
        println!("No uncommitted changes to discard");
        return Ok(DiscardOutcome::NothingToDiscard);
    }

    print_paths("Modified/staged files to reset", &pending.tracked);
    print_paths("Untracked files to delete", &pending.untracked);

    if !confirmer.confirm("Discard these changes? This cannot be undone.") {
        return Err(DiscardError::Cancelled);
    }

    if !pending.tracked.is_empty() {
        reset_to_head(repo)?;
        // Newly staged files are not in HEAD; reset may leave them behind as untracked.
        for path in pending_changes(repo)?.untracked {
            if pending.tracked.contains(&path) {
                remove_untracked(workdir, &path)?;
            }
        }
        println!("  [DONE] Reset {} tracked file(s)", pending.tracked.len());
    }

    for path in &pending.untracked {
        remove_untracked(workdir, path)?;
    }
    if !pending.untracked.is_empty() {
        println!("  [DONE] Removed {} untracked file(s)", pending.untracked.len());
    }

    Ok(DiscardOutcome::Discarded {
        reset: pending.tracked.len(),
        removed: pending.untracked.len(),
    })
}

fn reset_to_head(repo: &Repository) -> Result<(), DiscardError> {
    let head = match repo.head() {
        Ok(head) => head.peel_to_commit().map_err(DiscardError::ResetFailed)?,
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
            return Err(DiscardError::UnbornHead);
        }
        Err(e) => return Err(DiscardError::ResetFailed(e)),
    };
    repo.reset(head.as_object(), ResetType::Hard, None)
        .map_err(DiscardError::ResetFailed)?;
    debug!(head = %head.id(), "Reset index and working tree");
    Ok(())
}

/// Delete one untracked file, then any parent directories it leaves empty.
fn remove_untracked(workdir: &Path, relative: &str) -> Result<(), DiscardError> {
    let path = workdir.join(relative);
    std::fs::remove_file(&path).map_err(|source| DiscardError::RemoveFailed {
        path: PathBuf::from(relative),
        source,
    })?;
    debug!(path = relative, "Removed untracked file");

    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == workdir || std::fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
    Ok(())
}

fn print_paths(title: &str, paths: &[String]) {
    if paths.is_empty() {
        return;
    }
    println!("{} ({}):", title, paths.len());
    for path in paths.iter().take(MAX_LISTED_PATHS) {
        println!("  ✗ {}", path);
    }
    if paths.len() > MAX_LISTED_PATHS {
        println!("  ... and {} more", paths.len() - MAX_LISTED_PATHS);
    }
    println!();
}
