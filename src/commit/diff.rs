//! ChangeSet collection and auto-staging using git2.

use std::fmt;

use git2::{Delta, Diff, DiffFormat, DiffOptions, ErrorCode, IndexAddOption, Repository, Tree};
use tracing::{debug, warn};

use crate::error::CommitError;

/// Maximum bytes of unified diff text kept in a [`ChangeSet`].
pub const MAX_DIFF_LENGTH: usize = 30_000;

/// Status of a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "Added"),
            FileStatus::Modified => write!(f, "Modified"),
            FileStatus::Deleted => write!(f, "Deleted"),
            FileStatus::Renamed => write!(f, "Renamed"),
        }
    }
}

/// A file that will be part of the commit.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
    /// Old path for renamed files.
    pub old_path: Option<String>,
}

/// The staged changes that the next commit will record.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Unified diff of HEAD (or the empty tree) against the index.
    pub text: String,
    pub changed_files: Vec<ChangedFile>,
    /// Paths this invocation added to the index.
    pub newly_staged: Vec<String>,
    pub truncated: bool,
    pub additions: usize,
    pub deletions: usize,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed_files.is_empty() && self.text.trim().is_empty()
    }
}

/// Resolve the HEAD tree, distinguishing an unborn branch from real failures.
///
/// Returns `Ok(None)` for repos with no commits.
pub(crate) fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, CommitError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(CommitError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(CommitError::DiffFailed)?;
    Ok(Some(tree))
}

/// Collect the ChangeSet for the next commit, staging working-tree changes first when needed.
///
/// With `stage_all == false`, working-tree changes (modifications, deletions,
/// untracked files) are staged only when the index holds nothing staged yet;
/// otherwise the existing staged set is used as is. With `stage_all == true`
/// everything is staged first. Staging an already-staged tree is a no-op.
///
/// Returns [`CommitError::NoChanges`] when nothing ends up staged.
pub fn collect_change_set(repo: &Repository, stage_all: bool) -> Result<ChangeSet, CommitError> {
    let head_tree = resolve_head_tree(repo)?;
    let mut index = repo.index().map_err(CommitError::StagingFailed)?;

    let already_staged = {
        let staged = repo
            .diff_tree_to_index(head_tree.as_ref(), Some(&index), None)
            .map_err(CommitError::DiffFailed)?;
        staged.deltas().len()
    };

    let mut newly_staged = Vec::new();
    if stage_all || already_staged == 0 {
        let pending = {
            let mut opts = DiffOptions::new();
            opts.include_untracked(true).recurse_untracked_dirs(true);
            let unstaged = repo
                .diff_index_to_workdir(Some(&index), Some(&mut opts))
                .map_err(CommitError::DiffFailed)?;
            let mut files = Vec::new();
            collect_files_from_diff(&unstaged, &mut files);
            files
        };

        if !pending.is_empty() {
            debug!(
                count = pending.len(),
                stage_all, "Staging working tree changes"
            );
            index
                .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
                .map_err(CommitError::StagingFailed)?;
            // add_all does not drop entries whose files are gone
            index
                .update_all(["*"].iter(), None)
                .map_err(CommitError::StagingFailed)?;
            index.write().map_err(CommitError::StagingFailed)?;

            newly_staged = pending.into_iter().map(|f| f.path).collect();
            newly_staged.sort();
            newly_staged.dedup();
        }
    } else {
        debug!(
            staged = already_staged,
            "Index already has staged changes; committing those only"
        );
    }

    let staged = repo
        .diff_tree_to_index(head_tree.as_ref(), Some(&index), None)
        .map_err(CommitError::DiffFailed)?;

    let mut change_set = build_change_set(&staged)?;
    change_set.newly_staged = newly_staged;
    Ok(change_set)
}

/// Turn a staged diff into a [`ChangeSet`].
fn build_change_set(staged: &Diff<'_>) -> Result<ChangeSet, CommitError> {
    let mut changed_files = Vec::new();
    collect_files_from_diff(staged, &mut changed_files);

    changed_files.sort_by(|a, b| a.path.cmp(&b.path));
    changed_files.dedup_by(|a, b| a.path == b.path);

    if changed_files.is_empty() {
        return Err(CommitError::NoChanges);
    }

    let mut change_set = ChangeSet {
        changed_files,
        ..ChangeSet::default()
    };
    append_diff_text(staged, &mut change_set);

    debug!(
        files = change_set.changed_files.len(),
        additions = change_set.additions,
        deletions = change_set.deletions,
        truncated = change_set.truncated,
        "Collected change set"
    );

    Ok(change_set)
}

fn collect_files_from_diff(diff: &Diff<'_>, files: &mut Vec<ChangedFile>) {
    for delta in diff.deltas() {
        let status = match delta.status() {
            Delta::Added | Delta::Untracked => FileStatus::Added,
            Delta::Deleted => FileStatus::Deleted,
            Delta::Renamed => FileStatus::Renamed,
            _ => FileStatus::Modified,
        };

        let new_path = delta
            .new_file()
            .path()
            .map(|p| p.to_string_lossy().to_string());
        let old_path = delta
            .old_file()
            .path()
            .map(|p| p.to_string_lossy().to_string());

        let (path, old_path) = match status {
            FileStatus::Renamed => (new_path.clone().or_else(|| old_path.clone()).unwrap_or_default(), old_path),
            _ => (new_path.or(old_path).unwrap_or_default(), None),
        };

        if !path.is_empty() {
            files.push(ChangedFile {
                path,
                status,
                old_path,
            });
        }
    }
}

/// Append unified diff text, stopping at [`MAX_DIFF_LENGTH`].
fn append_diff_text(diff: &Diff<'_>, change_set: &mut ChangeSet) {
    let result = diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        match origin {
            '+' => change_set.additions += 1,
            '-' => change_set.deletions += 1,
            _ => {}
        }

        if change_set.truncated {
            return true;
        }

        let content = String::from_utf8_lossy(line.content());
        if change_set.text.len() + content.len() + 1 > MAX_DIFF_LENGTH {
            change_set.truncated = true;
            return true;
        }

        if matches!(origin, '+' | '-' | ' ') {
            change_set.text.push(origin);
        }
        change_set.text.push_str(&content);
        true
    });

    if let Err(e) = result {
        warn!("Failed to collect diff text: {e}");
        change_set.truncated = true;
    }
}
