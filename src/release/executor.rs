//! Git operations for release tagging: stage, commit, tag, push.
//!
//! Staging, committing and tagging go through git2. Talking to the remote
//! (`ls-remote`, `push`) shells out to the system `git` binary so the user's
//! credential helpers and SSH agent apply.

use std::path::Path;
use std::process::Command;

use git2::{Oid, Repository};
use tracing::debug;

use crate::error::ReleaseError;
use crate::git::{TagInfo, parse_ls_remote_tags};

/// Stage a single file given relative to the repository workdir.
pub fn stage_file(repo: &Repository, relative: &Path) -> Result<(), ReleaseError> {
    let display = relative.display().to_string();
    let mut index = repo.index().map_err(|source| ReleaseError::StagingFailed {
        path: display.clone(),
        source,
    })?;
    index
        .add_path(relative)
        .and_then(|()| index.write())
        .map_err(|source| ReleaseError::StagingFailed {
            path: display,
            source,
        })?;
    Ok(())
}

/// Commit the index on HEAD with the given message.
pub fn commit_index(repo: &Repository, message: &str) -> Result<Oid, ReleaseError> {
    let mut index = repo.index().map_err(ReleaseError::CommitFailed)?;
    let tree_id = index.write_tree().map_err(ReleaseError::CommitFailed)?;
    let tree = repo.find_tree(tree_id).map_err(ReleaseError::CommitFailed)?;
    let sig = repo.signature().map_err(ReleaseError::CommitFailed)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().map_err(ReleaseError::CommitFailed)?),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
        Err(e) => return Err(ReleaseError::CommitFailed(e)),
    };
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(ReleaseError::CommitFailed)?;
    debug!(%oid, message, "Created release commit");
    Ok(oid)
}

/// Create a lightweight tag pointing at `target`.
pub fn create_tag(repo: &Repository, name: &str, target: Oid) -> Result<(), ReleaseError> {
    let tag_err = |source| ReleaseError::TagFailed {
        name: name.to_string(),
        source,
    };
    let object = repo.find_object(target, None).map_err(tag_err)?;
    repo.tag_lightweight(name, &object, false).map_err(tag_err)?;
    debug!(tag = name, %target, "Created tag");
    Ok(())
}

/// Verify the `git` executable is available for pushing.
pub fn check_git_installed() -> Result<(), ReleaseError> {
    which::which("git").map_err(|_| ReleaseError::GitNotInstalled)?;
    Ok(())
}

/// Push the current branch, then the tag.
///
/// Runs `git push` followed by `git push -u origin <tag>` in `workdir`.
pub fn push_commit_and_tag(workdir: &Path, tag_name: &str) -> Result<(), ReleaseError> {
    run_git(workdir, &["push"], "push commit")?;
    run_git(workdir, &["push", "-u", "origin", tag_name], "push tag")?;
    Ok(())
}

/// List the tags on `remote` with `git ls-remote --tags`.
///
/// Interactive credential prompts are disabled; a remote that needs them fails instead.
pub fn list_remote_tags(workdir: &Path, remote: &str) -> Result<Vec<TagInfo>, ReleaseError> {
    let stdout = git_output(workdir, &["ls-remote", "--tags", remote], "ls-remote")
        .map_err(ReleaseError::RemoteTagsUnavailable)?;
    let tags = parse_ls_remote_tags(&stdout);
    debug!(remote, count = tags.len(), "Read remote tags");
    Ok(tags)
}

/// Run a git command and return a descriptive error with git's stderr on failure.
fn run_git(workdir: &Path, args: &[&str], operation: &str) -> Result<(), ReleaseError> {
    git_output(workdir, args, operation).map_err(ReleaseError::PushFailed)?;
    Ok(())
}

/// Run git and capture stdout. The error string carries git's stderr.
fn git_output(workdir: &Path, args: &[&str], operation: &str) -> Result<String, String> {
    debug!(?args, "Running git");
    let output = Command::new("git")
        .args(args)
        .current_dir(workdir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|e| format!("Failed to run git {}: {}", operation, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("git {} failed: {}", operation, stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
