//! Parsing raw generated text into a [`CommitMessage`] and committing it.

use git2::{Oid, Repository};
use tracing::debug;

use crate::error::CommitError;
use crate::git::{CommitType, parse_header};

/// Markers that already make a detail line a bullet.
const BULLET_MARKERS: [char; 3] = ['-', '*', '•'];

/// A commit message built from a generated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub emoji: Option<String>,
    /// `None` when the header line does not follow the conventional grammar.
    pub commit_type: Option<CommitType>,
    pub scope: Option<String>,
    pub breaking: bool,
    /// Never empty. For conventional headers this is the text after the colon,
    /// otherwise the whole header line.
    pub summary: String,
    /// Detail lines without bullet markers, in response order.
    pub details: Vec<String>,
}

impl CommitMessage {
    /// Parse a raw generated response.
    ///
    /// The first non-empty line is the header; every following non-empty line
    /// becomes a detail entry with any leading `-`, `*` or `•` marker removed.
    /// Lines consisting of a bare marker are skipped.
    pub fn parse(raw: &str) -> Result<Self, CommitError> {
        let mut lines = raw.lines().map(str::trim).filter(|l| !l.is_empty());

        let header = lines.next().ok_or_else(|| {
            CommitError::MalformedResponse("response contained no text".to_string())
        })?;

        // A line holding only a bullet marker carries no text and is dropped;
        // it is the one non-empty line that does not become a detail.
        let details: Vec<String> = lines
            .map(strip_bullet)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let message = match parse_header(header) {
            Some(h) => Self {
                emoji: h.emoji,
                commit_type: Some(h.commit_type),
                scope: h.scope,
                breaking: h.breaking,
                summary: h.description,
                details,
            },
            None => {
                debug!("Header does not follow the conventional grammar; using it verbatim");
                Self {
                    emoji: None,
                    commit_type: None,
                    scope: None,
                    breaking: false,
                    summary: header.to_string(),
                    details,
                }
            }
        };

        Ok(message)
    }

    /// The header line: `[emoji ]type(scope)[!]: summary`, or the bare summary.
    pub fn subject(&self) -> String {
        let Some(commit_type) = self.commit_type else {
            return self.summary.clone();
        };

        let mut subject = String::new();
        if let Some(emoji) = &self.emoji {
            subject.push_str(emoji);
            subject.push(' ');
        }
        subject.push_str(commit_type.as_str());
        if let Some(scope) = &self.scope {
            subject.push('(');
            subject.push_str(scope);
            subject.push(')');
        }
        if self.breaking {
            subject.push('!');
        }
        subject.push_str(": ");
        subject.push_str(&self.summary);
        subject
    }

    /// Detail lines rendered as `- detail`.
    pub fn bullets(&self) -> Vec<String> {
        self.details.iter().map(|d| format!("- {d}")).collect()
    }

    /// Full commit message text for git.
    pub fn format(&self) -> String {
        let mut out = self.subject();
        if !self.details.is_empty() {
            out.push_str("\n\n");
            out.push_str(&self.bullets().join("\n"));
        }
        out
    }
}

/// Remove a leading bullet marker followed by whitespace.
fn strip_bullet(line: &str) -> &str {
    for marker in BULLET_MARKERS {
        if let Some(rest) = line.strip_prefix(marker) {
            if rest.is_empty() {
                return rest;
            }
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    line
}

/// Commit the current index on HEAD.
///
/// Works on an unborn branch (the commit has no parent). Uses the
/// signature from git config.
pub fn commit_staged(repo: &Repository, message: &str) -> Result<Oid, CommitError> {
    let mut index = repo.index().map_err(CommitError::StagingFailed)?;
    let tree_id = index.write_tree().map_err(CommitError::StagingFailed)?;
    let tree = repo.find_tree(tree_id).map_err(CommitError::CommitFailed)?;

    let sig = repo.signature().map_err(CommitError::ConfigError)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().map_err(CommitError::CommitFailed)?),
        Err(e)
            if e.code() == git2::ErrorCode::UnbornBranch
                || e.code() == git2::ErrorCode::NotFound =>
        {
            None
        }
        Err(e) => return Err(CommitError::CommitFailed(e)),
    };
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(CommitError::CommitFailed)?;

    debug!(%oid, "Created commit");
    Ok(oid)
}
