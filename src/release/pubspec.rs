//! Reading and rewriting the `version:` line of a Flutter `pubspec.yaml`.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex_lite::Regex;
use semver::Version;

use crate::atomic_write::write_atomic;
use crate::error::ReleaseError;

pub const PUBSPEC_FILE: &str = "pubspec.yaml";

/// `version: 1.2.3+4`, optionally quoted, optionally followed by a comment.
static VERSION_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^version:\s*["']?(\d+)\.(\d+)\.(\d+)(?:\+(\d+))?["']?\s*(?:#.*)?$"#)
        .expect("version line pattern is valid")
});

/// A pubspec version with its optional build number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubspecVersion {
    pub version: Version,
    pub build: Option<u64>,
}

impl fmt::Display for PubspecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.build {
            Some(build) => write!(f, "{}+{}", self.version, build),
            None => write!(f, "{}", self.version),
        }
    }
}

/// Find the top-level `version:` line.
///
/// Returns `Ok(None)` when the file has no `version:` key at all, and
/// [`ReleaseError::NoVersionInPubspec`] when the key is present but not `X.Y.Z[+N]`.
pub fn parse_version(content: &str, path: &Path) -> Result<Option<PubspecVersion>, ReleaseError> {
    let Some(line) = content
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .find(|l| l.starts_with("version:"))
    else {
        return Ok(None);
    };

    let caps = VERSION_LINE_RE
        .captures(line)
        .ok_or_else(|| ReleaseError::NoVersionInPubspec(path.to_path_buf()))?;

    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    let (Some(major), Some(minor), Some(patch)) = (number(1), number(2), number(3)) else {
        return Err(ReleaseError::NoVersionInPubspec(path.to_path_buf()));
    };

    Ok(Some(PubspecVersion {
        version: Version::new(major, minor, patch),
        build: number(4),
    }))
}

/// Read `pubspec.yaml` and parse its version.
pub fn read_pubspec(path: &Path) -> Result<(String, Option<PubspecVersion>), ReleaseError> {
    if !path.is_file() {
        return Err(ReleaseError::PubspecNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ReleaseError::PubspecRead {
        path: path.to_path_buf(),
        source,
    })?;
    let version = parse_version(&content, path)?;
    Ok((content, version))
}

/// Replace the `version:` line with `version: <new>`, or append one when absent.
///
/// Every other line, including line endings, is kept byte for byte.
pub fn rewrite_version(content: &str, new: &PubspecVersion) -> String {
    let replacement = format!("version: {}", new);
    let mut out = String::with_capacity(content.len() + replacement.len() + 1);
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        if !replaced && line.starts_with("version:") {
            let ending = if line.ends_with("\r\n") {
                "\r\n"
            } else if line.ends_with('\n') {
                "\n"
            } else {
                ""
            };
            out.push_str(&replacement);
            out.push_str(ending);
            replaced = true;
        } else {
            out.push_str(line);
        }
    }

    if !replaced {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&replacement);
        out.push('\n');
    }

    out
}

/// Write the new version into `path` atomically.
pub fn write_pubspec_version(
    path: &Path,
    content: &str,
    new: &PubspecVersion,
) -> Result<(), ReleaseError> {
    write_atomic(path, &rewrite_version(content, new)).map_err(|source| {
        ReleaseError::PubspecWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}
