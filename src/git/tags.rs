//! Tag enumeration and version detection.

use std::collections::BTreeMap;

use git2::{Oid, Repository};
use semver::Version;
use tracing::{debug, warn};

use crate::error::GitError;

/// A git tag with optional semver version.
#[derive(Debug, Clone)]
pub struct TagInfo {
    pub name: String,
    pub oid: git2::Oid,
    pub version: Option<Version>,
}

/// Whether a tag name is a plain `vX.Y.Z` / `X.Y.Z` release (no pre-release or build suffix).
fn is_stable_release_tag(name: &str) -> bool {
    let raw = name.strip_prefix('v').unwrap_or(name);
    let mut parts = raw.split('.');
    let major = parts.next();
    let minor = parts.next();
    let patch = parts.next();
    let extra = parts.next();

    extra.is_none()
        && major.is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        && minor.is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        && patch.is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Highest stable release tag among `tags`.
pub fn latest_release_tag(tags: &[TagInfo]) -> Option<TagInfo> {
    let latest = tags
        .iter()
        .filter(|t| t.version.is_some() && is_stable_release_tag(&t.name))
        .max_by(|a, b| a.version.cmp(&b.version))
        .cloned();

    match &latest {
        Some(tag) => debug!(tag = %tag.name, "Found latest release tag"),
        None => debug!("No stable release tags found"),
    }

    latest
}

/// Parse `git ls-remote --tags` output into tags.
///
/// Peeled `^{}` entries replace the tag object id with the commit id.
pub fn parse_ls_remote_tags(output: &str) -> Vec<TagInfo> {
    let mut by_name: BTreeMap<String, Oid> = BTreeMap::new();

    for line in output.lines() {
        let Some((hash, reference)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let Some(name) = reference.trim().strip_prefix("refs/tags/") else {
            continue;
        };
        let Ok(oid) = Oid::from_str(hash.trim()) else {
            warn!("Skipping ls-remote line with invalid object id: {}", line);
            continue;
        };
        match name.strip_suffix("^{}") {
            Some(peeled) => {
                by_name.insert(peeled.to_string(), oid);
            }
            None => {
                by_name.entry(name.to_string()).or_insert(oid);
            }
        }
    }

    by_name
        .into_iter()
        .map(|(name, oid)| TagInfo {
            version: get_version_from_tag(&name),
            name,
            oid,
        })
        .collect()
}

/// Check whether a tag with the given name exists locally.
pub fn tag_exists(repo: &Repository, name: &str) -> bool {
    repo.find_reference(&format!("refs/tags/{name}")).is_ok()
}

/// Get all tags from the repository.
pub fn get_all_tags(repo: &Repository) -> Result<Vec<TagInfo>, GitError> {
    let mut tags = Vec::new();

    repo.tag_foreach(|oid, name_bytes| {
        if let Ok(name_str) = std::str::from_utf8(name_bytes) {
            let name = name_str
                .strip_prefix("refs/tags/")
                .unwrap_or(name_str)
                .to_string();

            let version = get_version_from_tag(&name);

            // Annotated tags point at a tag object; resolve to the commit.
            let resolved_oid = match repo.find_tag(oid) {
                Ok(tag_obj) => tag_obj.target_id(),
                Err(_) => oid,
            };

            tags.push(TagInfo {
                name,
                oid: resolved_oid,
                version,
            });
        } else {
            warn!("Skipping tag with OID {} - name is not valid UTF-8", oid);
        }
        true
    })
    .map_err(GitError::TagEnumeration)?;

    tags.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tags)
}

/// Extract semver version from a tag name.
/// Handles both "v1.2.3" and "1.2.3" formats.
pub fn get_version_from_tag(tag_name: &str) -> Option<Version> {
    let version_str = tag_name.strip_prefix('v').unwrap_or(tag_name);
    Version::parse(version_str).ok()
}
