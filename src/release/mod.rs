//! Release tagging: bump the pubspec version, commit, tag, push.

pub mod executor;
pub mod pubspec;

use std::path::{Path, PathBuf};

use git2::{Oid, Repository};
use semver::Version;
use tracing::{debug, warn};

use crate::commit::Confirmer;
use crate::error::{GitError, ReleaseError};
use crate::git::{TagInfo, get_all_tags, latest_release_tag, tag_exists};

use self::pubspec::{PUBSPEC_FILE, PubspecVersion, read_pubspec, write_pubspec_version};

/// Flags for the `tag` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseOptions {
    pub dry_run: bool,
    pub no_push: bool,
}

/// Everything the release will do, computed before any change.
#[derive(Debug, Clone)]
pub struct ReleasePlan {
    pub pubspec_path: PathBuf,
    pub pubspec_content: String,
    pub current: Option<PubspecVersion>,
    /// Highest stable tag across local tags and `origin`.
    pub latest_tag: Option<TagInfo>,
    /// Tags read from `origin`; empty when there is no such remote or it is unreachable.
    pub remote_tags: Vec<TagInfo>,
    pub next: PubspecVersion,
    pub tag_name: String,
    pub commit_message: String,
}

/// What a release run ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    DryRun,
    Tagged { commit: Oid, pushed: bool },
}

/// Next release version.
///
/// Highest stable tag with the patch bumped; else the pubspec version; else `1.0.0`.
pub fn next_version(latest_tag: Option<&Version>, pubspec: Option<&Version>) -> Version {
    match (latest_tag, pubspec) {
        (Some(tag), _) => Version::new(tag.major, tag.minor, tag.patch + 1),
        (None, Some(current)) => Version::new(current.major, current.minor, current.patch),
        (None, None) => Version::new(1, 0, 0),
    }
}

/// Next build number: current + 1, or 1 when there is none.
pub fn next_build(current: Option<u64>) -> u64 {
    current.map_or(1, |b| b + 1)
}

/// Remote consulted for existing release tags.
const ORIGIN: &str = "origin";

/// Compute the release plan for the Flutter project at the repository root.
///
/// Tags on `origin` count alongside local ones. When `origin` cannot be read,
/// a warning is logged and only local tags are used.
pub fn plan_release(repo: &Repository) -> Result<ReleasePlan, ReleaseError> {
    let workdir = repo.workdir().ok_or(GitError::BareRepository)?;
    let pubspec_path = workdir.join(PUBSPEC_FILE);
    let (pubspec_content, current) = read_pubspec(&pubspec_path)?;

    let remote_tags = fetch_remote_tags(repo, workdir);
    let mut candidates = get_all_tags(repo)?;
    candidates.extend(remote_tags.iter().cloned());
    let latest_tag = latest_release_tag(&candidates);

    let version = next_version(
        latest_tag.as_ref().and_then(|t| t.version.as_ref()),
        current.as_ref().map(|c| &c.version),
    );
    let next = PubspecVersion {
        version,
        build: Some(next_build(current.as_ref().and_then(|c| c.build))),
    };

    let tag_name = format!("v{}", next.version);
    let commit_message = format!("chore: bump version to {}", next);
    debug!(%tag_name, %commit_message, "Planned release");

    Ok(ReleasePlan {
        pubspec_path,
        pubspec_content,
        current,
        latest_tag,
        remote_tags,
        next,
        tag_name,
        commit_message,
    })
}

/// Run the release flow: plan, confirm, bump, commit, tag, push.
///
/// Fails with [`ReleaseError::TagAlreadyExists`] before touching anything when
/// the computed tag is taken. A failed push leaves the local commit and tag in place.
pub fn run_release(
    repo: &Repository,
    confirmer: &dyn Confirmer,
    options: ReleaseOptions,
) -> Result<ReleaseOutcome, ReleaseError> {
    let plan = plan_release(repo)?;
    print_plan(&plan, options);

    ensure_tag_available(repo, &plan.remote_tags, &plan.tag_name)?;

    if options.dry_run {
        println!();
        println!("Dry run complete. No changes made.");
        return Ok(ReleaseOutcome::DryRun);
    }

    if !options.no_push {
        executor::check_git_installed()?;
    }

    println!();
    let prompt = format!(
        "Update {}, commit and create tag {}?",
        PUBSPEC_FILE, plan.tag_name
    );
    if !confirmer.confirm(&prompt) {
        return Err(ReleaseError::Cancelled);
    }

    write_pubspec_version(&plan.pubspec_path, &plan.pubspec_content, &plan.next)?;
    println!("  [DONE] Updated {} to {}", PUBSPEC_FILE, plan.next);

    executor::stage_file(repo, Path::new(PUBSPEC_FILE))?;
    let commit = executor::commit_index(repo, &plan.commit_message)?;
    println!("  [DONE] Created commit: {}", plan.commit_message);

    executor::create_tag(repo, &plan.tag_name, commit)?;
    println!("  [DONE] Created tag: {}", plan.tag_name);

    if options.no_push {
        println!();
        println!("Skipping push. Run `git push && git push origin {}` when ready.", plan.tag_name);
        return Ok(ReleaseOutcome::Tagged {
            commit,
            pushed: false,
        });
    }

    let workdir = repo.workdir().ok_or(GitError::BareRepository)?;
    if let Err(e) = executor::push_commit_and_tag(workdir, &plan.tag_name) {
        eprintln!("  [FAIL] {}", e);
        eprintln!();
        eprintln!(
            "The commit and tag {} were created locally. Push them manually once the issue is fixed.",
            plan.tag_name
        );
        return Err(e);
    }
    println!("  [DONE] Pushed commit and tag {}", plan.tag_name);
    println!();
    println!("Release {} tagged!", plan.tag_name);

    Ok(ReleaseOutcome::Tagged {
        commit,
        pushed: true,
    })
}

/// Fail with [`ReleaseError::TagAlreadyExists`] when `name` is taken locally or on the remote.
pub fn ensure_tag_available(
    repo: &Repository,
    remote_tags: &[TagInfo],
    name: &str,
) -> Result<(), ReleaseError> {
    if tag_exists(repo, name) || remote_tags.iter().any(|t| t.name == name) {
        return Err(ReleaseError::TagAlreadyExists(name.to_string()));
    }
    Ok(())
}

fn fetch_remote_tags(repo: &Repository, workdir: &Path) -> Vec<TagInfo> {
    if repo.find_remote(ORIGIN).is_err() {
        debug!("No {} remote; using local tags only", ORIGIN);
        return Vec::new();
    }
    if executor::check_git_installed().is_err() {
        warn!("git executable not found; using local tags only");
        return Vec::new();
    }
    match executor::list_remote_tags(workdir, ORIGIN) {
        Ok(tags) => tags,
        Err(e) => {
            warn!("{}; using local tags only", e);
            Vec::new()
        }
    }
}

fn print_plan(plan: &ReleasePlan, options: ReleaseOptions) {
    println!("Release plan:");
    println!(
        "  Latest tag: {}",
        plan.latest_tag
            .as_ref()
            .map(|t| t.name.as_str())
            .unwrap_or("(none)")
    );
    println!(
        "  Version:    {} -> {}",
        plan.current
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string()),
        plan.next
    );
    if !plan.remote_tags.is_empty() {
        println!("  Remote:     {} tag(s) on {}", plan.remote_tags.len(), ORIGIN);
    }
    println!("  Commit:     {}", plan.commit_message);
    println!("  Tag:        {}", plan.tag_name);
    println!(
        "  Push:       {}",
        if options.no_push { "skipped" } else { "origin" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::confirm::MockConfirmer;

    fn init_repo(dir: &Path, pubspec: &str) -> Repository {
        let repo = Repository::init(dir).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@test.com").unwrap();
        }
        std::fs::write(dir.join(PUBSPEC_FILE), pubspec).unwrap();
        executor::stage_file(&repo, Path::new(PUBSPEC_FILE)).unwrap();
        let oid = executor::commit_index(&repo, "init").unwrap();
        assert!(!oid.is_zero());
        repo
    }

    fn tag_head(repo: &Repository, name: &str) {
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.tag_lightweight(name, head.as_object(), false).unwrap();
    }

    #[test]
    fn test_next_version_rules() {
        let tag = Version::new(1, 2, 3);
        let pubspec = Version::new(9, 9, 9);
        assert_eq!(next_version(Some(&tag), Some(&pubspec)), Version::new(1, 2, 4));
        assert_eq!(next_version(None, Some(&pubspec)), Version::new(9, 9, 9));
        assert_eq!(next_version(None, None), Version::new(1, 0, 0));
    }

    #[test]
    fn test_next_build_rules() {
        assert_eq!(next_build(None), 1);
        assert_eq!(next_build(Some(41)), 42);
    }

    #[test]
    fn test_plan_without_tags_uses_pubspec_version() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path(), "name: app\nversion: 2.3.1+7\n");

        let plan = plan_release(&repo).unwrap();
        assert_eq!(plan.tag_name, "v2.3.1");
        assert_eq!(plan.next.to_string(), "2.3.1+8");
        assert_eq!(plan.commit_message, "chore: bump version to 2.3.1+8");
    }

    #[test]
    fn test_plan_with_tags_bumps_patch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path(), "name: app\nversion: 1.0.0\n");
        tag_head(&repo, "v1.4.9");
        tag_head(&repo, "v1.10.0-beta.1");

        let plan = plan_release(&repo).unwrap();
        assert_eq!(plan.tag_name, "v1.4.10");
        assert_eq!(plan.next.to_string(), "1.4.10+1");
    }

    #[test]
    fn test_plan_without_version_line_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path(), "name: app\n");

        let plan = plan_release(&repo).unwrap();
        assert_eq!(plan.tag_name, "v1.0.0");
        assert_eq!(plan.next.to_string(), "1.0.0+1");
    }

    #[test]
    fn test_plan_requires_pubspec() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(matches!(
            plan_release(&repo),
            Err(ReleaseError::PubspecNotFound(_))
        ));
    }

    #[test]
    fn test_ensure_tag_available() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path(), "version: 3.0.0+2\n");
        tag_head(&repo, "v3.0.0");

        let remote = crate::git::parse_ls_remote_tags(
            "1111111111111111111111111111111111111111\trefs/tags/v3.0.1\n",
        );

        assert!(ensure_tag_available(&repo, &[], "v3.0.1").is_ok());
        assert!(ensure_tag_available(&repo, &remote, "v3.0.2").is_ok());
        assert!(matches!(
            ensure_tag_available(&repo, &remote, "v3.0.1"),
            Err(ReleaseError::TagAlreadyExists(ref t)) if t == "v3.0.1"
        ));
        assert!(matches!(
            ensure_tag_available(&repo, &[], "v3.0.0"),
            Err(ReleaseError::TagAlreadyExists(ref t)) if t == "v3.0.0"
        ));
    }

    #[test]
    fn test_run_release_dry_run_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path(), "version: 1.0.0+1\n");
        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().times(0);

        let outcome = run_release(
            &repo,
            &confirmer,
            ReleaseOptions {
                dry_run: true,
                no_push: false,
            },
        )
        .unwrap();

        assert_eq!(outcome, ReleaseOutcome::DryRun);
        assert_eq!(
            std::fs::read_to_string(dir.path().join(PUBSPEC_FILE)).unwrap(),
            "version: 1.0.0+1\n"
        );
        assert!(!tag_exists(&repo, "v1.0.0"));
    }

    #[test]
    fn test_run_release_declined_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path(), "version: 1.0.0+1\n");
        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().times(1).return_const(false);

        let result = run_release(
            &repo,
            &confirmer,
            ReleaseOptions {
                dry_run: false,
                no_push: true,
            },
        );

        assert!(matches!(result, Err(ReleaseError::Cancelled)));
        assert!(!tag_exists(&repo, "v1.0.0"));
    }

    #[test]
    fn test_run_release_no_push_commits_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path(), "name: app\nversion: 1.0.0+1\n");
        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().times(1).return_const(true);

        let outcome = run_release(
            &repo,
            &confirmer,
            ReleaseOptions {
                dry_run: false,
                no_push: true,
            },
        )
        .unwrap();

        let ReleaseOutcome::Tagged { commit, pushed } = outcome else {
            panic!("Expected Tagged outcome, got: {:?}", outcome);
        };
        assert!(!pushed);

        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.id(), commit);
        assert_eq!(head.message().unwrap(), "chore: bump version to 1.0.0+2");
        assert!(tag_exists(&repo, "v1.0.0"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(PUBSPEC_FILE)).unwrap(),
            "name: app\nversion: 1.0.0+2\n"
        );
    }
}
