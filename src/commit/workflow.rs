//! The commit flow: collect, generate, confirm, commit.

use git2::{Oid, Repository};
use tracing::debug;

use crate::commit::confirm::Confirmer;
use crate::commit::diff::{ChangeSet, collect_change_set};
use crate::commit::message::{CommitMessage, commit_staged};
use crate::config::Config;
use crate::error::CommitError;
use crate::llm::{MessageGenerator, build_generator};

/// Flags for one `commit` invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitOptions {
    /// Stage every working-tree change even when something is already staged.
    pub stage_all: bool,
}

/// A commit that was created.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub oid: Oid,
    pub message: CommitMessage,
    pub change_set: ChangeSet,
}

/// Turn ChangeSet text into a [`CommitMessage`].
///
/// Empty or whitespace-only text yields [`CommitError::NoChanges`] without
/// calling the generator.
pub async fn synthesize(
    change_set: &str,
    generator: &dyn MessageGenerator,
) -> Result<CommitMessage, CommitError> {
    if change_set.trim().is_empty() {
        return Err(CommitError::NoChanges);
    }

    let raw = generator.generate(change_set).await?;
    debug!(raw_chars = raw.len(), "Received generated message");

    CommitMessage::parse(&raw)
}

/// Run the full commit flow against `repo`.
///
/// Nothing is committed unless `confirmer` answers yes. Auto-staging done
/// while collecting the ChangeSet stays in place on every error path.
pub async fn run_commit(
    repo: &Repository,
    generator: &dyn MessageGenerator,
    confirmer: &dyn Confirmer,
    options: CommitOptions,
) -> Result<CommitOutcome, CommitError> {
    let change_set = collect_change_set(repo, options.stage_all)?;

    if !change_set.newly_staged.is_empty() {
        println!("Staged {} file(s):", change_set.newly_staged.len());
        for path in &change_set.newly_staged {
            println!("  {}", path);
        }
    }

    println!(
        "Generating commit message for {} file(s) (+{} -{})...",
        change_set.changed_files.len(),
        change_set.additions,
        change_set.deletions
    );
    if change_set.truncated {
        println!("  [WARN] Diff truncated; the message is based on the visible part");
    }

    let message = synthesize(&change_set.text, generator).await?;
    let formatted = message.format();

    println!();
    println!("Generated commit message:");
    println!();
    for line in formatted.lines() {
        println!("  {}", line);
    }
    println!();

    if !confirmer.confirm("Commit with this message?") {
        return Err(CommitError::UserAborted);
    }

    let oid = commit_staged(repo, &formatted)?;

    Ok(CommitOutcome {
        oid,
        message,
        change_set,
    })
}

/// Build the configured generator, then run the commit flow.
///
/// A missing credential fails with [`CommitError::MissingCredential`] before
/// the repository is touched, so nothing gets auto-staged.
pub async fn commit_with_config(
    repo: &Repository,
    config: &Config,
    confirmer: &dyn Confirmer,
    options: CommitOptions,
) -> Result<CommitOutcome, CommitError> {
    let generator = build_generator(config)?;
    run_commit(repo, generator.as_ref(), confirmer, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::confirm::MockConfirmer;
    use crate::error::GenerateError;
    use crate::git::CommitType;
    use crate::llm::MockMessageGenerator;

    fn repo_with_commit(dir: &std::path::Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@test.com").unwrap();
            let sig = git2::Signature::now("Test User", "test@test.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[]).unwrap();
        }
        repo
    }

    fn commit_count(repo: &Repository) -> usize {
        let mut walk = repo.revwalk().unwrap();
        walk.push_head().unwrap();
        walk.count()
    }

    #[tokio::test]
    async fn test_synthesize_empty_change_set_skips_generator() {
        let mut generator = MockMessageGenerator::new();
        generator.expect_generate().times(0);

        let result = synthesize("", &generator).await;
        assert!(matches!(result, Err(CommitError::NoChanges)));

        let result = synthesize("  \n ", &generator).await;
        assert!(matches!(result, Err(CommitError::NoChanges)));
    }

    #[tokio::test]
    async fn test_synthesize_parses_generated_text() {
        let mut generator = MockMessageGenerator::new();
        generator
            .expect_generate()
            .withf(|text: &str| text == "modified: lib/a.dart")
            .times(1)
            .returning(|_| Ok("feat(auth): add login\nAdded form\nAdded validation".to_string()));

        let msg = synthesize("modified: lib/a.dart", &generator).await.unwrap();
        assert_eq!(msg.commit_type, Some(CommitType::Feat));
        assert_eq!(msg.scope.as_deref(), Some("auth"));
        assert_eq!(msg.summary, "add login");
        assert_eq!(msg.details, vec!["Added form", "Added validation"]);
    }

    #[tokio::test]
    async fn test_synthesize_empty_response_is_malformed() {
        let mut generator = MockMessageGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok(String::new()));

        let result = synthesize("diff", &generator).await;
        assert!(matches!(result, Err(CommitError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_synthesize_maps_generator_errors() {
        let mut generator = MockMessageGenerator::new();
        generator.expect_generate().times(1).returning(|_| {
            Err(GenerateError::Timeout {
                provider: "Gemini",
                secs: 30,
            })
        });

        let err = synthesize("diff", &generator).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NetworkError);
        assert!(err.to_string().contains("timed out after 30 seconds"));
    }

    #[tokio::test]
    async fn test_run_commit_declined_creates_no_commit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_with_commit(dir.path());
        std::fs::write(dir.path().join("a.dart"), "void main() {}\n").unwrap();

        let mut generator = MockMessageGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Ok("feat: add main".to_string()));
        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().times(1).return_const(false);

        let result = run_commit(&repo, &generator, &confirmer, CommitOptions::default()).await;

        assert!(matches!(result, Err(CommitError::UserAborted)));
        assert_eq!(commit_count(&repo), 1);
    }

    #[tokio::test]
    async fn test_run_commit_confirmed_creates_one_commit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_with_commit(dir.path());
        std::fs::write(dir.path().join("a.dart"), "void main() {}\n").unwrap();

        let mut generator = MockMessageGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok("feat(app): add main\nAdded entry point".to_string()));
        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().times(1).return_const(true);

        let outcome = run_commit(&repo, &generator, &confirmer, CommitOptions::default())
            .await
            .unwrap();

        assert_eq!(commit_count(&repo), 2);
        let commit = repo.find_commit(outcome.oid).unwrap();
        assert_eq!(
            commit.message().unwrap(),
            "feat(app): add main\n\n- Added entry point"
        );
        assert_eq!(outcome.change_set.newly_staged, vec!["a.dart"]);
    }

    #[tokio::test]
    async fn test_run_commit_clean_tree_never_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_with_commit(dir.path());

        let mut generator = MockMessageGenerator::new();
        generator.expect_generate().times(0);
        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().times(0);

        let result = run_commit(&repo, &generator, &confirmer, CommitOptions::default()).await;
        assert!(matches!(result, Err(CommitError::NoChanges)));
    }
}
