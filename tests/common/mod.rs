//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use fdev::commit::Confirmer;
use fdev::error::GenerateError;
use fdev::llm::MessageGenerator;

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository with a committer identity configured.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config
                .set_str("user.name", "Test User")
                .expect("Failed to set user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("Failed to set user.email");
        }
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the repository root, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.dir.path().join(relative)).expect("Failed to remove file");
    }

    /// Stage a single path.
    pub fn stage(&self, relative: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index
            .add_path(Path::new(relative))
            .expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Write `relative`, stage it and commit. Returns the commit OID.
    pub fn commit_file(&self, relative: &str, content: &str, message: &str) -> Oid {
        self.write(relative, content);
        self.stage(relative);

        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");
        let sig = Signature::now("Test User", "test@example.com").expect("Failed to create signature");
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Create a lightweight tag on HEAD.
    pub fn tag_head(&self, name: &str) {
        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("Failed to resolve HEAD");
        self.repo
            .tag_lightweight(name, head.as_object(), false)
            .expect("Failed to create lightweight tag");
    }

    /// Register a remote.
    pub fn add_remote(&self, name: &str, url: &str) {
        self.repo
            .remote(name, url)
            .expect("Failed to add remote");
    }

    /// Push local tags to the remote `name`.
    pub fn push_tags(&self, name: &str, tags: &[&str]) {
        let refspecs: Vec<String> = tags
            .iter()
            .map(|t| format!("refs/tags/{t}:refs/tags/{t}"))
            .collect();
        let mut remote = self.repo.find_remote(name).expect("Failed to find remote");
        remote.push(&refspecs, None).expect("Failed to push tags");
    }

    /// Number of commits reachable from HEAD (0 on an unborn branch).
    pub fn commit_count(&self) -> usize {
        let mut walk = self.repo.revwalk().expect("Failed to create revwalk");
        if walk.push_head().is_err() {
            return 0;
        }
        walk.count()
    }

    pub fn head_message(&self) -> String {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("Failed to resolve HEAD")
            .message()
            .unwrap_or_default()
            .to_string()
    }

    /// Paths currently staged relative to HEAD.
    pub fn staged_paths(&self) -> Vec<String> {
        let head_tree = self.repo.head().ok().and_then(|h| h.peel_to_tree().ok());
        let diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), None, None)
            .expect("Failed to diff index");
        let mut paths: Vec<String> = diff
            .deltas()
            .filter_map(|d| {
                d.new_file()
                    .path()
                    .or_else(|| d.old_file().path())
                    .map(|p| p.to_string_lossy().to_string())
            })
            .collect();
        paths.sort();
        paths
    }
}

/// An empty bare repository to act as `origin`.
pub fn bare_origin() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    Repository::init_bare(dir.path()).expect("Failed to init bare repo");
    dir
}

/// A generator that returns a fixed response and records every call.
pub struct ScriptedGenerator {
    response: Mutex<Option<Result<String, GenerateError>>>,
    calls: AtomicUsize,
    pub last_input: Mutex<Option<String>>,
}

impl ScriptedGenerator {
    pub fn replying(text: &str) -> Self {
        Self::with_result(Ok(text.to_string()))
    }

    pub fn failing(err: GenerateError) -> Self {
        Self::with_result(Err(err))
    }

    fn with_result(result: Result<String, GenerateError>) -> Self {
        Self {
            response: Mutex::new(Some(result)),
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageGenerator for ScriptedGenerator {
    async fn generate(&self, change_set: &str) -> Result<String, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some(change_set.to_string());
        self.response
            .lock()
            .unwrap()
            .take()
            .expect("ScriptedGenerator called more than once")
    }
}

/// A confirmer that gives a fixed answer and counts prompts.
pub struct ScriptedConfirmer {
    answer: bool,
    prompts: AtomicUsize,
}

impl ScriptedConfirmer {
    pub fn yes() -> Self {
        Self {
            answer: true,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn no() -> Self {
        Self {
            answer: false,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, _prompt: &str) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}
