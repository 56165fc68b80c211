//! Conventional commit grammar: `[emoji ]type(scope)!: description`.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Pattern: optional non-ASCII prefix (emoji), type, optional (scope), optional `!`, colon, description.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([^\x00-\x7F]+)\s*)?(\w+)(?:\(([^)]*)\))?(!)?\s*:\s*(.*)$")
        .expect("conventional header pattern is valid")
});

/// Conventional commit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Build,
    Ci,
    Chore,
}

impl CommitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
            CommitType::Chore => "chore",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "feat" => Ok(Self::Feat),
            "fix" => Ok(Self::Fix),
            "docs" => Ok(Self::Docs),
            "style" => Ok(Self::Style),
            "refactor" => Ok(Self::Refactor),
            "perf" => Ok(Self::Perf),
            "test" => Ok(Self::Test),
            "build" => Ok(Self::Build),
            "ci" => Ok(Self::Ci),
            "chore" => Ok(Self::Chore),
            _ => Err(format!("Unknown commit type: {}", s)),
        }
    }
}

/// The parts of a conventional commit header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalHeader {
    pub emoji: Option<String>,
    pub commit_type: CommitType,
    pub scope: Option<String>,
    pub breaking: bool,
    pub description: String,
}

/// Parse a single header line.
///
/// Returns `None` when the line does not follow the grammar, the type is not
/// in the known vocabulary, or the description after the colon is empty.
pub fn parse_header(line: &str) -> Option<ConventionalHeader> {
    let caps = HEADER_RE.captures(line.trim())?;

    let commit_type = caps.get(2)?.as_str().parse::<CommitType>().ok()?;
    let description = caps.get(5).map(|m| m.as_str().trim()).unwrap_or("");
    if description.is_empty() {
        return None;
    }

    let emoji = caps
        .get(1)
        .map(|m| m.as_str().trim().to_string())
        .filter(|e| !e.is_empty());
    let scope = caps
        .get(3)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    Some(ConventionalHeader {
        emoji,
        commit_type,
        scope,
        breaking: caps.get(4).is_some(),
        description: description.to_string(),
    })
}
