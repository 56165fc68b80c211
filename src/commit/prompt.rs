//! Prompt construction for AI-generated commit messages.

use std::sync::LazyLock;

use regex_lite::Regex;

/// Maximum characters of diff text embedded in the prompt.
pub const MAX_PROMPT_DIFF_CHARS: usize = 30_000;

/// Build the instruction prompt for a ChangeSet.
///
/// The diff is sanitized and capped at [`MAX_PROMPT_DIFF_CHARS`] characters.
pub fn build_commit_prompt(change_set: &str) -> String {
    let (diff, truncated) = sanitize_diff(change_set, MAX_PROMPT_DIFF_CHARS);

    let truncation_note = if truncated {
        "\n\nNote: the diff was truncated due to size. Focus on the visible changes."
    } else {
        ""
    };

    format!(
        r#"Based on the following git diff, generate a commit message in the Conventional Commits format:

<emoji> <type>(<scope>): <short summary>
<detail line>
<detail line>

Rules:
- Use one of these types: feat, fix, docs, style, refactor, perf, test, build, ci, chore
- (scope) is optional but should name the module or component (e.g., auth, cart, ui)
- The summary must be short (max 50 chars), in imperative mood, with no trailing period
- You may start the first line with one relevant emoji
- Follow the first line with one short detail line per notable change, each on its own line
- Mark breaking changes with `!` after the type or scope
- No explanations, no markdown, no code fences

Git diff:
{diff}{truncation_note}

Return only the commit message without any additional text."#
    )
}

/// Strip ANSI escape sequences and control characters, then truncate.
///
/// Newlines and tabs survive. Truncation happens on a char boundary.
/// Returns the cleaned text and whether it was truncated.
pub fn sanitize_diff(text: &str, max_chars: usize) -> (String, bool) {
    let cleaned = remove_control_chars(&remove_ansi_escapes(text));

    if cleaned.chars().count() <= max_chars {
        return (cleaned, false);
    }

    (cleaned.chars().take(max_chars).collect(), true)
}

/// ANSI escape sequences: CSI `ESC [ ... final`, two-byte `ESC x`, or a lone `ESC`.
static ANSI_ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\x1b(?:\[[^@-~]*[@-~]?|.)?").expect("ANSI escape pattern is valid")
});

fn remove_ansi_escapes(text: &str) -> String {
    ANSI_ESCAPE_RE.replace_all(text, "").into_owned()
}

fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_diff_and_vocabulary() {
        let prompt = build_commit_prompt("+fn main() {}\n");
        assert!(prompt.contains("+fn main() {}"));
        assert!(prompt.contains("feat, fix, docs, style, refactor, perf, test, build, ci, chore"));
        assert!(prompt.contains("Return only the commit message"));
        assert!(!prompt.contains("truncated"));
    }

    #[test]
    fn test_prompt_notes_truncation() {
        let big = "a".repeat(MAX_PROMPT_DIFF_CHARS + 10);
        let prompt = build_commit_prompt(&big);
        assert!(prompt.contains("the diff was truncated"));
        assert!(!prompt.contains(&big));
    }

    #[test]
    fn test_sanitize_removes_ansi_sequences() {
        let (out, truncated) = sanitize_diff("\x1b[32m+added\x1b[0m\n\x1b[1;31m-removed\x1b[m", 1000);
        assert_eq!(out, "+added\n-removed");
        assert!(!truncated);
    }

    #[test]
    fn test_sanitize_removes_control_chars_but_keeps_newline_and_tab() {
        let (out, _) = sanitize_diff("a\x00b\x07c\r\n\td", 1000);
        assert_eq!(out, "abc\n\td");
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let (out, truncated) = sanitize_diff("ééééé", 3);
        assert_eq!(out, "ééé");
        assert!(truncated);
    }

    #[test]
    fn test_sanitize_removes_two_byte_escape_and_unterminated_csi() {
        let (out, _) = sanitize_diff("a\x1b7b\x1b[12", 100);
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_sanitize_lone_escape_at_end() {
        let (out, _) = sanitize_diff("text\x1b", 100);
        assert_eq!(out, "text");
    }
}
