//! Conversation context pulled out of free text.

use crate::models::RepoId;
use regex::Regex;
use std::sync::OnceLock;

/// Cue words that reliably introduce a repository.
const STRONG_CUES: &[&str] = &[
    "repo", "repository", "analyze", "analyse", "summarize", "summarise", "explore",
];

/// Top-level directory names that make `a/b` read as a path, not a repository.
const COMMON_DIRS: &[&str] = &[
    "src", "lib", "libs", "app", "apps", "docs", "doc", "test", "tests", "spec", "examples",
    "example", "packages", "pkg", "cmd", "internal", "crates", "scripts", "bin", "config",
    "configs", "agents", "api", "web", "server", "client", "core", "utils", "tools", "assets",
    "public", "static", ".github", "workflows", "include", "modules", "components",
];

const FILE_EXTENSIONS: &[&str] = &[
    "py", "rs", "md", "toml", "json", "yml", "yaml", "txt", "go", "java", "lock", "cfg", "ini",
    "sh", "html", "css", "tsx", "jsx", "rb", "c", "h", "cpp",
];

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)github\.com[/:]([A-Za-z0-9-]+/[A-Za-z0-9._-]+)").expect("valid regex")
    })
}

fn quoted_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"[`'"‘“]([A-Za-z0-9-]+/[A-Za-z0-9._-]+)[`'"’”]"#).expect("valid regex")
    })
}

fn cue_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(repo|repository|in|of|for|from|at|analyze|analyse|summarize|summarise|explore|about)\s+(?:the\s+)?(?:repo\s+|repository\s+)?([A-Za-z0-9-]+/[A-Za-z0-9._-]+)(/?)",
        )
        .expect("valid regex")
    })
}

fn proposal_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)get_github_info\s*:\s*(.+)$").expect("valid regex"))
}

fn parse_repo(token: &str) -> Option<RepoId> {
    token.trim_end_matches(['.', ',']).parse().ok()
}

fn looks_like_directory(repo: &RepoId) -> bool {
    COMMON_DIRS.contains(&repo.owner().to_lowercase().as_str())
}

fn looks_like_file(repo: &RepoId) -> bool {
    repo.name()
        .rsplit_once('.')
        .map(|(_, ext)| FILE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// A repository named in free text, with how firmly it was named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoMention {
    /// A github.com URL, a quoted `owner/name`, or a token after a strong
    /// cue such as "repo" or "analyze".
    Explicit(RepoId),
    /// A token after a weak cue such as "in" or "of". It may just as well
    /// be a path inside the current repository (`cookbook/teams`).
    Weak(RepoId),
}

impl RepoMention {
    pub fn into_repo(self) -> RepoId {
        match self {
            RepoMention::Explicit(repo) | RepoMention::Weak(repo) => repo,
        }
    }
}

/// Find a repository named in `text`.
///
/// Tries, in order: a github.com URL, a quoted `owner/name`, and an
/// `owner/name` token right after a cue word ("in", "of", "repo", ...).
/// Tokens after weak cues such as "in" are ignored when they look like a
/// path inside a repository (`src/lib`, `agents/foo.py`).
pub fn find_repo_mention(text: &str) -> Option<RepoMention> {
    if let Some(repo) = url_pattern()
        .captures_iter(text)
        .find_map(|c| parse_repo(&c[1]))
    {
        return Some(RepoMention::Explicit(repo));
    }

    if let Some(repo) = quoted_pattern()
        .captures_iter(text)
        .filter_map(|c| parse_repo(&c[1]))
        .find(|r| !looks_like_directory(r))
    {
        return Some(RepoMention::Explicit(repo));
    }

    cue_pattern().captures_iter(text).find_map(|c| {
        if !c[3].is_empty() {
            return None;
        }
        let repo = parse_repo(&c[2])?;
        if STRONG_CUES.contains(&c[1].to_lowercase().as_str()) {
            Some(RepoMention::Explicit(repo))
        } else if looks_like_directory(&repo) || looks_like_file(&repo) {
            None
        } else {
            Some(RepoMention::Weak(repo))
        }
    })
}

/// The last `get_github_info: <query>` proposal in an agent reply.
pub fn extract_proposed_action(reply: &str) -> Option<String> {
    let raw = proposal_pattern()
        .captures_iter(reply)
        .last()
        .map(|c| c[1].to_string())?;

    let trimmed = raw.trim().trim_matches(|c: char| c == '`' || c == '*').trim();
    let unquoted = [('"', '"'), ('\'', '\''), ('“', '”')]
        .iter()
        .find_map(|(open, close)| {
            trimmed
                .strip_prefix(*open)
                .and_then(|rest| rest.strip_suffix(*close))
        })
        .unwrap_or(trimmed)
        .trim();

    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(text: &str) -> Option<String> {
        find_repo_mention(text).map(|m| m.into_repo().to_string())
    }

    #[test]
    fn test_extract_from_url() {
        assert_eq!(
            repo("look at https://github.com/agno-agi/agno/tree/main/libs").as_deref(),
            Some("agno-agi/agno")
        );
        assert_eq!(
            repo("clone git@github.com:rust-lang/cargo.git").as_deref(),
            Some("rust-lang/cargo")
        );
    }

    #[test]
    fn test_extract_quoted() {
        assert_eq!(
            repo("Summarize 'agno-agi/agno' repo").as_deref(),
            Some("agno-agi/agno")
        );
        assert_eq!(repo("what is `vercel/next.js`?").as_deref(), Some("vercel/next.js"));
    }

    #[test]
    fn test_extract_after_cue() {
        assert_eq!(
            repo("How many open issues are in facebook/react?").as_deref(),
            Some("facebook/react")
        );
        assert_eq!(
            repo("analyze tokio-rs/axum and its routing").as_deref(),
            Some("tokio-rs/axum")
        );
        assert_eq!(
            repo("Switch to the repository c-org/d-repo.").as_deref(),
            Some("c-org/d-repo")
        );
    }

    #[test]
    fn test_paths_are_not_repositories() {
        assert_eq!(repo("list the files in src/agents"), None);
        assert_eq!(repo("get the contents of agents/some_agent.py"), None);
        assert_eq!(repo("what is in cookbook/examples/teams"), None);
        assert_eq!(repo("explain the scheduler"), None);
        assert_eq!(repo("hello"), None);
    }

    #[test]
    fn test_mention_strength() {
        let named = |t: &str| find_repo_mention(t).map(|m| matches!(m, RepoMention::Explicit(_)));
        assert_eq!(named("What's in cookbook/teams?"), Some(false));
        assert_eq!(named("Explain the code in agno/team"), Some(false));
        assert_eq!(named("What does the repository c-org/d-repo do?"), Some(true));
        assert_eq!(named("Summarize 'agno-agi/agno' repo"), Some(true));
        assert_eq!(named("see https://github.com/facebook/react"), Some(true));
        assert_eq!(named("hello"), None);
    }

    #[test]
    fn test_extract_proposed_action() {
        let reply = "I found 3 agents.\n\nShall we look for more?\nget_github_info: search for code containing \"Agent\" in agno-agi/agno\n";
        assert_eq!(
            extract_proposed_action(reply).as_deref(),
            Some("search for code containing \"Agent\" in agno-agi/agno")
        );

        let quoted = "Next step: `get_github_info: 'list the files in libs/ of agno-agi/agno'`";
        assert_eq!(
            extract_proposed_action(quoted).as_deref(),
            Some("list the files in libs/ of agno-agi/agno")
        );

        let two = "get_github_info: first\nthen\nget_github_info: second";
        assert_eq!(extract_proposed_action(two).as_deref(), Some("second"));

        assert_eq!(extract_proposed_action("Would you like more?"), None);
        assert_eq!(extract_proposed_action("get_github_info:   "), None);
    }
}
