//! GitHub REST payloads.
//!
//! Only the fields the agents actually read are declared; serde drops the
//! rest. The same structs are re-serialized as the compact JSON handed to
//! the model, so keep them small.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    #[serde(default)]
    pub spdx_id: Option<String>,
    pub name: String,
}

/// Repository metadata as returned by `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

/// One item of the contents API, before any reshaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawContent {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Kind of a directory entry as exposed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Dir => write!(f, "dir"),
        }
    }
}

/// A single entry of a directory listing: `{name, path, type, size, url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    pub url: String,
}

impl DirectoryEntry {
    /// Rebuild an entry field by field from a raw contents item.
    ///
    /// Anything that is not a plain file (dirs, symlinks, submodules) is
    /// reported as `dir` with size 0.
    pub fn from_raw(raw: &RawContent) -> Self {
        let is_file = raw.kind == "file";
        Self {
            name: raw.name.clone(),
            path: raw.path.clone(),
            kind: if is_file { EntryKind::File } else { EntryKind::Dir },
            size: if is_file { raw.size } else { 0 },
            url: raw.html_url.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub head: Option<BranchRef>,
    #[serde(default)]
    pub base: Option<BranchRef>,
    #[serde(default)]
    pub commits: Option<u64>,
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
    #[serde(default)]
    pub changed_files: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestFile {
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
    #[serde(default)]
    pub patch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewComment {
    pub id: u64,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// A pull request together with its changed files and review comments.
#[derive(Debug, Clone, Serialize)]
pub struct PullRequestDetails {
    #[serde(flatten)]
    pub pull_request: PullRequest,
    pub files: Vec<PullRequestFile>,
    pub comments: Vec<ReviewComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
    pub commit: CommitRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    /// Present when the "issue" is actually a pull request.
    #[serde(default, skip_serializing)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults<T> {
    pub total_count: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryName {
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSearchItem {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub html_url: Option<String>,
    pub repository: RepositoryName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub limit: u64,
    pub remaining: u64,
    pub reset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimitWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimit {
    pub resources: RateLimitResources,
}

/// Result of `update_file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpdate {
    pub path: String,
    pub commit_sha: String,
    pub created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(kind: &str, size: u64) -> RawContent {
        serde_json::from_value(json!({
            "name": "ci.yml",
            "path": ".github/workflows/ci.yml",
            "type": kind,
            "size": size,
            "html_url": "https://github.com/o/r/blob/main/.github/workflows/ci.yml"
        }))
        .unwrap()
    }

    #[test]
    fn test_entry_from_raw_file() {
        let entry = DirectoryEntry::from_raw(&raw("file", 512));
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.size, 512);
        assert!(entry.url.ends_with("ci.yml"));
    }

    #[test]
    fn test_entry_from_raw_non_file_is_dir_with_zero_size() {
        for kind in ["dir", "symlink", "submodule"] {
            let entry = DirectoryEntry::from_raw(&raw(kind, 99));
            assert_eq!(entry.kind, EntryKind::Dir);
            assert_eq!(entry.size, 0);
        }
    }

    #[test]
    fn test_entry_serializes_type_field() {
        let value = serde_json::to_value(DirectoryEntry::from_raw(&raw("file", 1))).unwrap();
        assert_eq!(value["type"], "file");
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["name", "path", "size", "type", "url"]);
    }

    #[test]
    fn test_search_results_without_items() {
        let repos: SearchResults<Repository> =
            serde_json::from_value(json!({"total_count": 0})).unwrap();
        assert!(repos.items.is_empty());

        let code: SearchResults<CodeSearchItem> = serde_json::from_value(json!({
            "total_count": 1,
            "items": [{
                "name": "agent.py",
                "path": "libs/agno/agent.py",
                "repository": {"full_name": "agno-agi/agno"}
            }]
        }))
        .unwrap();
        assert_eq!(code.items[0].repository.full_name, "agno-agi/agno");
    }
}
