//! GitHub capabilities offered to the data agent.

use crate::agent::tools::{
    optional_count, optional_str, required_str, required_u64, ToolDefinition, Toolset,
};
use crate::github::{
    CodeSearchFilters, GithubClient, PullRequestCountFilters, SafeDirectoryListing,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Capability names, in the order they are offered.
pub const GITHUB_TOOL_NAMES: [&str; 15] = [
    "get_repository",
    "search_repositories",
    "get_pull_request",
    "get_pull_request_changes",
    "list_branches",
    "get_pull_request_count",
    "get_pull_requests",
    "get_pull_request_comments",
    "get_pull_request_with_details",
    "list_issues",
    "get_issue",
    "update_file",
    "get_file_content",
    "get_directory_content",
    "search_code",
];

const REPO_NAME: (&str, &str, &str) = (
    "repo_name",
    "string",
    "Full repository name in owner/repo format, e.g. 'agno-agi/agno'",
);
const PR_NUMBER: (&str, &str, &str) = ("pr_number", "integer", "Pull request number");

/// Build an object schema from `(name, type, description)` triples.
fn schema(properties: &[(&str, &str, &str)], required: &[&str]) -> Value {
    let props: Map<String, Value> = properties
        .iter()
        .map(|(name, kind, description)| {
            (
                name.to_string(),
                json!({"type": kind, "description": description}),
            )
        })
        .collect();
    json!({"type": "object", "properties": props, "required": required})
}

/// Toolset backed by the GitHub REST client.
pub struct GithubToolset {
    client: Arc<GithubClient>,
    directories: SafeDirectoryListing,
}

impl GithubToolset {
    pub fn new(client: Arc<GithubClient>) -> Self {
        let directories = SafeDirectoryListing::new(client.clone());
        Self {
            client,
            directories,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[async_trait]
impl Toolset for GithubToolset {
    fn name(&self) -> &str {
        "github"
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::function(
                "get_repository",
                "Get details of a repository: description, stars, forks, language, license, default branch.",
                schema(&[REPO_NAME], &["repo_name"]),
            ),
            ToolDefinition::function(
                "search_repositories",
                "Search GitHub repositories by keyword. Does not need a repo_name.",
                schema(
                    &[
                        ("query", "string", "Search query, e.g. 'agent framework language:python'"),
                        ("sort", "string", "Sort field: stars, forks, or updated (default: stars)"),
                        ("order", "string", "asc or desc (default: desc)"),
                        ("per_page", "integer", "Number of results (default: 5, max: 100)"),
                    ],
                    &["query"],
                ),
            ),
            ToolDefinition::function(
                "get_pull_request",
                "Get a single pull request.",
                schema(&[REPO_NAME, PR_NUMBER], &["repo_name", "pr_number"]),
            ),
            ToolDefinition::function(
                "get_pull_request_changes",
                "Get the files changed by a pull request, with patches.",
                schema(&[REPO_NAME, PR_NUMBER], &["repo_name", "pr_number"]),
            ),
            ToolDefinition::function(
                "list_branches",
                "List the branches of a repository.",
                schema(&[REPO_NAME], &["repo_name"]),
            ),
            ToolDefinition::function(
                "get_pull_request_count",
                "Count pull requests, optionally filtered by state, author, base, or head branch.",
                schema(
                    &[
                        REPO_NAME,
                        ("state", "string", "open, closed, merged, or all (default: all)"),
                        ("author", "string", "Only PRs opened by this login"),
                        ("base", "string", "Only PRs targeting this branch"),
                        ("head", "string", "Only PRs from this branch"),
                    ],
                    &["repo_name"],
                ),
            ),
            ToolDefinition::function(
                "get_pull_requests",
                "List pull requests.",
                schema(
                    &[
                        REPO_NAME,
                        ("state", "string", "open, closed, or all (default: open)"),
                        ("sort", "string", "created, updated, popularity, or long-running (default: created)"),
                        ("direction", "string", "asc or desc (default: desc)"),
                        ("limit", "integer", "Maximum number of PRs (default: 20)"),
                    ],
                    &["repo_name"],
                ),
            ),
            ToolDefinition::function(
                "get_pull_request_comments",
                "Get the review comments on a pull request.",
                schema(&[REPO_NAME, PR_NUMBER], &["repo_name", "pr_number"]),
            ),
            ToolDefinition::function(
                "get_pull_request_with_details",
                "Get a pull request together with its changed files and review comments.",
                schema(&[REPO_NAME, PR_NUMBER], &["repo_name", "pr_number"]),
            ),
            ToolDefinition::function(
                "list_issues",
                "List issues (pull requests excluded).",
                schema(
                    &[
                        REPO_NAME,
                        ("state", "string", "open, closed, or all (default: open)"),
                        ("limit", "integer", "Maximum number of issues (default: 20)"),
                    ],
                    &["repo_name"],
                ),
            ),
            ToolDefinition::function(
                "get_issue",
                "Get a single issue.",
                schema(
                    &[REPO_NAME, ("issue_number", "integer", "Issue number")],
                    &["repo_name", "issue_number"],
                ),
            ),
            ToolDefinition::function(
                "update_file",
                "Create or update a file with a single commit.",
                schema(
                    &[
                        REPO_NAME,
                        ("path", "string", "File path inside the repository"),
                        ("content", "string", "New file content"),
                        ("message", "string", "Commit message"),
                        ("branch", "string", "Branch to commit to (default branch if omitted)"),
                    ],
                    &["repo_name", "path", "content", "message"],
                ),
            ),
            ToolDefinition::function(
                "get_file_content",
                "Get the contents of a file, e.g. README.md or pyproject.toml.",
                schema(
                    &[
                        REPO_NAME,
                        ("path", "string", "File path inside the repository"),
                        ("ref", "string", "Branch, tag, or commit (default branch if omitted)"),
                    ],
                    &["repo_name", "path"],
                ),
            ),
            ToolDefinition::function(
                "get_directory_content",
                "List a directory. Each entry has name, path, type (file or dir), size, and url. Use '' for the root.",
                schema(
                    &[
                        REPO_NAME,
                        ("path", "string", "Directory path inside the repository ('' for root)"),
                        ("ref", "string", "Branch, tag, or commit (default branch if omitted)"),
                    ],
                    &["repo_name", "path"],
                ),
            ),
            ToolDefinition::function(
                "search_code",
                "Search code across GitHub. Narrow with repo, language, path, or filename.",
                schema(
                    &[
                        ("query", "string", "Text to search for"),
                        ("language", "string", "Language filter, e.g. python"),
                        ("repo", "string", "Restrict to one repository (owner/repo)"),
                        ("user", "string", "Restrict to one user or organization"),
                        ("path", "string", "Restrict to a path prefix"),
                        ("filename", "string", "Restrict to a file name"),
                    ],
                    &["query"],
                ),
            ),
        ]
    }

    fn provides(&self, tool: &str) -> bool {
        GITHUB_TOOL_NAMES.contains(&tool)
    }

    async fn call(&self, tool: &str, args: &Value) -> Result<String> {
        let client = &self.client;
        match tool {
            "get_repository" => {
                to_json(&client.get_repository(required_str(args, "repo_name")?).await?)
            }
            "search_repositories" => {
                let results = client
                    .search_repositories(
                        required_str(args, "query")?,
                        optional_str(args, "sort").unwrap_or("stars"),
                        optional_str(args, "order").unwrap_or("desc"),
                        optional_count(args, "per_page", u32::MAX).unwrap_or(5),
                    )
                    .await?;
                to_json(&results)
            }
            "get_pull_request" => to_json(
                &client
                    .get_pull_request(required_str(args, "repo_name")?, required_u64(args, "pr_number")?)
                    .await?,
            ),
            "get_pull_request_changes" => to_json(
                &client
                    .get_pull_request_changes(
                        required_str(args, "repo_name")?,
                        required_u64(args, "pr_number")?,
                    )
                    .await?,
            ),
            "list_branches" => {
                to_json(&client.list_branches(required_str(args, "repo_name")?).await?)
            }
            "get_pull_request_count" => {
                let filters = PullRequestCountFilters {
                    state: optional_str(args, "state").map(String::from),
                    author: optional_str(args, "author").map(String::from),
                    base: optional_str(args, "base").map(String::from),
                    head: optional_str(args, "head").map(String::from),
                };
                let count = client
                    .get_pull_request_count(required_str(args, "repo_name")?, &filters)
                    .await?;
                to_json(&json!({ "count": count }))
            }
            "get_pull_requests" => to_json(
                &client
                    .get_pull_requests(
                        required_str(args, "repo_name")?,
                        optional_str(args, "state").unwrap_or("open"),
                        optional_str(args, "sort").unwrap_or("created"),
                        optional_str(args, "direction").unwrap_or("desc"),
                        optional_count(args, "limit", usize::MAX).unwrap_or(20),
                    )
                    .await?,
            ),
            "get_pull_request_comments" => to_json(
                &client
                    .get_pull_request_comments(
                        required_str(args, "repo_name")?,
                        required_u64(args, "pr_number")?,
                    )
                    .await?,
            ),
            "get_pull_request_with_details" => to_json(
                &client
                    .get_pull_request_with_details(
                        required_str(args, "repo_name")?,
                        required_u64(args, "pr_number")?,
                    )
                    .await?,
            ),
            "list_issues" => to_json(
                &client
                    .list_issues(
                        required_str(args, "repo_name")?,
                        optional_str(args, "state").unwrap_or("open"),
                        optional_count(args, "limit", usize::MAX).unwrap_or(20),
                    )
                    .await?,
            ),
            "get_issue" => to_json(
                &client
                    .get_issue(required_str(args, "repo_name")?, required_u64(args, "issue_number")?)
                    .await?,
            ),
            "update_file" => {
                let content = args
                    .get("content")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("Missing required parameter: content"))?;
                let update = client
                    .update_file(
                        required_str(args, "repo_name")?,
                        required_str(args, "path")?,
                        content,
                        required_str(args, "message")?,
                        optional_str(args, "branch"),
                    )
                    .await?;
                to_json(&update)
            }
            "get_file_content" => Ok(client
                .get_file_content(
                    required_str(args, "repo_name")?,
                    required_str(args, "path")?,
                    optional_str(args, "ref"),
                )
                .await?),
            "get_directory_content" => {
                let path = args.get("path").and_then(Value::as_str).unwrap_or("");
                let entries = self
                    .directories
                    .get_directory_content(
                        required_str(args, "repo_name")?,
                        path,
                        args.get("ref").and_then(Value::as_str),
                    )
                    .await?;
                to_json(&entries)
            }
            "search_code" => {
                let filters = CodeSearchFilters {
                    language: optional_str(args, "language").map(String::from),
                    repo: optional_str(args, "repo").map(String::from),
                    user: optional_str(args, "user").map(String::from),
                    path: optional_str(args, "path").map(String::from),
                    filename: optional_str(args, "filename").map(String::from),
                };
                to_json(&client.search_code(required_str(args, "query")?, &filters).await?)
            }
            _ => Err(anyhow!("Unknown tool: {}", tool)),
        }
    }
}
