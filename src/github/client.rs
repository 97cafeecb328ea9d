//! GitHub REST API client.
//!
//! A thin `reqwest` wrapper around the endpoints the data agent uses.
//! Every call maps non-2xx answers onto [`GithubError`] so callers can tell
//! a bad ref from a missing repository from an exhausted rate limit.

use crate::config::GithubConfig;
use crate::github::error::{GithubError, GithubResult};
use crate::github::types::{
    AuthenticatedUser, Branch, CodeSearchItem, DirectoryEntry, FileUpdate, Issue, PullRequest,
    PullRequestDetails, PullRequestFile, RateLimit, RawContent, Repository, ReviewComment,
    SearchResults,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Message GitHub returns when a `ref` query parameter names nothing.
const NO_COMMIT_FOR_REF: &str = "No commit found for the ref";

/// The contents endpoint answers with an array for directories and an
/// object for files.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Contents {
    Directory(Vec<RawContent>),
    File(Box<RawContent>),
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    content: UpdatedContent,
    commit: UpdatedCommit,
}

#[derive(Debug, Deserialize)]
struct UpdatedContent {
    path: String,
}

#[derive(Debug, Deserialize)]
struct UpdatedCommit {
    sha: String,
}

/// Filters accepted by `search_code`.
#[derive(Debug, Clone, Default)]
pub struct CodeSearchFilters {
    pub language: Option<String>,
    pub repo: Option<String>,
    pub user: Option<String>,
    pub path: Option<String>,
    pub filename: Option<String>,
}

/// Filters accepted by `get_pull_request_count`.
#[derive(Debug, Clone, Default)]
pub struct PullRequestCountFilters {
    pub state: Option<String>,
    pub author: Option<String>,
    pub base: Option<String>,
    pub head: Option<String>,
}

/// Authenticated GitHub REST client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http_client: reqwest::Client,
    api_url: String,
    per_page: u32,
}

impl GithubClient {
    /// Create a client authenticated with a personal access token.
    pub fn new(config: &GithubConfig, token: &str) -> GithubResult<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| GithubError::Unauthorized("token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("repolens/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            per_page: config.per_page.clamp(1, 100),
        })
    }

    /// Fetch repository metadata.
    pub async fn get_repository(&self, repo_name: &str) -> GithubResult<Repository> {
        let url = self.repo_endpoint(repo_name, &[])?;
        self.get_json(url, &[]).await
    }

    /// Search repositories by free-text query.
    pub async fn search_repositories(
        &self,
        query: &str,
        sort: &str,
        order: &str,
        per_page: u32,
    ) -> GithubResult<SearchResults<Repository>> {
        let url = self.endpoint(&["search", "repositories"])?;
        self.get_json(
            url,
            &[
                ("q", query.to_string()),
                ("sort", sort.to_string()),
                ("order", order.to_string()),
                ("per_page", per_page.clamp(1, 100).to_string()),
            ],
        )
        .await
    }

    pub async fn get_pull_request(&self, repo_name: &str, number: u64) -> GithubResult<PullRequest> {
        let url = self.repo_endpoint(repo_name, &["pulls", &number.to_string()])?;
        self.get_json(url, &[]).await
    }

    /// Files changed by a pull request, including patches.
    pub async fn get_pull_request_changes(
        &self,
        repo_name: &str,
        number: u64,
    ) -> GithubResult<Vec<PullRequestFile>> {
        let url = self.repo_endpoint(repo_name, &["pulls", &number.to_string(), "files"])?;
        self.get_json(url, &[("per_page", "100".to_string())]).await
    }

    pub async fn get_pull_request_comments(
        &self,
        repo_name: &str,
        number: u64,
    ) -> GithubResult<Vec<ReviewComment>> {
        let url = self.repo_endpoint(repo_name, &["pulls", &number.to_string(), "comments"])?;
        self.get_json(url, &[("per_page", "100".to_string())]).await
    }

    pub async fn get_pull_request_with_details(
        &self,
        repo_name: &str,
        number: u64,
    ) -> GithubResult<PullRequestDetails> {
        let pull_request = self.get_pull_request(repo_name, number).await?;
        let files = self.get_pull_request_changes(repo_name, number).await?;
        let comments = self.get_pull_request_comments(repo_name, number).await?;
        Ok(PullRequestDetails {
            pull_request,
            files,
            comments,
        })
    }

    pub async fn get_pull_requests(
        &self,
        repo_name: &str,
        state: &str,
        sort: &str,
        direction: &str,
        limit: usize,
    ) -> GithubResult<Vec<PullRequest>> {
        let url = self.repo_endpoint(repo_name, &["pulls"])?;
        let mut pulls: Vec<PullRequest> = self
            .get_json(
                url,
                &[
                    ("state", state.to_string()),
                    ("sort", sort.to_string()),
                    ("direction", direction.to_string()),
                    ("per_page", limit.clamp(1, 100).to_string()),
                ],
            )
            .await?;
        pulls.truncate(limit);
        Ok(pulls)
    }

    /// Count pull requests through the issue search API.
    pub async fn get_pull_request_count(
        &self,
        repo_name: &str,
        filters: &PullRequestCountFilters,
    ) -> GithubResult<u64> {
        let (owner, name) = split_repo(repo_name)?;
        let mut query = format!("repo:{}/{} is:pr", owner, name);
        match filters.state.as_deref() {
            Some("open") => query.push_str(" state:open"),
            Some("closed") => query.push_str(" state:closed"),
            Some("merged") => query.push_str(" is:merged"),
            _ => {}
        }
        for (qualifier, value) in [
            ("author", &filters.author),
            ("base", &filters.base),
            ("head", &filters.head),
        ] {
            if let Some(value) = value {
                query.push_str(&format!(" {}:{}", qualifier, value));
            }
        }

        let url = self.endpoint(&["search", "issues"])?;
        let results: SearchResults<Value> = self
            .get_json(url, &[("q", query), ("per_page", "1".to_string())])
            .await?;
        Ok(results.total_count)
    }

    pub async fn list_branches(&self, repo_name: &str) -> GithubResult<Vec<Branch>> {
        let url = self.repo_endpoint(repo_name, &["branches"])?;
        self.get_json(url, &[("per_page", "100".to_string())]).await
    }

    /// List issues, skipping the pull requests the issues endpoint mixes in.
    pub async fn list_issues(
        &self,
        repo_name: &str,
        state: &str,
        limit: usize,
    ) -> GithubResult<Vec<Issue>> {
        let url = self.repo_endpoint(repo_name, &["issues"])?;
        let issues: Vec<Issue> = self
            .get_json(
                url,
                &[
                    ("state", state.to_string()),
                    ("per_page", self.per_page.max(limit.min(100) as u32).to_string()),
                ],
            )
            .await?;
        Ok(issues
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .take(limit)
            .collect())
    }

    pub async fn get_issue(&self, repo_name: &str, number: u64) -> GithubResult<Issue> {
        let url = self.repo_endpoint(repo_name, &["issues", &number.to_string()])?;
        self.get_json(url, &[]).await
    }

    /// Fetch and decode a file's contents.
    pub async fn get_file_content(
        &self,
        repo_name: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GithubResult<String> {
        if let Some(r) = git_ref {
            validate_ref(r)?;
        }
        match self.get_contents(repo_name, path, git_ref).await? {
            Contents::File(file) => decode_file(&file),
            Contents::Directory(_) => Err(GithubError::Decode(format!(
                "'{}' is a directory, not a file",
                path
            ))),
        }
    }

    /// List a directory at an optional ref.
    ///
    /// A ref that fails local validation, or that GitHub cannot resolve,
    /// yields [`GithubError::InvalidRef`].
    pub async fn get_directory_content(
        &self,
        repo_name: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GithubResult<Vec<DirectoryEntry>> {
        if let Some(r) = git_ref {
            validate_ref(r)?;
        }
        let raw = match self.get_contents(repo_name, path, git_ref).await {
            Err(GithubError::NotFound(message)) if message.contains(NO_COMMIT_FOR_REF) => {
                return Err(GithubError::InvalidRef(
                    git_ref.unwrap_or_default().to_string(),
                ));
            }
            other => other?,
        };
        Ok(into_entries(raw).iter().map(DirectoryEntry::from_raw).collect())
    }

    /// Raw directory items resolved against the default branch.
    pub async fn get_raw_directory(
        &self,
        repo_name: &str,
        path: &str,
    ) -> GithubResult<Vec<RawContent>> {
        Ok(into_entries(self.get_contents(repo_name, path, None).await?))
    }

    /// Create or update a file with a single commit.
    pub async fn update_file(
        &self,
        repo_name: &str,
        path: &str,
        content: &str,
        message: &str,
        branch: Option<&str>,
    ) -> GithubResult<FileUpdate> {
        if let Some(b) = branch {
            validate_ref(b)?;
        }

        let existing_sha = match self.get_contents(repo_name, path, branch).await {
            Ok(Contents::File(file)) => file.sha,
            Ok(Contents::Directory(_)) => {
                return Err(GithubError::Decode(format!("'{}' is a directory", path)))
            }
            Err(GithubError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
        });
        if let Some(sha) = &existing_sha {
            body["sha"] = json!(sha);
        }
        if let Some(b) = branch {
            body["branch"] = json!(b);
        }

        let url = self.contents_endpoint(repo_name, path)?;
        let response = self.send(self.http_client.put(url).json(&body)).await?;
        let updated: UpdateResponse = response
            .json()
            .await
            .map_err(|e| GithubError::Decode(e.to_string()))?;

        Ok(FileUpdate {
            path: updated.content.path,
            commit_sha: updated.commit.sha,
            created: existing_sha.is_none(),
        })
    }

    /// Search code with optional qualifiers.
    pub async fn search_code(
        &self,
        query: &str,
        filters: &CodeSearchFilters,
    ) -> GithubResult<SearchResults<CodeSearchItem>> {
        let mut q = query.to_string();
        for (qualifier, value) in [
            ("language", &filters.language),
            ("repo", &filters.repo),
            ("user", &filters.user),
            ("path", &filters.path),
            ("filename", &filters.filename),
        ] {
            if let Some(value) = value {
                q.push_str(&format!(" {}:{}", qualifier, value));
            }
        }

        let url = self.endpoint(&["search", "code"])?;
        self.get_json(url, &[("q", q), ("per_page", self.per_page.to_string())])
            .await
    }

    pub async fn authenticated_user(&self) -> GithubResult<AuthenticatedUser> {
        let url = self.endpoint(&["user"])?;
        self.get_json(url, &[]).await
    }

    pub async fn rate_limit(&self) -> GithubResult<RateLimit> {
        let url = self.endpoint(&["rate_limit"])?;
        self.get_json(url, &[]).await
    }

    async fn get_contents(
        &self,
        repo_name: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GithubResult<Contents> {
        let url = self.contents_endpoint(repo_name, path)?;
        let query: Vec<(&str, String)> = git_ref
            .map(|r| vec![("ref", r.to_string())])
            .unwrap_or_default();
        self.get_json(url, &query).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> GithubResult<T> {
        debug!("GET {}", url);
        let response = self.send(self.http_client.get(url).query(query)).await?;
        response
            .json()
            .await
            .map_err(|e| GithubError::Decode(e.to_string()))
    }

    async fn send(&self, request: RequestBuilder) -> GithubResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let remaining = header("x-ratelimit-remaining").and_then(|v| v.parse::<u64>().ok());
        let reset = header("x-ratelimit-reset").and_then(|v| v.parse::<i64>().ok());

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["message"].as_str().map(str::to_string))
            .unwrap_or(body);

        Err(classify_status(status.as_u16(), message, remaining, reset))
    }

    fn endpoint(&self, segments: &[&str]) -> GithubResult<Url> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| GithubError::Decode(format!("bad API URL {}: {}", self.api_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| GithubError::Decode(format!("bad API URL {}", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_endpoint(&self, repo_name: &str, rest: &[&str]) -> GithubResult<Url> {
        let (owner, name) = split_repo(repo_name)?;
        let mut segments = vec!["repos", owner, name];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    fn contents_endpoint(&self, repo_name: &str, path: &str) -> GithubResult<Url> {
        let mut segments = vec!["contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty() && *s != "."));
        self.repo_endpoint(repo_name, &segments)
    }
}

/// Split `owner/name`, rejecting anything else.
pub fn split_repo(repo_name: &str) -> GithubResult<(&str, &str)> {
    let trimmed = repo_name.trim().trim_end_matches(".git");
    match trimmed.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(GithubError::NotFound(format!(
            "repository '{}' (expected owner/repo)",
            repo_name
        ))),
    }
}

/// Reject refs git itself would refuse (`git check-ref-format`).
pub fn validate_ref(git_ref: &str) -> GithubResult<()> {
    let invalid = git_ref.trim().is_empty()
        || git_ref == "@"
        || git_ref.starts_with('/')
        || git_ref.ends_with('/')
        || git_ref.ends_with('.')
        || git_ref.ends_with(".lock")
        || git_ref.contains("..")
        || git_ref.contains("//")
        || git_ref.contains("@{")
        || git_ref
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c));

    if invalid {
        Err(GithubError::InvalidRef(git_ref.to_string()))
    } else {
        Ok(())
    }
}

/// Map a failed response onto the error taxonomy.
fn classify_status(
    status: u16,
    message: String,
    remaining: Option<u64>,
    reset: Option<i64>,
) -> GithubError {
    match status {
        401 => GithubError::Unauthorized(message),
        403 | 429 if remaining == Some(0) || message.to_lowercase().contains("rate limit") => {
            GithubError::RateLimited { reset }
        }
        404 => GithubError::NotFound(message),
        422 if message.contains(NO_COMMIT_FOR_REF) => GithubError::NotFound(message),
        _ => GithubError::Api { status, message },
    }
}

fn into_entries(contents: Contents) -> Vec<RawContent> {
    match contents {
        Contents::Directory(items) => items,
        Contents::File(file) => vec![*file],
    }
}

fn decode_file(file: &RawContent) -> GithubResult<String> {
    match (file.encoding.as_deref(), file.content.as_deref()) {
        (Some("base64"), Some(content)) => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = BASE64
                .decode(compact)
                .map_err(|e| GithubError::Decode(format!("{}: {}", file.path, e)))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        (_, Some(content)) if !content.is_empty() => Ok(content.to_string()),
        _ => Err(GithubError::Decode(format!(
            "{} is too large for the contents API ({} bytes)",
            file.path, file.size
        ))),
    }
}
