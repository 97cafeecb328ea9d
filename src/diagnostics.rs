//! Connectivity checks behind `--check`.
//!
//! Each step is independent apart from authentication: without a working
//! token nothing else is attempted.

use crate::agent::{build_team, RunInput};
use crate::config::{mask, Config, Credentials};
use crate::github::{GithubClient, SafeDirectoryListing};
use crate::models::RepoId;
use anyhow::Result;
use chrono::{TimeZone, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Repository probed when none is given.
pub const DEFAULT_PROBE_REPO: &str = "agno-agi/agno";

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckLine {
    pub step: &'static str,
    pub ok: bool,
    pub detail: String,
}

impl fmt::Display for CheckLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.ok { "✅" } else { "❌" };
        write!(f, "{} {}: {}", mark, self.step, self.detail)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub lines: Vec<CheckLine>,
    pub authenticated: bool,
}

impl CheckReport {
    fn record(&mut self, step: &'static str, ok: bool, detail: impl Into<String>) {
        let line = CheckLine {
            step,
            ok,
            detail: detail.into(),
        };
        if ok {
            debug!("{}", line);
        } else {
            warn!("{}", line);
        }
        self.lines.push(line);
    }

    /// Process exit code: 1 when GitHub rejected the token.
    pub fn exit_code(&self) -> i32 {
        if self.authenticated {
            0
        } else {
            1
        }
    }
}

/// Run every check against `probe`.
pub async fn run_checks(
    config: &Config,
    credentials: &Credentials,
    probe: &RepoId,
) -> Result<CheckReport> {
    let mut report = CheckReport::default();
    let repo_name = probe.to_string();

    report.record(
        "Credentials",
        true,
        format!(
            "GitHub token {}, Groq key {}",
            mask(&credentials.github_token),
            mask(&credentials.groq_api_key)
        ),
    );

    let client = Arc::new(GithubClient::new(&config.github, &credentials.github_token)?);

    match client.authenticated_user().await {
        Ok(user) => {
            report.authenticated = true;
            report.record("Authentication", true, format!("logged in as {}", user.login));
        }
        Err(e) => {
            report.record("Authentication", false, e.to_string());
            return Ok(report);
        }
    }

    match client.rate_limit().await {
        Ok(limit) => {
            let core = limit.resources.core;
            let reset = Utc
                .timestamp_opt(core.reset, 0)
                .single()
                .map(|t| t.format("%H:%M:%S UTC").to_string())
                .unwrap_or_else(|| core.reset.to_string());
            report.record(
                "Rate limit",
                core.remaining > 0,
                format!("{}/{} remaining, resets at {}", core.remaining, core.limit, reset),
            );
        }
        Err(e) => report.record("Rate limit", false, e.to_string()),
    }

    match client.get_repository(&repo_name).await {
        Ok(repo) => report.record(
            "Repository",
            true,
            format!(
                "{}: {}",
                repo.full_name,
                repo.description.as_deref().unwrap_or("(no description)")
            ),
        ),
        Err(e) => report.record("Repository", false, format!("{}: {}", repo_name, e)),
    }

    let listing = SafeDirectoryListing::new(client.clone());
    match listing.get_directory_content(&repo_name, "", None).await {
        Ok(entries) => {
            let preview: Vec<String> = entries
                .iter()
                .take(5)
                .map(|e| format!("{} ({})", e.path, e.kind))
                .collect();
            report.record(
                "Root directory",
                true,
                format!("{} items: {}", entries.len(), preview.join(", ")),
            );
        }
        Err(e) => report.record("Root directory", false, e.to_string()),
    }

    let query = format!("List the top-level directories in the repository {}", repo_name);
    let outcome = match build_team(config, credentials) {
        Ok(team) => team.data.run(RunInput::new(query)).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(response) => {
            let answer = response.content.unwrap_or_default();
            let preview: String = answer.chars().take(200).collect();
            let tools: Vec<&str> = response
                .tools
                .iter()
                .take(2)
                .map(|t| t.tool_name.as_str())
                .collect();
            report.record(
                "GitHub agent",
                !answer.trim().is_empty(),
                format!(
                    "{} tool call(s) [{}]: {}",
                    response.tools.len(),
                    tools.join(", "),
                    preview.replace('\n', " ")
                ),
            );
        }
        Err(e) => report.record("GitHub agent", false, format!("{:#}", e)),
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            groq_api_key: "gsk_0123456789".into(),
            github_token: "ghp_0123456789".into(),
        }
    }

    fn config_for(github: &MockServer, llm: &MockServer) -> Config {
        let mut config = Config::default();
        config.github.api_url = github.uri();
        config.models.primary.base_url = llm.uri();
        config.models.reasoning.base_url = llm.uri();
        config
    }

    #[tokio::test]
    async fn test_all_checks_pass() {
        let github = MockServer::start().await;
        let llm = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octocat"})))
            .mount(&github)
            .await;
        Mock::given(method("GET"))
            .and(path("/rate_limit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": {"core": {"limit": 5000, "remaining": 4999, "reset": 1700000000}}
            })))
            .mount(&github)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/agno-agi/agno"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "full_name": "agno-agi/agno",
                "description": "Agent framework",
                "html_url": "https://github.com/agno-agi/agno"
            })))
            .mount(&github)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/agno-agi/agno/contents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "libs", "path": "libs", "type": "dir", "size": 0,
                 "html_url": "https://github.com/agno-agi/agno/tree/main/libs"}
            ])))
            .mount(&github)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "libs/, cookbook/"}}]
            })))
            .mount(&llm)
            .await;

        let probe: RepoId = DEFAULT_PROBE_REPO.parse().unwrap();
        let report = run_checks(&config_for(&github, &llm), &credentials(), &probe)
            .await
            .unwrap();

        assert_eq!(report.exit_code(), 0);
        assert!(report.lines.iter().all(|l| l.ok), "{:?}", report.lines);
        let steps: Vec<&str> = report.lines.iter().map(|l| l.step).collect();
        assert_eq!(
            steps,
            vec![
                "Credentials",
                "Authentication",
                "Rate limit",
                "Repository",
                "Root directory",
                "GitHub agent"
            ]
        );
        assert!(report.lines[1].detail.contains("octocat"));
        assert!(report.lines[4].detail.contains("libs (dir)"));
        assert!(!report.lines[0].detail.contains("0123456789"));
    }

    #[tokio::test]
    async fn test_rejected_token_stops_early() {
        let github = MockServer::start().await;
        let llm = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .mount(&github)
            .await;

        let probe: RepoId = DEFAULT_PROBE_REPO.parse().unwrap();
        let report = run_checks(&config_for(&github, &llm), &credentials(), &probe)
            .await
            .unwrap();

        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.lines.len(), 2);
        assert!(report.lines[1].detail.contains("Bad credentials"));
        assert!(report.lines[1].to_string().starts_with("❌ Authentication"));
    }
}
