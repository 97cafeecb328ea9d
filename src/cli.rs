//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::RepoId;
use crate::router::EntryPoint;
use clap::Parser;
use std::path::PathBuf;

/// RepoLens - chat with GitHub repositories
///
/// Ask questions about any GitHub repository. A router sends each question
/// to a GitHub data agent or a reasoning agent backed by Groq-hosted models.
/// Requires GROQ_API_KEY and GITHUB_ACCESS_TOKEN (a .env file works).
///
/// Examples:
///   repolens
///   repolens --repo agno-agi/agno
///   repolens --ask "Summarize 'agno-agi/agno' repo"
///   repolens --agent data --ask "List open PRs in facebook/react"
///   repolens --session chat.json --transcript chat.md
///   repolens --check
///   repolens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Ask a single question, print the answer, and exit
    #[arg(short, long, value_name = "TEXT", conflicts_with = "check")]
    pub ask: Option<String>,

    /// Which agents answer: the routed team, or one agent directly
    #[arg(long, default_value = "team", value_name = "AGENT")]
    pub agent: AgentChoice,

    /// Repository to start with (owner/repo)
    #[arg(short, long, value_name = "OWNER/REPO")]
    pub repo: Option<String>,

    /// Load the conversation from this JSON file (if present) and save it back on exit
    ///
    /// Relative names resolve against the session storage directory.
    #[arg(short, long, value_name = "FILE")]
    pub session: Option<PathBuf>,

    /// Write a transcript of the conversation to this file on exit
    #[arg(short, long, value_name = "FILE")]
    pub transcript: Option<PathBuf>,

    /// Transcript format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Check GitHub and model connectivity, then exit
    #[arg(long)]
    pub check: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .repolens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Model for the router and the GitHub agent
    #[arg(long, value_name = "MODEL", env = "REPOLENS_PRIMARY_MODEL")]
    pub primary_model: Option<String>,

    /// Model for the reasoning agent
    #[arg(long, value_name = "MODEL", env = "REPOLENS_REASONING_MODEL")]
    pub reasoning_model: Option<String>,

    /// OpenAI-compatible API base URL for both models
    #[arg(long, value_name = "URL", env = "REPOLENS_BASE_URL")]
    pub base_url: Option<String>,

    /// GitHub API root (for GitHub Enterprise)
    #[arg(long, value_name = "URL", env = "GITHUB_API_URL")]
    pub github_api_url: Option<String>,

    /// Maximum model round-trips per agent run
    #[arg(long, value_name = "NUM")]
    pub max_tool_iterations: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .repolens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Transcript format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Agent selection for --agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AgentChoice {
    /// Route between both agents (default)
    #[default]
    Team,
    /// GitHub data agent only
    Data,
    /// Reasoning agent only (still delegates data requests)
    Reasoning,
}

impl From<AgentChoice> for EntryPoint {
    fn from(choice: AgentChoice) -> Self {
        match choice {
            AgentChoice::Team => EntryPoint::Team,
            AgentChoice::Data => EntryPoint::Data,
            AgentChoice::Reasoning => EntryPoint::Reasoning,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The starting repository, if one was given.
    pub fn repo_id(&self) -> anyhow::Result<Option<RepoId>> {
        self.repo.as_deref().map(str::parse).transpose()
    }

    /// Whether the interactive chat loop will run.
    pub fn is_interactive(&self) -> bool {
        self.ask.is_none() && !self.check && !self.init_config
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref question) = self.ask {
            if question.trim().is_empty() {
                return Err("--ask needs a non-empty question".to_string());
            }
        }

        if let Err(e) = self.repo_id() {
            return Err(format!("Invalid --repo: {}", e));
        }

        for (flag, url) in [
            ("--base-url", &self.base_url),
            ("--github-api-url", &self.github_api_url),
        ] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!("{} must start with 'http://' or 'https://'", flag));
                }
            }
        }

        if self.max_tool_iterations == Some(0) {
            return Err("Max tool iterations must be at least 1".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// The chat loop only shows warnings so log lines don't bury the answers.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else if self.is_interactive() {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}
