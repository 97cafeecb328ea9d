//! Data models for conversations.
//!
//! This module contains the structures shared by the agents, the router,
//! the session, and transcript export.

use crate::llm::{ChatMessage, Role};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A GitHub repository identity in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn valid_owner(owner: &str) -> bool {
        !owner.is_empty()
            && owner.len() <= 39
            && !owner.starts_with('-')
            && !owner.ends_with('-')
            && owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    }

    fn valid_name(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= 100
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }
}

impl FromStr for RepoId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches(".git");
        let Some((owner, name)) = trimmed.split_once('/') else {
            bail!("'{}' is not in owner/repo format", s);
        };
        if !Self::valid_owner(owner) || !Self::valid_name(name) {
            bail!("'{}' is not a valid owner/repo name", s);
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl TryFrom<String> for RepoId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RepoId> for String {
    fn from(repo: RepoId) -> Self {
        repo.to_string()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Record of one capability invocation during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub tool_name: String,
    pub tool_args: Value,
    /// Text handed back to the model (error text on failure).
    pub content: Option<String>,
    pub success: bool,
    pub elapsed_ms: u64,
}

impl ToolExecution {
    /// Tool name formatted for display, e.g. `get_file_content` → `Get File Content`.
    pub fn display_name(&self) -> String {
        self.tool_name
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A user-visible message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolExecution>>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolExecution>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
            timestamp: Utc::now(),
        }
    }

    /// The model-facing form; tool records stay out of the prompt.
    pub fn to_chat(&self) -> ChatMessage {
        match self.role {
            Role::User => ChatMessage::user(self.content.clone()),
            _ => ChatMessage::assistant(self.content.clone()),
        }
    }
}

/// The last `window` user/assistant messages of a history, as chat messages.
pub fn history_window(history: &[HistoryMessage], window: usize) -> Vec<ChatMessage> {
    let relevant: Vec<&HistoryMessage> = history
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        .collect();
    let skip = relevant.len().saturating_sub(window);
    relevant.into_iter().skip(skip).map(HistoryMessage::to_chat).collect()
}

/// The two member agents a turn can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Member {
    Data,
    Reasoning,
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Data => write!(f, "GitHub Agent"),
            Member::Reasoning => write!(f, "Reasoning Agent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repo_id_parse() {
        let repo: RepoId = "agno-agi/agno".parse().unwrap();
        assert_eq!(repo.owner(), "agno-agi");
        assert_eq!(repo.name(), "agno");
        assert_eq!(repo.to_string(), "agno-agi/agno");

        let repo: RepoId = "vercel/next.js".parse().unwrap();
        assert_eq!(repo.name(), "next.js");

        assert!("agno".parse::<RepoId>().is_err());
        assert!("-bad/repo".parse::<RepoId>().is_err());
        assert!("owner/re po".parse::<RepoId>().is_err());
        assert!("a/b/c".parse::<RepoId>().is_err());
    }

    #[test]
    fn test_repo_id_serde_as_string() {
        let repo: RepoId = "facebook/react".parse().unwrap();
        assert_eq!(serde_json::to_value(&repo).unwrap(), json!("facebook/react"));
        let back: RepoId = serde_json::from_value(json!("facebook/react")).unwrap();
        assert_eq!(back, repo);
        assert!(serde_json::from_value::<RepoId>(json!("nope")).is_err());
    }

    #[test]
    fn test_tool_display_name() {
        let exec = ToolExecution {
            tool_name: "get_directory_content".into(),
            tool_args: json!({}),
            content: None,
            success: true,
            elapsed_ms: 0,
        };
        assert_eq!(exec.display_name(), "Get Directory Content");
    }

    #[test]
    fn test_history_window() {
        let history: Vec<HistoryMessage> = (0..6)
            .map(|i| {
                if i % 2 == 0 {
                    HistoryMessage::user(format!("q{}", i))
                } else {
                    HistoryMessage::assistant(format!("a{}", i), vec![])
                }
            })
            .collect();

        let window = history_window(&history, 3);
        let contents: Vec<_> = window.iter().filter_map(|m| m.content.clone()).collect();
        assert_eq!(contents, vec!["a3", "q4", "a5"]);
        assert_eq!(window[0].role, Role::Assistant);
        assert_eq!(history_window(&history, 0).len(), 0);
    }

    #[test]
    fn test_member_display() {
        assert_eq!(Member::Data.to_string(), "GitHub Agent");
        assert_eq!(Member::Reasoning.to_string(), "Reasoning Agent");
    }
}
