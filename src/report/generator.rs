//! Conversation transcript generation.
//!
//! Renders a session's history as a Markdown document or as JSON.

use crate::cli::OutputFormat;
use crate::llm::Role;
use crate::models::{HistoryMessage, ToolExecution};
use crate::router::EntryPoint;
use crate::session::Session;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Longest tool result reproduced in a Markdown transcript.
const MAX_RESULT_CHARS: usize = 2000;

/// Metadata about an exported conversation.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptMetadata {
    pub repository: Option<String>,
    pub started_at: DateTime<Utc>,
    pub exported_at: DateTime<Utc>,
    pub entry_point: String,
    pub primary_model: String,
    pub reasoning_model: String,
    pub message_count: usize,
    pub tool_call_count: usize,
}

/// A conversation ready to be rendered.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub metadata: TranscriptMetadata,
    pub messages: Vec<HistoryMessage>,
}

impl Transcript {
    pub fn from_session(session: &Session) -> Self {
        let messages = session.history().to_vec();
        let entry_point = match session.entry() {
            EntryPoint::Team => "team",
            EntryPoint::Data => "data",
            EntryPoint::Reasoning => "reasoning",
        };
        let team = session.team();

        Self {
            metadata: TranscriptMetadata {
                repository: session.repo().map(|r| r.to_string()),
                started_at: session.started_at(),
                exported_at: Utc::now(),
                entry_point: entry_point.to_string(),
                primary_model: team.data.model_id().to_string(),
                reasoning_model: team.reasoning.model_id().to_string(),
                message_count: messages.len(),
                tool_call_count: count_tool_calls(&messages),
            },
            messages,
        }
    }
}

fn count_tool_calls(messages: &[HistoryMessage]) -> usize {
    messages
        .iter()
        .filter_map(|m| m.tool_calls.as_ref())
        .map(Vec::len)
        .sum()
}

/// Generate a Markdown transcript.
pub fn generate_markdown_transcript(transcript: &Transcript) -> String {
    let mut output = String::new();

    output.push_str("# RepoLens Conversation\n\n");
    output.push_str(&generate_metadata_section(&transcript.metadata));
    output.push_str(&generate_conversation_section(&transcript.messages));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &TranscriptMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    if let Some(ref repo) = metadata.repository {
        section.push_str(&format!(
            "- **Repository:** [{}](https://github.com/{})\n",
            repo, repo
        ));
    }
    section.push_str(&format!(
        "- **Started:** {}\n",
        metadata.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Exported:** {}\n",
        metadata.exported_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Agents:** {}\n", metadata.entry_point));
    section.push_str(&format!("- **Primary Model:** `{}`\n", metadata.primary_model));
    section.push_str(&format!(
        "- **Reasoning Model:** `{}`\n",
        metadata.reasoning_model
    ));
    section.push_str(&format!("- **Messages:** {}\n", metadata.message_count));
    section.push_str(&format!("- **Tool Calls:** {}\n", metadata.tool_call_count));
    section.push('\n');

    section
}

fn generate_conversation_section(messages: &[HistoryMessage]) -> String {
    let mut section = String::new();

    section.push_str("## Conversation\n\n");

    if messages.is_empty() {
        section.push_str("*No messages yet.*\n\n");
        return section;
    }

    for message in messages {
        section.push_str(&generate_message_block(message));
    }

    section
}

fn generate_message_block(message: &HistoryMessage) -> String {
    let mut block = String::new();

    let speaker = match message.role {
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::System => "System",
        Role::Tool => "Tool",
    };
    block.push_str(&format!(
        "### {} ({})\n\n",
        speaker,
        message.timestamp.format("%H:%M:%S")
    ));

    if let Some(ref tools) = message.tool_calls {
        for tool in tools {
            block.push_str(&generate_tool_block(tool));
        }
    }

    block.push_str(message.content.trim());
    block.push_str("\n\n---\n\n");

    block
}

fn generate_tool_block(tool: &ToolExecution) -> String {
    let mut block = String::new();

    let status = if tool.success { "" } else { " (failed)" };
    block.push_str(&format!(
        "<details>\n<summary>{} ({:.3}s){}</summary>\n\n",
        tool.display_name(),
        tool.elapsed_ms as f64 / 1000.0,
        status
    ));

    let has_args = tool
        .tool_args
        .as_object()
        .map(|args| !args.is_empty())
        .unwrap_or(false);
    if has_args {
        block.push_str("**Arguments:**\n\n```json\n");
        block.push_str(
            &serde_json::to_string_pretty(&tool.tool_args).unwrap_or_else(|_| tool.tool_args.to_string()),
        );
        block.push_str("\n```\n\n");
    }

    if let Some(ref content) = tool.content {
        block.push_str("**Result:**\n\n```\n");
        block.push_str(&truncate(content, MAX_RESULT_CHARS));
        block.push_str("\n```\n\n");
    }

    block.push_str("</details>\n\n");
    block
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n... ({} more characters)", &text[..cut], text[cut..].chars().count()),
        None => text.to_string(),
    }
}

fn generate_footer() -> String {
    "*Transcript exported by RepoLens*\n".to_string()
}

/// Generate a JSON transcript.
pub fn generate_json_transcript(transcript: &Transcript) -> Result<String> {
    serde_json::to_string_pretty(transcript).map_err(Into::into)
}

/// Render `transcript` in `format` and write it to `path`.
pub fn write_transcript(transcript: &Transcript, path: &Path, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Markdown => generate_markdown_transcript(transcript),
        OutputFormat::Json => generate_json_transcript(transcript)?,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write transcript to {}", path.display()))?;

    Ok(())
}
