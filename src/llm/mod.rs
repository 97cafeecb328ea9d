//! Chat-completion model binding.
//!
//! Agents talk to models only through the [`ChatModel`] trait so that runs
//! can be driven by scripted models in tests.

pub mod client;

pub use client::OpenAiCompatClient;

use crate::agent::tools::ToolDefinition;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A capability invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Message in a model conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn that requested tool calls.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Result of one tool call, answered back to the model.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// What a model produced for one completion: text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }
}

/// A chat-completion endpoint.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs and transcripts.
    fn id(&self) -> &str;

    /// Run one completion over `messages`, offering `tools`.
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition])
        -> Result<ModelReply>;
}

#[cfg(test)]
pub mod testing {
    //! Scripted model for agent and router tests.

    use super::*;
    use std::sync::Mutex;

    /// Replays canned replies in order and records every request.
    pub struct ScriptedModel {
        replies: Mutex<Vec<ModelReply>>,
        pub requests: Mutex<Vec<Vec<ChatMessage>>>,
        pub offered_tools: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<ModelReply>) -> Self {
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
                offered_tools: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        /// Last user message of the n-th request.
        pub fn user_message(&self, n: usize) -> Option<String> {
            self.requests.lock().unwrap().get(n).and_then(|messages| {
                messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .and_then(|m| m.content.clone())
            })
        }

        /// System prompt of the n-th request.
        pub fn system_prompt(&self, n: usize) -> Option<String> {
            self.requests.lock().unwrap().get(n).and_then(|messages| {
                messages
                    .iter()
                    .find(|m| m.role == Role::System)
                    .and_then(|m| m.content.clone())
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            tools: &[ToolDefinition],
        ) -> Result<ModelReply> {
            self.requests.lock().unwrap().push(messages.to_vec());
            self.offered_tools
                .lock()
                .unwrap()
                .push(tools.iter().map(|t| t.function.name.clone()).collect());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(ModelReply::default())
            } else {
                Ok(replies.remove(0))
            }
        }
    }
}
