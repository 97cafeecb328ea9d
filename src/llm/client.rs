//! OpenAI-compatible chat-completion client (Groq by default).

use crate::agent::tools::ToolDefinition;
use crate::config::ModelConfig;
use crate::llm::{ChatMessage, ChatModel, ModelReply, Role, ToolCall};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunction,
}

/// OpenAI encodes tool arguments as a JSON string.
#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let tool_calls = if message.tool_calls.is_empty() {
            None
        } else {
            Some(
                message
                    .tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        call_type: function_type(),
                        function: WireFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect(),
            )
        };

        Self {
            role: message.role,
            content: message.content.clone(),
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

/// Client for any `/chat/completions` endpoint speaking the OpenAI dialect.
pub struct OpenAiCompatClient {
    config: ModelConfig,
    api_key: String,
    http_client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(config: ModelConfig, api_key: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            api_key: api_key.to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    fn id(&self) -> &str {
        &self.config.name
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: &self.config.name,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        debug!(
            "Sending chat request to {} with {} messages and {} tools",
            self.config.name,
            messages.len(),
            tools.len()
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!(
                        "Request to {} timed out after {}s",
                        self.config.name,
                        self.config.timeout_seconds
                    )
                } else if e.is_connect() {
                    anyhow!("Cannot connect to model API at {}", self.config.base_url)
                } else {
                    anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(anyhow!("Model API rate limit reached: {}", body));
            }
            return Err(anyhow!("Model API error {}: {}", status, body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| anyhow!("Model API returned no choices"))?;

        Ok(into_reply(message))
    }
}

fn into_reply(message: WireMessage) -> ModelReply {
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let arguments = if call.function.arguments.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&call.function.arguments).unwrap_or_else(|_| {
                    warn!(
                        "Tool call {} carried non-JSON arguments",
                        call.function.name
                    );
                    Value::String(call.function.arguments.clone())
                })
            };
            ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            }
        })
        .collect();

    ModelReply {
        content: message.content.map(|c| strip_thinking(&c)),
        tool_calls,
    }
}

/// Drop `<think>...</think>` blocks reasoning models prepend to answers.
pub fn strip_thinking(content: &str) -> String {
    static THINK: OnceLock<Regex> = OnceLock::new();
    let re = THINK.get_or_init(|| Regex::new(r"(?s)<think>.*?(</think>|$)").expect("valid regex"));
    re.replace_all(content, "").trim().to_string()
}
