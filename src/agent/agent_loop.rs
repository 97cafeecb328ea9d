//! Agent run loop.
//!
//! An [`Agent`] pairs a model with a role, instructions, and toolsets. A
//! run sends the conversation to the model, executes whatever tool calls
//! come back (strictly in the order the model listed them), feeds the
//! results back, and repeats until the model answers in plain text.

use crate::agent::tools::{ToolDefinition, Toolset};
use crate::llm::{ChatMessage, ChatModel, ToolCall};
use crate::models::ToolExecution;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Static description of an agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub role: String,
    pub instructions: String,
    /// Maximum model round-trips that may request tools.
    pub max_iterations: usize,
    /// Log full model exchanges.
    pub debug_mode: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Agent".to_string(),
            role: String::new(),
            instructions: String::new(),
            max_iterations: 20,
            debug_mode: false,
        }
    }
}

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    ToolStarted {
        agent: String,
        tool_name: String,
        tool_args: Value,
    },
    ToolCompleted {
        agent: String,
        execution: ToolExecution,
    },
}

/// Input for one run.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    pub message: String,
    /// Prior conversation, oldest first.
    pub history: Vec<ChatMessage>,
    /// Shared context appended to the system prompt (e.g. the active repository).
    pub context: Option<String>,
    pub events: Option<UnboundedSender<RunEvent>>,
}

impl RunInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn with_events(mut self, events: Option<UnboundedSender<RunEvent>>) -> Self {
        self.events = events;
        self
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunResponse {
    /// Final text, if the model produced any.
    pub content: Option<String>,
    /// Every tool call made during the run, in order.
    pub tools: Vec<ToolExecution>,
}

/// A model plus the capabilities it may use.
pub struct Agent {
    config: AgentConfig,
    model: Arc<dyn ChatModel>,
    toolsets: Vec<Arc<dyn Toolset>>,
}

impl Agent {
    pub fn new(config: AgentConfig, model: Arc<dyn ChatModel>) -> Self {
        info!("Initializing {} with model {}", config.name, model.id());
        Self {
            config,
            model,
            toolsets: Vec::new(),
        }
    }

    pub fn with_toolset(mut self, toolset: Arc<dyn Toolset>) -> Self {
        self.add_toolset(toolset);
        self
    }

    pub fn add_toolset(&mut self, toolset: Arc<dyn Toolset>) {
        debug!("{}: adding toolset {}", self.config.name, toolset.name());
        self.toolsets.push(toolset);
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn model_id(&self) -> &str {
        self.model.id()
    }

    /// All tool definitions across toolsets.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.toolsets.iter().flat_map(|t| t.definitions()).collect()
    }

    /// Build the system prompt for a run.
    pub fn system_prompt(&self, context: Option<&str>) -> String {
        let mut prompt = format!("Your name is {}.\n", self.config.name);

        if !self.config.role.trim().is_empty() {
            prompt.push_str("\n<your_role>\n");
            prompt.push_str(self.config.role.trim());
            prompt.push_str("\n</your_role>\n");
        }

        prompt.push_str("\n<instructions>\n");
        prompt.push_str(self.config.instructions.trim());
        for extra in self.toolsets.iter().filter_map(|t| t.instructions()) {
            prompt.push_str("\n\n");
            prompt.push_str(extra.trim());
        }
        prompt.push_str("\n</instructions>\n");

        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            prompt.push_str("\n<context>\n");
            prompt.push_str(context.trim());
            prompt.push_str("\n</context>\n");
        }

        prompt.push_str("\nUse markdown to format your answers.\n");
        prompt
    }

    /// Run the agent to completion.
    ///
    /// Tool failures are reported back to the model as `Error: ...` tool
    /// results; only model-endpoint failures abort the run.
    pub async fn run(&self, input: RunInput) -> Result<RunResponse> {
        let mut messages = Vec::with_capacity(input.history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt(input.context.as_deref())));
        messages.extend(input.history.iter().cloned());
        messages.push(ChatMessage::user(input.message.clone()));

        let tools = self.tool_definitions();
        let mut executions = Vec::new();

        debug!("{}: run started: {}", self.config.name, input.message);

        for iteration in 0..self.config.max_iterations {
            debug!("{} iteration {}", self.config.name, iteration + 1);

            let reply = self.model.complete(&messages, &tools).await?;
            if self.config.debug_mode {
                debug!("{} reply: {:?}", self.config.name, reply);
            }

            if reply.tool_calls.is_empty() {
                info!(
                    "{} finished after {} tool call(s)",
                    self.config.name,
                    executions.len()
                );
                return Ok(RunResponse {
                    content: reply.content,
                    tools: executions,
                });
            }

            messages.push(ChatMessage::assistant_tool_calls(
                reply.content.clone(),
                reply.tool_calls.clone(),
            ));

            for call in reply.tool_calls {
                let execution = self.execute(&call, input.events.as_ref()).await;
                messages.push(ChatMessage::tool_result(
                    call.id.clone(),
                    execution.content.clone().unwrap_or_default(),
                ));
                executions.push(execution);
            }
        }

        warn!(
            "{} reached {} iterations; asking for a final answer",
            self.config.name, self.config.max_iterations
        );
        messages.push(ChatMessage::user(
            "You have used all available tool calls. Answer now with the information gathered so far.",
        ));
        let reply = self.model.complete(&messages, &[]).await?;

        Ok(RunResponse {
            content: reply.content,
            tools: executions,
        })
    }

    /// Execute one tool call and record it.
    async fn execute(
        &self,
        call: &ToolCall,
        events: Option<&UnboundedSender<RunEvent>>,
    ) -> ToolExecution {
        if let Some(tx) = events {
            let _ = tx.send(RunEvent::ToolStarted {
                agent: self.config.name.clone(),
                tool_name: call.name.clone(),
                tool_args: call.arguments.clone(),
            });
        }

        let start = Instant::now();
        let outcome = self.dispatch(&call.name, &call.arguments).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let (content, success) = match outcome {
            Ok(output) => (output, true),
            Err(e) => {
                warn!("{}: tool {} failed: {:#}", self.config.name, call.name, e);
                (format!("Error: {:#}", e), false)
            }
        };

        info!("Tool {} executed in {}ms", call.name, elapsed_ms);

        let execution = ToolExecution {
            tool_name: call.name.clone(),
            tool_args: call.arguments.clone(),
            content: Some(content),
            success,
            elapsed_ms,
        };

        if let Some(tx) = events {
            let _ = tx.send(RunEvent::ToolCompleted {
                agent: self.config.name.clone(),
                execution: execution.clone(),
            });
        }

        execution
    }

    async fn dispatch(&self, tool: &str, args: &Value) -> Result<String> {
        let toolset = self
            .toolsets
            .iter()
            .find(|t| t.provides(tool))
            .ok_or_else(|| anyhow!("Unknown tool: {}", tool))?;
        debug!("Executing tool: {} with args: {}", tool, args);
        toolset.call(tool, args).await
    }
}
