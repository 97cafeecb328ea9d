//! Assembly of the two-agent team.

use crate::agent::agent_loop::{Agent, AgentConfig};
use crate::agent::bridge::DelegationBridge;
use crate::agent::github_tools::GithubToolset;
use crate::agent::prompts::{
    DATA_AGENT_INSTRUCTIONS, DATA_AGENT_NAME, DATA_AGENT_ROLE, REASONING_AGENT_INSTRUCTIONS,
    REASONING_AGENT_NAME, REASONING_AGENT_ROLE,
};
use crate::agent::reasoning_tools::ReasoningToolset;
use crate::agent::tools::Toolset;
use crate::config::{Config, Credentials, GeneralConfig};
use crate::github::GithubClient;
use crate::llm::{ChatModel, OpenAiCompatClient};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// The data agent, the reasoning agent wired to it, and the router's model.
#[derive(Clone)]
pub struct Team {
    pub data: Arc<Agent>,
    pub reasoning: Arc<Agent>,
    pub bridge: Arc<DelegationBridge>,
    pub router_model: Arc<dyn ChatModel>,
}

impl Team {
    /// Wire agents around the given models.
    ///
    /// `data_tools` are offered to the data agent; the reasoning agent
    /// always gets the scratchpad tools and the delegation bridge.
    pub fn assemble(
        general: &GeneralConfig,
        primary: Arc<dyn ChatModel>,
        reasoning: Arc<dyn ChatModel>,
        router: Arc<dyn ChatModel>,
        data_tools: Vec<Arc<dyn Toolset>>,
    ) -> Self {
        let mut data_agent = Agent::new(
            AgentConfig {
                name: DATA_AGENT_NAME.to_string(),
                role: DATA_AGENT_ROLE.to_string(),
                instructions: DATA_AGENT_INSTRUCTIONS.to_string(),
                max_iterations: general.max_tool_iterations,
                debug_mode: general.debug_mode,
            },
            primary,
        );
        for toolset in data_tools {
            data_agent.add_toolset(toolset);
        }
        let data = Arc::new(data_agent);
        let bridge = Arc::new(DelegationBridge::new(data.clone()));

        let reasoning_agent = Agent::new(
            AgentConfig {
                name: REASONING_AGENT_NAME.to_string(),
                role: REASONING_AGENT_ROLE.to_string(),
                instructions: REASONING_AGENT_INSTRUCTIONS.to_string(),
                max_iterations: general.max_tool_iterations,
                debug_mode: general.debug_mode,
            },
            reasoning,
        )
        .with_toolset(Arc::new(ReasoningToolset::new()))
        .with_toolset(bridge.clone());

        Self {
            data,
            reasoning: Arc::new(reasoning_agent),
            bridge,
            router_model: router,
        }
    }
}

/// Build the team against the configured endpoints.
pub fn build_team(config: &Config, credentials: &Credentials) -> Result<Team> {
    let primary: Arc<dyn ChatModel> = Arc::new(
        OpenAiCompatClient::new(config.models.primary.clone(), &credentials.groq_api_key)
            .context("Failed to create primary model client")?,
    );
    let reasoning: Arc<dyn ChatModel> = Arc::new(
        OpenAiCompatClient::new(config.models.reasoning.clone(), &credentials.groq_api_key)
            .context("Failed to create reasoning model client")?,
    );
    let github = Arc::new(
        GithubClient::new(&config.github, &credentials.github_token)
            .context("Failed to create GitHub client")?,
    );

    info!(
        "Team ready: data={} reasoning={}",
        primary.id(),
        reasoning.id()
    );

    Ok(Team::assemble(
        &config.general,
        primary.clone(),
        reasoning,
        primary,
        vec![Arc::new(GithubToolset::new(github))],
    ))
}
