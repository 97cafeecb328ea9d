//! Delegation from the reasoning agent to the data agent.

use crate::agent::agent_loop::{Agent, RunInput};
use crate::agent::tools::{required_str, ToolDefinition, Toolset};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub const GET_GITHUB_INFO: &str = "get_github_info";

/// Prefix marking a query as agent-to-agent traffic.
pub const INTERNAL_REQUEST_PREFIX: &str = "Internal request: ";

/// Returned when the data agent finishes without any text.
pub const NO_INFORMATION: &str = "Error retrieving information";

/// Exposes the data agent to another agent as a single capability.
///
/// Each request is a fresh data-agent run: no history, no shared context.
/// Failures of that run propagate to the caller unchanged.
pub struct DelegationBridge {
    data_agent: Arc<Agent>,
}

impl DelegationBridge {
    pub fn new(data_agent: Arc<Agent>) -> Self {
        Self { data_agent }
    }

    pub async fn request(&self, query: &str) -> Result<String> {
        info!("Delegating to {}: {}", self.data_agent.name(), query);
        let response = self
            .data_agent
            .run(RunInput::new(format!("{}{}", INTERNAL_REQUEST_PREFIX, query)))
            .await?;
        debug!(
            "{} answered after {} tool call(s)",
            self.data_agent.name(),
            response.tools.len()
        );
        Ok(response.content.unwrap_or_else(|| NO_INFORMATION.to_string()))
    }
}

#[async_trait]
impl Toolset for DelegationBridge {
    fn name(&self) -> &str {
        "delegation"
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::function(
            GET_GITHUB_INFO,
            "Request specific information from the GitHub Agent. Include the full owner/repo name in the query.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to fetch, e.g. 'List the root directory of agno-agi/agno'"
                    }
                },
                "required": ["query"]
            }),
        )]
    }

    async fn call(&self, tool: &str, args: &Value) -> Result<String> {
        if tool != GET_GITHUB_INFO {
            return Err(anyhow!("Unknown tool: {}", tool));
        }
        self.request(required_str(args, "query")?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::agent_loop::AgentConfig;
    use crate::llm::testing::ScriptedModel;
    use crate::llm::{ChatMessage, ChatModel, ModelReply};

    struct DownModel;

    #[async_trait]
    impl ChatModel for DownModel {
        fn id(&self) -> &str {
            "down"
        }

        async fn complete(&self, _: &[ChatMessage], _: &[ToolDefinition]) -> Result<ModelReply> {
            Err(anyhow!("Cannot connect to model API"))
        }
    }

    fn bridge_over(model: Arc<dyn ChatModel>) -> DelegationBridge {
        let config = AgentConfig {
            name: "GitHub Agent".into(),
            ..AgentConfig::default()
        };
        DelegationBridge::new(Arc::new(Agent::new(config, model)))
    }

    #[tokio::test]
    async fn test_forwards_prefixed_query_and_returns_content() {
        let model = Arc::new(ScriptedModel::new(vec![ModelReply::text("42 open issues")]));
        let bridge = bridge_over(model.clone());

        let out = bridge
            .call(GET_GITHUB_INFO, &json!({"query": "Count open issues in o/r"}))
            .await
            .unwrap();

        assert_eq!(out, "42 open issues");
        assert_eq!(model.request_count(), 1);
        assert_eq!(
            model.user_message(0).as_deref(),
            Some("Internal request: Count open issues in o/r")
        );
    }

    #[tokio::test]
    async fn test_empty_answer_yields_sentinel() {
        let model = Arc::new(ScriptedModel::new(vec![ModelReply::default()]));
        let out = bridge_over(model).request("anything").await.unwrap();
        assert_eq!(out, "Error retrieving information");
    }

    #[tokio::test]
    async fn test_run_failure_propagates() {
        let err = bridge_over(Arc::new(DownModel)).request("x").await.unwrap_err();
        assert!(err.to_string().contains("Cannot connect"));
    }

    #[tokio::test]
    async fn test_requires_query() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let bridge = bridge_over(model.clone());
        assert!(bridge.call(GET_GITHUB_INFO, &json!({})).await.is_err());
        assert_eq!(model.request_count(), 0);
    }

    #[test]
    fn test_single_definition() {
        let bridge = bridge_over(Arc::new(ScriptedModel::new(vec![])));
        let defs = bridge.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name(), "get_github_info");
    }
}
