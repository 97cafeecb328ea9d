//! Scratchpad capabilities for step-by-step reasoning.
//!
//! `think` and `analyze` do no I/O. They record a structured step and hand
//! it back to the model so the reasoning is visible in the run's tool log.

use crate::agent::tools::{optional_str, required_str, ToolDefinition, Toolset};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

const INSTRUCTIONS: &str = "\
You have access to the `think` and `analyze` tools to work through problems step by step.
- Use `think` before acting: break the request down, note what you know and what you still need.
- Use `analyze` after a tool result or a piece of information arrives: say what it means and whether it is enough.
- `next_action` in `analyze` must be one of: continue, validate, final_answer.
- Keep steps short and concrete. Stop reasoning once you can answer.";

/// Allowed values for `analyze.next_action`.
const NEXT_ACTIONS: [&str; 3] = ["continue", "validate", "final_answer"];

#[derive(Debug, Default)]
pub struct ReasoningToolset;

impl ReasoningToolset {
    pub fn new() -> Self {
        Self
    }

    fn think(args: &Value) -> Result<String> {
        let title = required_str(args, "title")?;
        let thought = required_str(args, "thought")?;

        let mut step = format!("Step: {}\nThought: {}", title, thought);
        if let Some(action) = optional_str(args, "action") {
            step.push_str(&format!("\nAction: {}", action));
        }
        step.push_str(&format!("\nConfidence: {:.1}", confidence(args)?));
        Ok(step)
    }

    fn analyze(args: &Value) -> Result<String> {
        let title = required_str(args, "title")?;
        let result = required_str(args, "result")?;
        let analysis = required_str(args, "analysis")?;
        let next_action = optional_str(args, "next_action").unwrap_or("continue");
        if !NEXT_ACTIONS.contains(&next_action) {
            bail!(
                "next_action must be one of {}, got '{}'",
                NEXT_ACTIONS.join(", "),
                next_action
            );
        }

        Ok(format!(
            "Step: {}\nResult: {}\nAnalysis: {}\nNext action: {}\nConfidence: {:.1}",
            title,
            result,
            analysis,
            next_action,
            confidence(args)?
        ))
    }
}

/// Confidence in `[0, 1]`, defaulting to 0.8.
fn confidence(args: &Value) -> Result<f64> {
    match args.get("confidence") {
        None | Some(Value::Null) => Ok(0.8),
        Some(value) => {
            let c = value
                .as_f64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| anyhow!("confidence must be a number"))?;
            if !(0.0..=1.0).contains(&c) {
                bail!("confidence must be between 0.0 and 1.0");
            }
            Ok(c)
        }
    }
}

#[async_trait]
impl Toolset for ReasoningToolset {
    fn name(&self) -> &str {
        "reasoning"
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::function(
                "think",
                "Use as a scratchpad to plan the next step before acting.",
                json!({
                    "type": "object",
                    "properties": {
                        "title": {"type": "string", "description": "Short title for this step"},
                        "thought": {"type": "string", "description": "Your reasoning for this step"},
                        "action": {"type": "string", "description": "What you plan to do next"},
                        "confidence": {"type": "number", "description": "Confidence between 0.0 and 1.0"}
                    },
                    "required": ["title", "thought"]
                }),
            ),
            ToolDefinition::function(
                "analyze",
                "Evaluate the result of the previous step and decide what to do next.",
                json!({
                    "type": "object",
                    "properties": {
                        "title": {"type": "string", "description": "Short title for this step"},
                        "result": {"type": "string", "description": "The outcome being analyzed"},
                        "analysis": {"type": "string", "description": "What the outcome means"},
                        "next_action": {
                            "type": "string",
                            "enum": NEXT_ACTIONS,
                            "description": "continue, validate, or final_answer"
                        },
                        "confidence": {"type": "number", "description": "Confidence between 0.0 and 1.0"}
                    },
                    "required": ["title", "result", "analysis"]
                }),
            ),
        ]
    }

    fn instructions(&self) -> Option<&str> {
        Some(INSTRUCTIONS)
    }

    async fn call(&self, tool: &str, args: &Value) -> Result<String> {
        match tool {
            "think" => Self::think(args),
            "analyze" => Self::analyze(args),
            _ => Err(anyhow!("Unknown tool: {}", tool)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_think_formats_step() {
        let out = ReasoningToolset::new()
            .call(
                "think",
                &json!({"title": "Plan", "thought": "Need the README", "action": "ask for it"}),
            )
            .await
            .unwrap();
        assert!(out.starts_with("Step: Plan"));
        assert!(out.contains("Action: ask for it"));
        assert!(out.contains("Confidence: 0.8"));
    }

    #[tokio::test]
    async fn test_analyze_validates_next_action() {
        let tools = ReasoningToolset::new();
        let ok = tools
            .call(
                "analyze",
                &json!({"title": "Check", "result": "3 files", "analysis": "enough",
                        "next_action": "final_answer", "confidence": 0.95}),
            )
            .await
            .unwrap();
        assert!(ok.contains("Next action: final_answer"));

        let err = tools
            .call(
                "analyze",
                &json!({"title": "Check", "result": "x", "analysis": "y", "next_action": "guess"}),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("guess"));
    }

    #[tokio::test]
    async fn test_confidence_out_of_range() {
        let err = ReasoningToolset::new()
            .call("think", &json!({"title": "t", "thought": "x", "confidence": 2}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("between"));
    }

    #[test]
    fn test_offers_instructions() {
        let tools = ReasoningToolset::new();
        assert!(tools.instructions().unwrap().contains("final_answer"));
        assert!(tools.provides("think"));
        assert!(!tools.provides("get_github_info"));
    }
}
