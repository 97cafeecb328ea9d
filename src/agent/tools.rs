//! Tool definitions and the toolset seam.
//!
//! A toolset is a named group of capabilities an agent can offer to its
//! model. Each capability has a JSON-schema parameter block and an async
//! handler; handlers return plain text for the model.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition in the OpenAI tool-calling format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// A `function` tool.
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// A group of capabilities exposed to a model.
#[async_trait]
pub trait Toolset: Send + Sync {
    /// Toolset name, for logs.
    fn name(&self) -> &str;

    /// Definitions offered to the model.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Extra instructions appended to the owning agent's prompt.
    fn instructions(&self) -> Option<&str> {
        None
    }

    /// Invoke `tool` with model-supplied `args`.
    async fn call(&self, tool: &str, args: &Value) -> Result<String>;

    fn provides(&self, tool: &str) -> bool {
        self.definitions().iter().any(|d| d.name() == tool)
    }
}

/// Required string argument.
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing required parameter: {}", key))
}

/// Optional string argument; empty strings count as absent.
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Required integer argument. Models sometimes send numbers as strings.
pub fn required_u64(args: &Value, key: &str) -> Result<u64> {
    optional_u64(args, key).ok_or_else(|| anyhow!("Missing required parameter: {}", key))
}

pub fn optional_u64(args: &Value, key: &str) -> Option<u64> {
    match args.get(key) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Optional integer argument narrowed to `T`, saturating at `max`.
pub fn optional_count<T: TryFrom<u64>>(args: &Value, key: &str, max: T) -> Option<T> {
    optional_u64(args, key).map(|n| T::try_from(n).unwrap_or(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_definition_shape() {
        let tool = ToolDefinition::function(
            "get_issue",
            "Fetch one issue",
            json!({"type": "object", "properties": {}, "required": []}),
        );
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "get_issue");
        assert_eq!(tool.name(), "get_issue");
    }

    #[test]
    fn test_argument_helpers() {
        let args = json!({"repo_name": "o/r", "blank": " ", "n": 7, "m": "12"});
        assert_eq!(required_str(&args, "repo_name").unwrap(), "o/r");
        assert!(required_str(&args, "blank").is_err());
        assert!(required_str(&args, "missing").unwrap_err().to_string().contains("missing"));
        assert_eq!(optional_str(&args, "blank"), None);
        assert_eq!(required_u64(&args, "n").unwrap(), 7);
        assert_eq!(optional_u64(&args, "m"), Some(12));
        assert!(required_u64(&args, "repo_name").is_err());
    }

    #[test]
    fn test_counts_saturate_instead_of_wrapping() {
        let args = json!({"per_page": 4_294_967_297u64, "limit": "30"});
        assert_eq!(optional_count(&args, "per_page", u32::MAX), Some(u32::MAX));
        assert_eq!(optional_count(&args, "limit", usize::MAX), Some(30));
        assert_eq!(optional_count(&args, "missing", u32::MAX), None);
    }
}
