//! Turn records - entries in the per-session working buffer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time_utils;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation captured alongside a turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
}

/// One entry in the working buffer.
///
/// Ordering is significant and append-only within a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnRecord {
    pub role: TurnRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_invocation: Option<ToolInvocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<String>,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl TurnRecord {
    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
            tool_invocation: None,
            tool_result: None,
            timestamp: time_utils::now_ms(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            tool_invocation: None,
            tool_result: None,
            timestamp: time_utils::now_ms(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            tool_invocation: None,
            tool_result: None,
            timestamp: time_utils::now_ms(),
        }
    }

    /// Create a tool turn recording an invocation and its result
    pub fn tool(invocation: ToolInvocation, result: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Tool,
            content: String::new(),
            tool_invocation: Some(invocation),
            tool_result: Some(result.into()),
            timestamp: time_utils::now_ms(),
        }
    }

    /// Estimate token count for this turn.
    ///
    /// Uses a simple heuristic: 1 token ≈ 4 characters.
    pub fn estimate_tokens(&self) -> usize {
        let invocation_len = self
            .tool_invocation
            .as_ref()
            .map(|inv| inv.name.len() + inv.arguments.to_string().len())
            .unwrap_or(0);
        let result_len = self.tool_result.as_ref().map(String::len).unwrap_or(0);

        (self.content.len() + invocation_len + result_len) / 4 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors() {
        let turn = TurnRecord::user("Hello");
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.content, "Hello");
        assert!(turn.tool_invocation.is_none());
        assert!(turn.timestamp > 0);
    }

    #[test]
    fn test_tool_turn() {
        let turn = TurnRecord::tool(
            ToolInvocation {
                name: "book_flight".to_string(),
                arguments: json!({"destination": "Siping"}),
            },
            "{\"status\":\"success\"}",
        );
        assert_eq!(turn.role, TurnRole::Tool);
        assert_eq!(turn.tool_result.as_deref(), Some("{\"status\":\"success\"}"));
    }

    #[test]
    fn test_token_estimate_includes_tool_payload() {
        let plain = TurnRecord::assistant("hi");
        let with_tool = TurnRecord::tool(
            ToolInvocation {
                name: "search".to_string(),
                arguments: json!({"query": "rust programming"}),
            },
            "long tool output goes here",
        );
        assert!(with_tool.estimate_tokens() > plain.estimate_tokens());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&TurnRole::Assistant).unwrap(), "\"assistant\"");
        let turn: TurnRecord =
            serde_json::from_str(r#"{"role":"user","content":"hi","timestamp":1}"#).unwrap();
        assert_eq!(turn.role, TurnRole::User);
    }
}
