//! Shared types used across webpilot modules
//!
//! Chat messages, tool definitions for the reasoner, and execution results.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
    /// Optional tool calls made by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }

    /// Create an assistant message recording a tool call it made
    pub fn assistant_tool_call(call: ToolCall) -> Self {
        Self {
            role: "assistant".to_string(),
            content: String::new(),
            tool_calls: Some(vec![call]),
        }
    }
}

/// A tool call made by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Output of a result-producing instruction.
///
/// Serializes as `{"extracted_text": ...}` or `{"screenshot": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionResult {
    /// Text content of an element; `None` when its `textContent` is null
    ExtractedText(Option<String>),
    /// Path the screenshot was written to
    Screenshot(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_result_wire_shape() {
        let text = ExecutionResult::ExtractedText(Some("Hello".into()));
        assert_eq!(
            serde_json::to_value(&text).unwrap(),
            json!({"extracted_text": "Hello"})
        );

        let empty = ExecutionResult::ExtractedText(None);
        assert_eq!(
            serde_json::to_value(&empty).unwrap(),
            json!({"extracted_text": null})
        );

        let shot = ExecutionResult::Screenshot(PathBuf::from("out/form.png"));
        assert_eq!(
            serde_json::to_value(&shot).unwrap(),
            json!({"screenshot": "out/form.png"})
        );
    }

    #[test]
    fn test_tool_call_message() {
        let msg = Message::assistant_tool_call(ToolCall::new("navigate", json!({"url": "x"})));
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.tool_calls.as_ref().map(Vec::len), Some(1));
    }
}
