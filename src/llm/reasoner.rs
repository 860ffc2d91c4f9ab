//! Reasoning collaborators
//!
//! A [`Reasoner`] picks the next instruction from the conversation so far.
//! [`ToolCallingReasoner`] asks an [`LLMProvider`] and offers one function per
//! action, derived from the instruction schema.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::agent::Conversation;
use crate::core::{Message, PilotError, Result, ToolCall, ToolDefinition};
use crate::engine::PageSummary;
use crate::instruction::{ActionKind, InstructionValidator, RawInstruction};
use crate::llm::traits::{GenerateOptions, LLMProvider};

/// Directive that seeds every autonomous conversation
pub const AUTONOMOUS_SYSTEM_PROMPT: &str = "\
You are a self-driving browser agent. Each turn:
1. You receive a summary of the current page (forms, fields, links, buttons).
2. You receive the high-level goal.
3. You call exactly ONE function, chosen from the functions offered.

Functions:
- navigate(url)
- click(text) or click(selector)
- fill(label, text) or fill(selector, text)
- wait(timeout_ms) or wait(selector, timeout_ms)
- extract_text(selector)
- scroll(dx, dy)
- screenshot(path) or screenshot(path, selector)
- done() signals the goal is complete

Do not output explanations or markdown.";

/// Chooses the next instruction
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Return exactly one instruction. The conversation already holds the
    /// latest page summary and goal.
    async fn next_instruction(
        &self,
        conversation: &Conversation,
        summary: &PageSummary,
        goal: &str,
    ) -> Result<RawInstruction>;
}

/// Reasoner backed by LLM function calling
pub struct ToolCallingReasoner {
    provider: Arc<dyn LLMProvider>,
    model: String,
    tools: Vec<ToolDefinition>,
}

impl ToolCallingReasoner {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        validator: &InstructionValidator,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            tools: validator.tool_definitions(),
        }
    }

    /// Ask the provider and return every call it made, in order.
    ///
    /// Calls written as JSON text instead of native tool calls are accepted.
    pub(crate) async fn ask(&self, messages: &[Message]) -> Result<Vec<ToolCall>> {
        let response = self
            .provider
            .chat_with_tools(
                &self.model,
                messages,
                &self.tools,
                Some(GenerateOptions::deterministic()),
            )
            .await?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "reasoner call"
            );
        }

        if response.tool_calls.is_empty() {
            Ok(parse_content_call(&response.content).into_iter().collect())
        } else {
            Ok(response.tool_calls)
        }
    }
}

#[async_trait]
impl Reasoner for ToolCallingReasoner {
    async fn next_instruction(
        &self,
        conversation: &Conversation,
        _summary: &PageSummary,
        _goal: &str,
    ) -> Result<RawInstruction> {
        let mut calls = self.ask(&conversation.get_messages()).await?;

        match calls.len() {
            0 => Err(PilotError::ReasonerContract(
                "the model did not call a function".to_string(),
            )),
            1 => {
                let instruction = RawInstruction::from(calls.remove(0));
                recognized(&instruction)?;
                Ok(instruction)
            }
            n => Err(PilotError::ReasonerContract(format!(
                "expected one function call, got {}",
                n
            ))),
        }
    }
}

/// Reject actions outside the closed set
pub(crate) fn recognized(instruction: &RawInstruction) -> Result<ActionKind> {
    instruction
        .action
        .parse::<ActionKind>()
        .map_err(|_| {
            PilotError::ReasonerContract(format!("unknown function '{}'", instruction.action))
        })
}

#[derive(Debug, Deserialize)]
struct ContentCall {
    #[serde(alias = "action")]
    name: String,
    #[serde(default, alias = "args")]
    arguments: Value,
}

/// Parse `{"name": ..., "arguments": {...}}` written as plain text
fn parse_content_call(content: &str) -> Option<ToolCall> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let call: ContentCall = serde_json::from_str(body).ok()?;
    let arguments = match call.arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    Some(ToolCall::new(call.name, arguments))
}
