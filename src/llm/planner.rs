//! Task planner
//!
//! Turns a plain-language task into a complete instruction list up front, for
//! batch execution. The model is asked repeatedly until it calls `done`.

use serde_json::Value;
use tracing::{debug, info};

use crate::core::{Message, PilotError, Result};
use crate::instruction::{InstructionValidator, RawInstruction};
use crate::llm::reasoner::{recognized, ToolCallingReasoner};

/// Directive for one-shot planning
pub const PLANNER_SYSTEM_PROMPT: &str = "\
You translate a browser task into a sequence of function calls.
Call the functions in the order they must run, one or more per reply.
Use navigate, click, fill, wait, extract_text, scroll and screenshot.
When the whole task is covered, call done().
Do not output explanations or markdown.";

/// Plans a whole task before any page exists
pub struct TaskPlanner<'a> {
    reasoner: &'a ToolCallingReasoner,
    validator: &'a InstructionValidator,
    max_rounds: usize,
}

impl<'a> TaskPlanner<'a> {
    pub fn new(
        reasoner: &'a ToolCallingReasoner,
        validator: &'a InstructionValidator,
        max_rounds: usize,
    ) -> Self {
        Self {
            reasoner,
            validator,
            max_rounds: max_rounds.max(1),
        }
    }

    /// Plan `task`; `done` is dropped and the result is schema-valid
    pub async fn plan(&self, task: &str) -> Result<Vec<RawInstruction>> {
        let mut messages = vec![
            Message::system(PLANNER_SYSTEM_PROMPT),
            Message::user(task),
        ];
        let mut plan: Vec<RawInstruction> = Vec::new();

        for round in 1..=self.max_rounds {
            let calls = self.reasoner.ask(&messages).await?;
            debug!(round, calls = calls.len(), "planner reply");

            // A reply without calls means the model has nothing to add
            if calls.is_empty() {
                return self.finish(plan);
            }

            for call in calls {
                messages.push(Message::assistant_tool_call(call.clone()));
                let instruction = RawInstruction::from(call);
                recognized(&instruction)?;
                if instruction.is_done() {
                    return self.finish(plan);
                }
                plan.push(instruction);
            }
            messages.push(Message::user("Continue with the next step, or call done()."));
        }

        Err(PilotError::TurnLimit(self.max_rounds))
    }

    fn finish(&self, plan: Vec<RawInstruction>) -> Result<Vec<RawInstruction>> {
        if plan.is_empty() {
            return Err(PilotError::ReasonerContract(
                "the model produced no instructions".to_string(),
            ));
        }
        let value = Value::Array(plan.iter().map(RawInstruction::to_value).collect());
        self.validator.validate(&value)?;
        info!("planned {} instruction(s)", plan.len());
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ToolCall, ToolDefinition};
    use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct ScriptedProvider(Mutex<Vec<Vec<ToolCall>>>);

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn chat_with_tools(
            &self,
            _model: &str,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            let mut replies = self.0.lock().unwrap();
            let tool_calls = if replies.is_empty() {
                Vec::new()
            } else {
                replies.remove(0)
            };
            Ok(LLMResponse {
                tool_calls,
                ..LLMResponse::default()
            })
        }

        async fn is_model_available(&self, _model: &str) -> Result<bool> {
            Ok(true)
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    async fn plan_with(replies: Vec<Vec<ToolCall>>, max_rounds: usize) -> Result<Vec<RawInstruction>> {
        let validator = InstructionValidator::builtin().unwrap();
        let provider = Arc::new(ScriptedProvider(Mutex::new(replies)));
        let reasoner = ToolCallingReasoner::new(provider, "scripted", &validator);
        TaskPlanner::new(&reasoner, &validator, max_rounds)
            .plan("Open example.com and read the heading")
            .await
    }

    #[tokio::test]
    async fn test_plan_collects_calls_until_done() {
        let plan = plan_with(
            vec![
                vec![ToolCall::new("navigate", json!({"url": "https://example.com"}))],
                vec![
                    ToolCall::new("extract_text", json!({"selector": "h1"})),
                    ToolCall::new("done", json!({})),
                    ToolCall::new("scroll", json!({"dx": 0, "dy": 10})),
                ],
            ],
            10,
        )
        .await
        .unwrap();

        let actions: Vec<_> = plan.iter().map(|i| i.action.as_str()).collect();
        assert_eq!(actions, vec!["navigate", "extract_text"]);
    }

    #[tokio::test]
    async fn test_plan_is_validated() {
        let err = plan_with(
            vec![vec![
                ToolCall::new("navigate", json!({"url": "https://example.com"})),
                ToolCall::new("fill", json!({"label": "Email"})),
            ]],
            10,
        )
        .await
        .unwrap_err();

        match err {
            PilotError::Validation { path, message } => {
                assert_eq!(path, "1 -> args");
                assert!(message.contains("text"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plan_rounds_are_bounded() {
        let endless = (0..5)
            .map(|_| vec![ToolCall::new("scroll", json!({"dx": 0, "dy": 100}))])
            .collect();
        assert!(matches!(
            plan_with(endless, 3).await,
            Err(PilotError::TurnLimit(3))
        ));
    }

    #[tokio::test]
    async fn test_empty_plan_is_rejected() {
        assert!(matches!(
            plan_with(vec![vec![ToolCall::new("done", json!({}))]], 3).await,
            Err(PilotError::ReasonerContract(_))
        ));
    }
}
