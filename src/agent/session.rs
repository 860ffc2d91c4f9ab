//! Session runner
//!
//! Owns one page for one run and drives it strictly sequentially, either
//! through a prepared instruction list or an observe-reason-act loop. The page
//! is closed when the run ends, whatever the outcome.

use serde_json::Value;
use tracing::{info, warn};

use crate::agent::conversation::Conversation;
use crate::agent::loop_state::AgentLoopState;
use crate::browser::Page;
use crate::core::{Config, ExecutionResult, Result, ToolCall};
use crate::engine::{InstructionExecutor, PageObserver};
use crate::instruction::{parse_sequence, ActionKind, InstructionValidator, RawInstruction};
use crate::llm::{Reasoner, AUTONOMOUS_SYSTEM_PROMPT};

/// Outcome of one autonomous turn
#[derive(Debug)]
enum TurnOutcome {
    Done,
    Acted(Option<ExecutionResult>),
}

/// Runs instructions against a page it owns
pub struct SessionRunner<P: Page> {
    page: P,
    validator: InstructionValidator,
    executor: InstructionExecutor,
    observer: PageObserver,
    max_turns: usize,
    max_history: usize,
    system_prompt: String,
}

impl<P: Page> SessionRunner<P> {
    pub fn new(page: P, validator: InstructionValidator, config: &Config) -> Self {
        Self {
            page,
            validator,
            executor: InstructionExecutor::from_config(&config.browser),
            observer: PageObserver::new(),
            max_turns: config.agent.max_turns,
            max_history: config.agent.max_history,
            system_prompt: config
                .agent
                .system_prompt
                .clone()
                .unwrap_or_else(|| AUTONOMOUS_SYSTEM_PROMPT.to_string()),
        }
    }

    /// Validate `instructions` as a whole, then execute them in order.
    ///
    /// Soft-failures are skipped, so there may be fewer results than
    /// result-producing instructions. Nothing runs if validation fails.
    pub async fn run_batch(self, instructions: &[Value]) -> Result<Vec<ExecutionResult>> {
        let outcome = self.batch(instructions).await;
        self.release(outcome).await
    }

    /// Observe, reason and act until the reasoner sends `done`.
    ///
    /// Fatal errors carry the number of the turn that failed.
    pub async fn run_autonomous(
        self,
        reasoner: &dyn Reasoner,
        goal: &str,
    ) -> Result<Vec<ExecutionResult>> {
        let outcome = self.autonomous(reasoner, goal).await;
        self.release(outcome).await
    }

    async fn batch(&self, instructions: &[Value]) -> Result<Vec<ExecutionResult>> {
        let sequence = Value::Array(instructions.to_vec());
        self.validator.validate(&sequence)?;
        let instructions = parse_sequence(&sequence)?;
        let producing = instructions
            .iter()
            .filter_map(|i| i.action.parse::<ActionKind>().ok())
            .filter(ActionKind::produces_result)
            .count();
        info!(
            "running {} instruction(s), {} result-producing",
            instructions.len(),
            producing
        );

        let mut results = Vec::new();
        for (index, instruction) in instructions.iter().enumerate() {
            info!(index, action = %instruction.action, "step");
            if instruction.is_done() {
                continue;
            }
            results.extend(self.executor.dispatch(&self.page, instruction).await?);
        }
        Ok(results)
    }

    async fn autonomous(
        &self,
        reasoner: &dyn Reasoner,
        goal: &str,
    ) -> Result<Vec<ExecutionResult>> {
        let mut conversation =
            Conversation::with_system_prompt(self.max_history, &self.system_prompt);
        let mut state = AgentLoopState::new(self.max_turns);

        while state.should_continue() {
            let turn = state.next_turn();
            info!(turn, max_turns = state.max_turns, "autonomous turn");

            match self
                .turn(reasoner, goal, &mut conversation)
                .await
                .map_err(|e| e.in_turn(turn))?
            {
                TurnOutcome::Done => {
                    info!(turn, results = state.results.len(), "goal reported done");
                    state.finish();
                }
                TurnOutcome::Acted(result) => state.push_result(result),
            }
        }

        state.into_results()
    }

    async fn turn(
        &self,
        reasoner: &dyn Reasoner,
        goal: &str,
        conversation: &mut Conversation,
    ) -> Result<TurnOutcome> {
        let summary = self.observer.observe(&self.page).await?;
        conversation.add_assistant(summary.to_prompt());
        conversation.add_user(goal);

        let instruction: RawInstruction = reasoner
            .next_instruction(conversation, &summary, goal)
            .await?;
        if instruction.is_done() {
            return Ok(TurnOutcome::Done);
        }

        info!(action = %instruction.action, args = %instruction.args_display(), "reasoner chose");
        self.validator.validate_one(&instruction)?;
        let result = self.executor.dispatch(&self.page, &instruction).await?;
        conversation.add_tool_call(ToolCall::from(&instruction));

        Ok(TurnOutcome::Acted(result))
    }

    /// Close the page; a close failure never replaces the run's own error
    async fn release<T>(self, outcome: Result<T>) -> Result<T> {
        if let Err(e) = self.page.close().await {
            warn!("failed to close page: {}", e);
        }
        outcome
    }
}
