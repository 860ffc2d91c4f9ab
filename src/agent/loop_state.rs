//! Autonomous loop state
//!
//! Tracks turns and the results gathered by the observe-reason-act loop.

use crate::core::{ExecutionResult, PilotError, Result};

/// State of the autonomous loop
#[derive(Debug, Clone)]
pub struct AgentLoopState {
    /// Turns started so far
    pub turn: usize,
    /// Maximum allowed turns
    pub max_turns: usize,
    /// Results in instruction order
    pub results: Vec<ExecutionResult>,
    /// Set once the reasoner sends `done`
    pub finished: bool,
}

impl AgentLoopState {
    /// Create a new loop state with the given max turns
    pub fn new(max_turns: usize) -> Self {
        Self {
            turn: 0,
            max_turns,
            results: Vec::new(),
            finished: false,
        }
    }

    /// Check if the loop should continue
    pub fn should_continue(&self) -> bool {
        self.turn < self.max_turns && !self.finished
    }

    /// Start the next turn and return its 1-based number
    pub fn next_turn(&mut self) -> usize {
        self.turn += 1;
        self.turn
    }

    pub fn push_result(&mut self, result: Option<ExecutionResult>) {
        self.results.extend(result);
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Results after `done`, or the turn-limit error
    pub fn into_results(self) -> Result<Vec<ExecutionResult>> {
        if self.finished {
            Ok(self.results)
        } else {
            Err(PilotError::TurnLimit(self.max_turns))
        }
    }
}
