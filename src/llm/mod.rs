//! LLM module - the reasoning collaborator
//!
//! Provider abstraction with Ollama as the backend, the reasoner used by the
//! autonomous loop and the up-front task planner.

pub mod ollama;
pub mod planner;
pub mod reasoner;
pub mod traits;

pub use ollama::OllamaClient;
pub use planner::TaskPlanner;
pub use reasoner::{Reasoner, ToolCallingReasoner, AUTONOMOUS_SYSTEM_PROMPT};
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
