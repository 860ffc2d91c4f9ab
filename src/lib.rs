//! Webpilot - Browser Instruction Execution Engine
//!
//! Validates `{action, args}` browser instructions against a JSON Schema and
//! executes them against a live page through ordered fallback locator
//! strategies, either as a prepared batch or in an observe-reason-act loop
//! driven by a local LLM through Ollama.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Instruction**: Typed instructions and the schema-driven validator
//! - **Browser**: The `Page` seam and its agent-browser CLI implementation
//! - **Engine**: Strategy chains, instruction executor and page observer
//! - **LLM**: LLM provider abstraction, reasoner and task planner
//! - **Agent**: Session runner and conversation management
//!
//! # Usage
//!
//! ```rust,no_run
//! use serde_json::json;
//! use webpilot::{AgentBrowserPage, Config, InstructionValidator, SessionRunner};
//!
//! #[tokio::main]
//! async fn main() -> webpilot::Result<()> {
//!     let config = Config::load();
//!     let page = AgentBrowserPage::from_config(&config.browser);
//!     let runner = SessionRunner::new(page, InstructionValidator::builtin()?, &config);
//!
//!     let results = runner
//!         .run_batch(&[
//!             json!({"action": "navigate", "args": {"url": "https://example.com"}}),
//!             json!({"action": "extract_text", "args": {"selector": "h1"}}),
//!         ])
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&results)?);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod browser;
pub mod core;
pub mod engine;
pub mod instruction;
pub mod llm;

// Re-export commonly used items
pub use agent::SessionRunner;
pub use browser::{AgentBrowserPage, Locator, Page};
pub use core::{Config, ExecutionResult, PilotError, Result};
pub use engine::{InstructionExecutor, PageObserver, PageSummary};
pub use instruction::{Instruction, InstructionValidator, RawInstruction};
