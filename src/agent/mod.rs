//! Agent module - session lifecycle and conversation management
//!
//! Contains the session runner that drives a page in batch or autonomous mode.

pub mod conversation;
pub mod loop_state;
pub mod session;

pub use conversation::Conversation;
pub use loop_state::AgentLoopState;
pub use session::SessionRunner;
