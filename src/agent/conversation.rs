//! Conversation history management
//!
//! Holds the system directive plus the observation, goal and action messages
//! exchanged with the reasoner, bounded to a configurable length.

use std::collections::VecDeque;

use crate::core::{Message, ToolCall};

/// Manages conversation history
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Message history
    messages: VecDeque<Message>,
    /// Maximum history length
    max_length: usize,
    /// System prompt (always first)
    system_prompt: Option<String>,
}

impl Conversation {
    /// Create a new conversation
    pub fn new(max_length: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_length: max_length.max(1),
            system_prompt: None,
        }
    }

    /// Create a conversation seeded with a system directive
    pub fn with_system_prompt(max_length: usize, prompt: impl Into<String>) -> Self {
        let mut conversation = Self::new(max_length);
        conversation.set_system_prompt(prompt);
        conversation
    }

    /// Set the system prompt
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = Some(prompt.into());
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Add a user message
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.add_message(Message::user(content));
    }

    /// Add an assistant message
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.add_message(Message::assistant(content));
    }

    /// Record an action the reasoner chose, so it sees its own history
    pub fn add_tool_call(&mut self, call: ToolCall) {
        self.add_message(Message::assistant_tool_call(call));
    }

    /// Add a message and maintain size limit
    fn add_message(&mut self, message: Message) {
        self.messages.push_back(message);

        while self.messages.len() > self.max_length {
            self.messages.pop_front();
        }
    }

    /// Get all messages including system prompt
    pub fn get_messages(&self) -> Vec<Message> {
        let mut result = Vec::with_capacity(self.messages.len() + 1);

        if let Some(ref prompt) = self.system_prompt {
            result.push(Message::system(prompt.clone()));
        }

        result.extend(self.messages.iter().cloned());
        result
    }

    /// Tool calls recorded so far, oldest first
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.messages
            .iter()
            .filter_map(|m| m.tool_calls.as_ref())
            .flatten()
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(200)
    }
}
