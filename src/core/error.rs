//! Error types for webpilot
//!
//! One error enum for the whole crate. The executor relies on
//! [`PilotError::is_recoverable`] to tell soft-failures from defects.

use thiserror::Error;

/// Main error type for webpilot operations
#[derive(Error, Debug)]
pub enum PilotError {
    /// The schema document itself is malformed
    #[error("JSON schema error: {0}")]
    Schema(String),

    /// An instruction sequence violates the schema
    #[error("Instruction validation error at '{path}': {message}")]
    Validation { path: String, message: String },

    /// Browser driver reported a failure for a single operation
    #[error("Browser error: {0}")]
    Browser(String),

    /// No element matched a locator
    #[error("No element matched {0}")]
    ElementNotFound(String),

    /// A bounded wait elapsed
    #[error("Timed out after {after_ms}ms waiting for {what}")]
    Timeout { what: String, after_ms: u64 },

    /// Agent-browser not installed
    #[error("agent-browser not found. Install with: npm install -g agent-browser && agent-browser install")]
    AgentBrowserNotFound,

    /// The page or browser session is no longer usable
    #[error("Page is closed or the browser session died: {0}")]
    PageClosed(String),

    /// Action name outside the closed action set
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// Arguments do not fit the action
    #[error("Invalid arguments for '{action}': {reason}")]
    InvalidArguments { action: String, reason: String },

    /// The reasoner did not return exactly one instruction
    #[error("Reasoner contract violation: {0}")]
    ReasonerContract(String),

    /// A fatal error inside one autonomous turn
    #[error("Turn {turn} failed: {source}")]
    Turn {
        turn: usize,
        #[source]
        source: Box<PilotError>,
    },

    /// Autonomous loop ran out of turns before `done`
    #[error("No 'done' after {0} turns")]
    TurnLimit(usize),

    /// Ollama connection or API errors
    #[error("Ollama error: {0}")]
    Ollama(String),

    /// Model not available
    #[error("Model '{0}' not available in Ollama. Run: ollama pull {0}")]
    ModelNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Convenience Result type for webpilot operations
pub type Result<T> = std::result::Result<T, PilotError>;

impl PilotError {
    /// Create a schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a validation error
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(what: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after_ms: after.as_millis() as u64,
        }
    }

    /// Create an invalid-arguments error
    pub fn invalid_args(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create an Ollama error
    pub fn ollama(msg: impl Into<String>) -> Self {
        Self::Ollama(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Attach the autonomous turn number to a fatal error
    pub fn in_turn(self, turn: usize) -> Self {
        match self {
            already @ Self::Turn { .. } => already,
            other => Self::Turn {
                turn,
                source: Box::new(other),
            },
        }
    }

    /// Whether the failure only concerns one operation on an otherwise
    /// healthy page.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Browser(_)
                | Self::ElementNotFound(_)
                | Self::Timeout { .. }
                | Self::UnsupportedAction(_)
                | Self::InvalidArguments { .. }
                | Self::Image(_)
        )
    }
}
