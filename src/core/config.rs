//! Configuration management for webpilot
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/webpilot/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{PilotError, Result};

/// Main configuration for webpilot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ollama configuration
    pub ollama: OllamaConfig,
    /// Model configuration
    pub models: ModelConfig,
    /// Browser configuration
    pub browser: BrowserConfig,
    /// Agent configuration
    pub agent: AgentConfig,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model that picks the next instruction (must support tool calling)
    pub reasoner: String,
}

/// Browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Session name for agent-browser
    pub session_name: String,
    /// Whether to run in headed mode (visible browser)
    pub headed: bool,
    /// Bound for each locator strategy attempt, in ms
    pub locator_timeout_ms: u64,
    /// Bound for page navigation, in ms
    pub navigation_timeout_ms: u64,
    /// Instruction schema override; the embedded schema is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<PathBuf>,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum conversation history length
    pub max_history: usize,
    /// Maximum observe-reason-act turns before giving up
    /// Default: 25
    pub max_turns: usize,
    /// Whether to show debug output
    pub debug: bool,
    /// System directive override for the autonomous loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 120,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            reasoner: env::var("WEBPILOT_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            session_name: env::var("WEBPILOT_BROWSER_SESSION")
                .unwrap_or_else(|_| "webpilot".to_string()),
            headed: env_flag("WEBPILOT_BROWSER_HEADED", false),
            locator_timeout_ms: 5_000,
            navigation_timeout_ms: 60_000,
            schema_path: env::var("WEBPILOT_SCHEMA").ok().map(PathBuf::from),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_history: 200,
            max_turns: 25,
            debug: env_flag("WEBPILOT_DEBUG", false),
            system_prompt: None,
        }
    }
}

impl BrowserConfig {
    /// Per-strategy locator bound
    pub fn locator_timeout(&self) -> Duration {
        Duration::from_millis(self.locator_timeout_ms)
    }

    /// Page-level navigation bound
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webpilot")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(PilotError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| PilotError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PilotError::config(format!("Failed to parse config: {}", e)))
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> Result<url::Url> {
        let raw = format!("http://{}:{}/", self.ollama.host, self.ollama.port);
        url::Url::parse(&raw)
            .map_err(|e| PilotError::config(format!("Invalid Ollama address '{}': {}", raw, e)))
    }
}
