//! Core module - shared infrastructure for webpilot
//!
//! Configuration, error handling and the types shared by every layer.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{PilotError, Result};
pub use types::*;
