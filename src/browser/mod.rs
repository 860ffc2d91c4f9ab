//! Browser module
//!
//! The [`Page`] seam and its agent-browser CLI implementation.

mod agent_browser;
pub mod capture;
mod page;

pub use agent_browser::{AgentBrowserPage, BUTTON_LIKE};
pub use page::{Locator, Page};
