//! Page abstraction
//!
//! The engine talks to a live page only through [`Page`]. Element lookups are
//! described as [`Locator`] data so strategy chains can be planned and tested
//! without a browser.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::core::Result;

/// How to find an element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Visible text match; first match wins
    Text { text: String, exact: bool },
    /// Accessible role with a matching accessible name
    Role { role: String, name: String },
    /// Elements matching `scope` whose text contains `text`
    HasText { scope: String, text: String },
    /// Form control by its accessible label
    Label(String),
    /// Plain CSS selector
    Css(String),
}

impl Locator {
    pub fn text_exact(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: true,
        }
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Text { text, exact: true } => write!(f, "text={:?}", text),
            Locator::Text { text, exact: false } => write!(f, "text~{:?}", text),
            Locator::Role { role, name } => write!(f, "role={}[name={:?}]", role, name),
            Locator::HasText { scope, text } => write!(f, "{} has-text {:?}", scope, text),
            Locator::Label(label) => write!(f, "label={:?}", label),
            Locator::Css(selector) => write!(f, "css={}", selector),
        }
    }
}

/// A live browser page.
///
/// Implementations do not bound their own waits; callers wrap every call in
/// the timeout that applies to it.
#[async_trait]
pub trait Page: Send + Sync {
    /// Load a URL and wait for the load signal to settle
    async fn goto(&self, url: &str) -> Result<()>;

    /// Click the first element matching `locator` once it is visible.
    /// CSS locators are scrolled into view first.
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Set the value of the first form control matching `locator`
    async fn fill(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Wait until `selector` is present in the DOM
    async fn wait_for_selector(&self, selector: &str) -> Result<()>;

    /// Text content of the first element matching `selector`
    async fn text_content(&self, selector: &str) -> Result<Option<String>>;

    /// Capture the full page, or only the element matching `selector`
    async fn screenshot(&self, path: &Path, selector: Option<&str>) -> Result<()>;

    /// Scroll the viewport by a relative offset
    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<()>;

    /// Evaluate a script in the page and return its JSON result
    async fn evaluate(&self, script: &str) -> Result<Value>;

    /// Release the page and its browser session
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::text_exact("Send").to_string(), "text=\"Send\"");
        assert_eq!(
            Locator::role("button", "Send").to_string(),
            "role=button[name=\"Send\"]"
        );
        assert_eq!(Locator::css("#go").to_string(), "css=#go");
    }
}
