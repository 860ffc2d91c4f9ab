//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use webpilot::core::config::Config;
use webpilot::{Locator, Page, PilotError, Result};

/// Contact page used across tests
pub const CONTACT_PAGE_HTML: &str = r##"<html>
  <body>
    <a href="#foo">Foo Link</a>
    <form id="contact-form">
      <label for="name">Name</label><input id="name" name="name"/>
      <label for="email">Email</label><input id="email" name="email"/>
      <button type="submit">Send</button>
    </form>
    <h1 id="title">Contact us</h1>
    <button>ClickMe</button>
    <div id="spacer"></div>
  </body>
</html>"##;

/// What the observer probe reports for [`CONTACT_PAGE_HTML`]
pub fn contact_page_facts() -> Value {
    json!({
        "forms": [{
            "id": "contact-form",
            "class_name": "",
            "fields": [{"name": "name", "id": "name"}, {"name": "email", "id": "email"}],
            "buttons": ["Send"]
        }],
        "links": ["Foo Link"],
        "buttons": ["Send", "ClickMe"]
    })
}

/// Config with short bounds so soft-failures resolve quickly
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.browser.locator_timeout_ms = 50;
    config.browser.navigation_timeout_ms = 200;
    config.agent.max_turns = 5;
    config.agent.system_prompt = None;
    config
}

#[derive(Default)]
struct PageState {
    calls: Vec<String>,
    closed: bool,
}

/// In-memory [`Page`] modelled on the contact page.
///
/// Clones share state, so a test keeps one handle while the runner owns
/// another.
#[derive(Clone)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
    actionable: Vec<Locator>,
    selectors: HashMap<String, Option<String>>,
    facts: Value,
    die_on_goto: bool,
}

impl FakePage {
    pub fn contact_page() -> Self {
        let selectors = [
            ("#title", Some("Contact us")),
            ("#name", Some("")),
            ("#email", Some("")),
            ("form", Some("")),
            ("#spacer", None),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.map(String::from)))
        .collect();
        Self {
            state: Arc::default(),
            actionable: vec![
                Locator::text_exact("Send"),
                Locator::text_exact("ClickMe"),
                Locator::text_exact("Foo Link"),
                Locator::Label("Name".into()),
                Locator::Label("Email".into()),
                Locator::css("#contact-form button"),
            ],
            selectors,
            facts: contact_page_facts(),
            die_on_goto: false,
        }
    }

    /// A page whose browser dies on the first navigation
    pub fn dying() -> Self {
        Self {
            die_on_goto: true,
            ..Self::contact_page()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn record(&self, call: String) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(PilotError::PageClosed("page already closed".into()));
        }
        state.calls.push(call);
        Ok(())
    }

    fn act(&self, locator: &Locator) -> Result<()> {
        if self.actionable.contains(locator) {
            Ok(())
        } else {
            Err(PilotError::ElementNotFound(locator.to_string()))
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.record(format!("goto {}", url))?;
        if self.die_on_goto {
            return Err(PilotError::PageClosed("browser crashed".into()));
        }
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.record(format!("click {}", locator))?;
        self.act(locator)
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        self.record(format!("fill {} = {}", locator, value))?;
        self.act(locator)
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        if self.selectors.contains_key(selector) {
            Ok(())
        } else {
            std::future::pending().await
        }
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        self.record(format!("text {}", selector))?;
        Ok(self.selectors.get(selector).cloned().flatten())
    }

    async fn screenshot(&self, path: &Path, selector: Option<&str>) -> Result<()> {
        self.record(format!("screenshot {} {}", path.display(), selector.unwrap_or("-")))
    }

    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<()> {
        self.record(format!("scroll {} {}", dx, dy))
    }

    async fn evaluate(&self, _script: &str) -> Result<Value> {
        self.record("observe".into())?;
        Ok(self.facts.clone())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
