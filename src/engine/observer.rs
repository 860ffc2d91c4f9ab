//! Page observer
//!
//! Summarizes the interactive parts of the current page (forms, fields, links,
//! buttons) as context for the reasoner. A small script gathers raw DOM facts;
//! the selection rules live here so they can be tested without a browser.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::browser::Page;
use crate::core::Result;

/// Reads raw facts in document order. Returned as a JSON string so every
/// driver hands it back unchanged.
const PROBE_JS: &str = r#"
(() => {
  const text = (el) => {
    try {
      if (el.tagName === 'INPUT') return (el.value || '').trim();
      return (el.innerText || el.textContent || '').trim();
    } catch (_) {
      return '';
    }
  };
  const forms = [...document.querySelectorAll('form')].map((form) => ({
    id: form.id || null,
    class_name: typeof form.className === 'string' ? form.className : null,
    fields: [...form.querySelectorAll('input, textarea, select')].map((f) => ({
      name: f.getAttribute('name'),
      id: f.id || null,
    })),
    buttons: [...form.querySelectorAll('button, input[type=submit]')].map(text),
  }));
  return JSON.stringify({
    forms,
    links: [...document.querySelectorAll('a')].map(text),
    buttons: [...document.querySelectorAll('button, input[type=submit]')].map(text),
  });
})()
"#;

/// One form on the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDescriptor {
    /// Best-effort selector: `#id`, then `.first-class`, then `form`
    pub form_selector: String,
    /// Field names in document order; `name`, then `id`, else empty
    pub fields: Vec<String>,
    pub buttons: Vec<String>,
}

/// Structured snapshot of the interactive elements on a page.
///
/// In-form buttons appear both under their form and in the page-wide
/// `buttons` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub forms: Vec<FormDescriptor>,
    pub links: Vec<String>,
    pub buttons: Vec<String>,
}

impl PageSummary {
    /// Compact JSON for the reasoner
    pub fn to_prompt(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty() && self.links.is_empty() && self.buttons.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawField {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawForm {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    class_name: Option<String>,
    #[serde(default)]
    fields: Vec<RawField>,
    #[serde(default)]
    buttons: Vec<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFacts {
    #[serde(default)]
    forms: Vec<RawForm>,
    #[serde(default)]
    links: Vec<Option<String>>,
    #[serde(default)]
    buttons: Vec<Option<String>>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn texts(raw: Vec<Option<String>>) -> Vec<String> {
    raw.into_iter().map(Option::unwrap_or_default).collect()
}

impl From<RawForm> for FormDescriptor {
    fn from(form: RawForm) -> Self {
        let form_selector = if let Some(id) = non_empty(form.id.as_deref()) {
            format!("#{}", id)
        } else if let Some(class) = non_empty(form.class_name.as_deref())
            .and_then(|c| c.split_whitespace().next())
        {
            format!(".{}", class)
        } else {
            "form".to_string()
        };

        let fields = form
            .fields
            .into_iter()
            .map(|f| {
                non_empty(f.name.as_deref())
                    .or_else(|| non_empty(f.id.as_deref()))
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();

        Self {
            form_selector,
            fields,
            buttons: texts(form.buttons),
        }
    }
}

impl From<RawFacts> for PageSummary {
    fn from(facts: RawFacts) -> Self {
        Self {
            forms: facts.forms.into_iter().map(FormDescriptor::from).collect(),
            links: texts(facts.links),
            buttons: texts(facts.buttons),
        }
    }
}

/// Build a summary from the probe's output
pub fn summarize(raw: Value) -> PageSummary {
    let raw = match raw {
        Value::String(encoded) => serde_json::from_str(&encoded).unwrap_or(Value::Null),
        other => other,
    };
    match serde_json::from_value::<RawFacts>(raw) {
        Ok(facts) => facts.into(),
        Err(e) => {
            debug!("unreadable page facts: {}", e);
            PageSummary::default()
        }
    }
}

/// Produces [`PageSummary`] values from a live page
#[derive(Debug, Clone, Copy, Default)]
pub struct PageObserver;

impl PageObserver {
    pub fn new() -> Self {
        Self
    }

    /// Summarize the page as it is now.
    ///
    /// A probe that fails on an otherwise healthy page yields an empty
    /// summary; a dead page is an error.
    pub async fn observe(&self, page: &dyn Page) -> Result<PageSummary> {
        match page.evaluate(PROBE_JS).await {
            Ok(raw) => {
                let summary = summarize(raw);
                debug!(
                    forms = summary.forms.len(),
                    links = summary.links.len(),
                    buttons = summary.buttons.len(),
                    "observed page"
                );
                Ok(summary)
            }
            Err(e) if e.is_recoverable() => {
                warn!("page observation failed: {}", e);
                Ok(PageSummary::default())
            }
            Err(e) => Err(e),
        }
    }
}
