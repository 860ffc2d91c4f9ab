//! Page backed by the agent-browser CLI
//!
//! Every page operation is one `agent-browser` invocation in a named session.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::browser::capture;
use crate::browser::page::{Locator, Page};
use crate::core::config::BrowserConfig;
use crate::core::{PilotError, Result};

const BINARY: &str = "agent-browser";

/// Elements treated as button-like by the text-containment strategy
pub const BUTTON_LIKE: &str =
    "button, [role=button], input[type=submit], input[type=button], a";

/// Response from agent-browser --json commands
#[derive(Debug, Deserialize)]
struct JsonResponse {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Page driven through the agent-browser CLI
#[derive(Debug, Clone)]
pub struct AgentBrowserPage {
    /// Session name for isolation
    session_name: String,
    /// Whether to run in headed mode
    headed: bool,
}

impl AgentBrowserPage {
    /// Create a page handle for a session
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            headed: false,
        }
    }

    /// Create a page handle from browser configuration
    pub fn from_config(config: &BrowserConfig) -> Self {
        let mut page = Self::new(config.session_name.clone());
        page.set_headed(config.headed);
        page
    }

    /// Set headed mode
    pub fn set_headed(&mut self, headed: bool) {
        self.headed = headed;
    }

    /// Check if agent-browser is installed
    pub async fn is_available() -> bool {
        Command::new(BINARY)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec!["--session".to_string(), self.session_name.clone()];
        if self.headed {
            args.push("--headed".to_string());
        }
        args
    }

    /// Run an agent-browser command
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(BINARY);
        cmd.args(self.base_args());
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // A timed-out attempt drops this future; the child must go with it.
        cmd.kill_on_drop(true);

        debug!(session = %self.session_name, "agent-browser {}", args.join(" "));

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PilotError::AgentBrowserNotFound
            } else {
                PilotError::browser(format!("Failed to run agent-browser: {}", e))
            }
        })?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            trace!("agent-browser stdout: {}", stdout);
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            Err(classify_failure(&detail))
        }
    }

    /// Capture the full page to `path`
    pub(crate) async fn full_page_screenshot(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy();
        self.run_command(&["screenshot", path.as_ref(), "--full"])
            .await
            .map(|_| ())
    }

    async fn locator_action(
        &self,
        locator: &Locator,
        action: &str,
        value: Option<&str>,
    ) -> Result<()> {
        let value: Vec<&str> = value.into_iter().collect();
        match locator {
            Locator::Text { text, exact } => {
                let mut args = vec!["find", "text", text.as_str(), action];
                args.extend(&value);
                if *exact {
                    args.push("--exact");
                }
                self.run_command(&args).await?;
            }
            Locator::Role { role, name } => {
                let mut args = vec!["find", "role", role.as_str(), action];
                args.extend(&value);
                args.extend(["--name", name.as_str()]);
                self.run_command(&args).await?;
            }
            Locator::Label(label) => {
                let mut args = vec!["find", "label", label.as_str(), action];
                args.extend(&value);
                self.run_command(&args).await?;
            }
            Locator::HasText { scope, text } => {
                let selector = has_text_selector(scope, text);
                let mut args = vec![action, selector.as_str()];
                args.extend(&value);
                self.run_command(&args).await?;
            }
            Locator::Css(selector) => {
                self.run_command(&["scrollintoview", selector.as_str()]).await?;
                let mut args = vec![action, selector.as_str()];
                args.extend(&value);
                self.run_command(&args).await?;
            }
        }
        Ok(())
    }
}

impl Default for AgentBrowserPage {
    fn default() -> Self {
        Self::new("webpilot")
    }
}

#[async_trait]
impl Page for AgentBrowserPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.run_command(&["open", url]).await?;

        // Best effort: some pages never reach network idle
        if let Err(e) = self.run_command(&["wait", "--load", "networkidle"]).await {
            debug!("networkidle wait after {} did not settle: {}", url, e);
        }
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.locator_action(locator, "click", None).await
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        self.locator_action(locator, "fill", Some(value)).await
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        self.run_command(&["wait", selector]).await.map(|_| ())
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             return el ? {{ text: el.textContent }} : null; }})()",
            serde_json::to_string(selector)?
        );
        text_from_eval(self.evaluate(&script).await?, selector)
    }

    async fn screenshot(&self, path: &Path, selector: Option<&str>) -> Result<()> {
        capture::ensure_parent_dir(path)?;
        match selector {
            Some(selector) => capture::element_screenshot(self, path, selector).await,
            None => self.full_page_screenshot(path).await,
        }
    }

    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<()> {
        self.evaluate(&format!("window.scrollBy({}, {})", dx, dy))
            .await
            .map(|_| ())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let output = self.run_command(&["eval", script, "--json"]).await?;
        parse_eval_output(&output)
    }

    async fn close(&self) -> Result<()> {
        self.run_command(&["close"]).await.map(|_| ())
    }
}

/// Map a failed invocation to a soft failure or a dead-session defect
fn classify_failure(detail: &str) -> PilotError {
    let lower = detail.to_lowercase();
    if lower.contains("has been closed")
        || lower.contains("target closed")
        || lower.contains("browser closed")
        || lower.contains("no browser")
    {
        PilotError::PageClosed(detail.to_string())
    } else if lower.contains("no element") || lower.contains("not found") {
        PilotError::ElementNotFound(detail.to_string())
    } else {
        PilotError::browser(format!("agent-browser command failed: {}", detail))
    }
}

/// `button:has-text("Send"), a:has-text("Send"), ...`
fn has_text_selector(scope: &str, text: &str) -> String {
    let quoted = serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text));
    scope
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{}:has-text({})", s, quoted))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `null` means no element; `{text: null}` is an element without text content
fn text_from_eval(value: Value, selector: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Err(PilotError::ElementNotFound(selector.to_string())),
        Value::Object(mut reply) => match reply.remove("text") {
            Some(Value::String(text)) => Ok(Some(text)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Ok(Some(other.to_string())),
        },
        other => Err(PilotError::browser(format!(
            "unexpected text reply: {}",
            other
        ))),
    }
}

fn parse_eval_output(output: &str) -> Result<Value> {
    let trimmed = output.trim();
    match serde_json::from_str::<JsonResponse>(trimmed) {
        Ok(resp) if !resp.success => Err(PilotError::browser(
            resp.error.unwrap_or_else(|| "eval failed".to_string()),
        )),
        Ok(resp) => Ok(match resp.data {
            Some(Value::Object(mut data)) if data.contains_key("result") => {
                data.remove("result").unwrap_or(Value::Null)
            }
            Some(other) => other,
            None => Value::Null,
        }),
        Err(_) => Ok(serde_json::from_str(trimmed)
            .unwrap_or_else(|_| Value::String(trimmed.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_creation() {
        let page = AgentBrowserPage::new("test-session");
        assert_eq!(page.session_name, "test-session");
        assert!(!page.headed);
        assert_eq!(page.base_args(), vec!["--session", "test-session"]);
    }

    #[test]
    fn test_headed_from_config() {
        let config = BrowserConfig {
            session_name: "s".into(),
            headed: true,
            ..BrowserConfig::default()
        };
        let page = AgentBrowserPage::from_config(&config);
        assert_eq!(page.base_args(), vec!["--session", "s", "--headed"]);
    }

    #[test]
    fn test_has_text_selector() {
        assert_eq!(
            has_text_selector("button, a", "Send \"now\""),
            r#"button:has-text("Send \"now\""), a:has-text("Send \"now\"")"#
        );
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure("Target page, context or browser has been closed"),
            PilotError::PageClosed(_)
        ));
        assert!(matches!(
            classify_failure("Element not found: #missing"),
            PilotError::ElementNotFound(_)
        ));
        assert!(classify_failure("strict mode violation").is_recoverable());
    }

    #[test]
    fn test_text_eval_reply() {
        assert_eq!(
            text_from_eval(json!({"text": "Contact us"}), "h1").unwrap(),
            Some("Contact us".to_string())
        );
        assert_eq!(text_from_eval(json!({"text": null}), "#spacer").unwrap(), None);
        assert!(matches!(
            text_from_eval(Value::Null, "#gone"),
            Err(PilotError::ElementNotFound(selector)) if selector == "#gone"
        ));
    }

    #[test]
    fn test_parse_eval_output() {
        assert_eq!(
            parse_eval_output(r#"{"success":true,"data":{"result":{"a":1}}}"#).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            parse_eval_output(r#"{"success":true,"data":[1,2]}"#).unwrap(),
            json!([1, 2])
        );
        assert!(parse_eval_output(r#"{"success":false,"error":"boom"}"#).is_err());
        assert_eq!(parse_eval_output("42\n").unwrap(), json!(42));
        assert_eq!(parse_eval_output("plain").unwrap(), json!("plain"));
    }
}
