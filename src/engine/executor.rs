//! Instruction executor
//!
//! Realizes one instruction against a live page. Every outcome is either a
//! success (optionally with an [`ExecutionResult`]) or a logged soft-failure;
//! only defects such as a dead page are returned as errors.

use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{Locator, Page};
use crate::core::config::BrowserConfig;
use crate::core::{ExecutionResult, PilotError, Result};
use crate::engine::strategy::{
    click_chain, fill_chain, ChainOutcome, ClickTarget, FillTarget, StrategyChain,
};
use crate::instruction::{Instruction, RawInstruction};

/// Executes instructions one at a time against a [`Page`]
#[derive(Debug, Clone)]
pub struct InstructionExecutor {
    locator_timeout: Duration,
    navigation_timeout: Duration,
    click_chain: StrategyChain<ClickTarget>,
    fill_chain: StrategyChain<FillTarget>,
}

impl InstructionExecutor {
    pub fn new(locator_timeout: Duration, navigation_timeout: Duration) -> Self {
        Self {
            locator_timeout,
            navigation_timeout,
            click_chain: click_chain(),
            fill_chain: fill_chain(),
        }
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        Self::new(config.locator_timeout(), config.navigation_timeout())
    }

    /// Convert and execute a wire instruction.
    ///
    /// Unknown actions and arguments that do not fit the action are logged
    /// and skipped.
    pub async fn dispatch(
        &self,
        page: &dyn Page,
        raw: &RawInstruction,
    ) -> Result<Option<ExecutionResult>> {
        match Instruction::try_from(raw.clone()) {
            Ok(instruction) => self.execute(page, &instruction).await,
            Err(e) => {
                warn!(
                    action = %raw.action,
                    args = %raw.args_display(),
                    "skipping instruction: {}",
                    e
                );
                Ok(None)
            }
        }
    }

    /// Execute one instruction.
    ///
    /// Returns `Ok(None)` for non-producing actions and soft-failures.
    pub async fn execute(
        &self,
        page: &dyn Page,
        instruction: &Instruction,
    ) -> Result<Option<ExecutionResult>> {
        let kind = instruction.kind();
        debug!(action = %kind, args = %instruction.args_display(), "executing");

        match self.perform(page, instruction).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_recoverable() => {
                warn!(action = %kind, args = %instruction.args_display(), "soft-failure: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn perform(
        &self,
        page: &dyn Page,
        instruction: &Instruction,
    ) -> Result<Option<ExecutionResult>> {
        match instruction {
            Instruction::Navigate { url } => {
                bounded(self.navigation_timeout, url, page.goto(url)).await?;
                info!("navigated to {}", url);
                Ok(None)
            }
            Instruction::Click { text, selector } => {
                let target = ClickTarget {
                    text: text.clone(),
                    selector: selector.clone(),
                };
                self.click(page, &target).await?;
                Ok(None)
            }
            Instruction::Fill {
                text,
                label,
                selector,
            } => {
                let target = FillTarget {
                    label: label.clone(),
                    selector: selector.clone(),
                };
                self.fill(page, &target, text).await?;
                Ok(None)
            }
            Instruction::Wait {
                timeout_ms,
                selector,
            } => {
                let limit = Duration::from_millis(*timeout_ms);
                match selector {
                    Some(selector) => {
                        bounded(limit, selector, page.wait_for_selector(selector)).await?
                    }
                    None => tokio::time::sleep(limit).await,
                }
                Ok(None)
            }
            Instruction::ExtractText { selector } => {
                self.wait_present(page, selector).await?;
                let text =
                    bounded(self.locator_timeout, selector, page.text_content(selector)).await?;
                Ok(Some(ExecutionResult::ExtractedText(text)))
            }
            Instruction::Screenshot { path, selector } => {
                self.screenshot(page, path, selector.as_deref()).await
            }
            Instruction::Scroll { dx, dy } => {
                bounded(self.locator_timeout, "scroll", page.scroll_by(*dx, *dy)).await?;
                Ok(None)
            }
            Instruction::Done {} => {
                warn!("'done' reached the executor; ignoring");
                Ok(None)
            }
        }
    }

    async fn click(&self, page: &dyn Page, target: &ClickTarget) -> Result<()> {
        let outcome = self
            .click_chain
            .run(target, self.locator_timeout, |locator: Locator| {
                Box::pin(async move { page.click(&locator).await })
            })
            .await?;
        resolved_or_not_found(outcome, "click")
    }

    async fn fill(&self, page: &dyn Page, target: &FillTarget, value: &str) -> Result<()> {
        let outcome = self
            .fill_chain
            .run(target, self.locator_timeout, |locator: Locator| {
                Box::pin(async move { page.fill(&locator, value).await })
            })
            .await?;
        resolved_or_not_found(outcome, "fill")
    }

    async fn screenshot(
        &self,
        page: &dyn Page,
        path: &Path,
        selector: Option<&str>,
    ) -> Result<Option<ExecutionResult>> {
        if let Some(selector) = selector {
            if let Err(e) = self.wait_present(page, selector).await {
                if matches!(e, PilotError::Timeout { .. }) {
                    warn!(selector, path = %path.display(), "screenshot target never appeared");
                    return Ok(None);
                }
                return Err(e);
            }
        }

        let captured = bounded(
            self.navigation_timeout,
            "screenshot",
            page.screenshot(path, selector),
        )
        .await;
        match captured {
            Ok(()) => {}
            // Unwritable target or unreadable element bounds; the page is fine
            Err(e @ (PilotError::Io(_) | PilotError::Json(_))) => {
                warn!(path = %path.display(), "screenshot not captured: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        info!("screenshot saved to {}", path.display());
        Ok(Some(ExecutionResult::Screenshot(path.to_path_buf())))
    }

    async fn wait_present(&self, page: &dyn Page, selector: &str) -> Result<()> {
        bounded(self.locator_timeout, selector, page.wait_for_selector(selector)).await
    }
}

impl Default for InstructionExecutor {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}

/// Run `fut` for at most `limit`
async fn bounded<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| PilotError::timeout(what, limit))?
}

fn resolved_or_not_found(outcome: ChainOutcome, action: &str) -> Result<()> {
    match outcome {
        ChainOutcome::Resolved { .. } => Ok(()),
        ChainOutcome::Exhausted { attempted } if attempted.is_empty() => Err(
            PilotError::invalid_args(action, "no strategy applies to the supplied arguments"),
        ),
        ChainOutcome::Exhausted { attempted } => Err(PilotError::ElementNotFound(format!(
            "{} target after trying {}",
            action,
            attempted.join(", ")
        ))),
    }
}
