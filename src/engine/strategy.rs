//! Ordered fallback chains for ambiguous locators
//!
//! A chain is plain data: an ordered list of named strategies, each turning the
//! instruction's arguments into a [`Locator`] or declining. The chain runner
//! tries applicable locators in order, bounding every attempt, and stops at the
//! first success.

use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{debug, info};

use crate::browser::{Locator, BUTTON_LIKE};
use crate::core::{PilotError, Result};

/// Arguments that drive the click chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    pub text: Option<String>,
    pub selector: Option<String>,
}

/// Arguments that drive the fill chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillTarget {
    pub label: Option<String>,
    pub selector: Option<String>,
}

/// One resolution technique
pub struct Strategy<A> {
    pub name: &'static str,
    /// `None` when the arguments do not enable this strategy
    pub resolve: fn(&A) -> Option<Locator>,
}

impl<A> Clone for Strategy<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            resolve: self.resolve,
        }
    }
}

impl<A> std::fmt::Debug for Strategy<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Result of running a chain to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// A strategy succeeded
    Resolved { strategy: &'static str },
    /// Every applicable strategy failed; names in the order they were tried
    Exhausted { attempted: Vec<&'static str> },
}

/// Ordered list of strategies, tried until one succeeds
#[derive(Debug, Clone)]
pub struct StrategyChain<A> {
    strategies: Vec<Strategy<A>>,
}

impl<A> StrategyChain<A> {
    pub fn new(strategies: Vec<Strategy<A>>) -> Self {
        Self { strategies }
    }

    /// Applicable strategies for `args`, in the order they would run
    pub fn plan(&self, args: &A) -> Vec<(&'static str, Locator)> {
        self.strategies
            .iter()
            .filter_map(|s| (s.resolve)(args).map(|locator| (s.name, locator)))
            .collect()
    }

    /// Try each applicable locator with `attempt`, each bounded by `per_attempt`.
    ///
    /// Recoverable errors and timeouts fall through to the next strategy.
    /// Anything else aborts the chain.
    pub async fn run<'a, F>(
        &self,
        args: &A,
        per_attempt: Duration,
        mut attempt: F,
    ) -> Result<ChainOutcome>
    where
        F: FnMut(Locator) -> BoxFuture<'a, Result<()>>,
    {
        let mut attempted = Vec::new();

        for (name, locator) in self.plan(args) {
            attempted.push(name);
            let described = locator.to_string();

            match tokio::time::timeout(per_attempt, attempt(locator)).await {
                Ok(Ok(())) => {
                    info!(strategy = name, locator = %described, "resolved");
                    return Ok(ChainOutcome::Resolved { strategy: name });
                }
                Ok(Err(e)) if e.is_recoverable() => {
                    debug!(strategy = name, locator = %described, "strategy failed: {}", e);
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    let e = PilotError::timeout(described.clone(), per_attempt);
                    debug!(strategy = name, locator = %described, "strategy failed: {}", e);
                }
            }
        }

        Ok(ChainOutcome::Exhausted { attempted })
    }
}

/// Click order: exact text, button role, link role, text containment, CSS
pub fn click_chain() -> StrategyChain<ClickTarget> {
    StrategyChain::new(vec![
        Strategy {
            name: "exact_text",
            resolve: |t: &ClickTarget| t.text.as_ref().map(Locator::text_exact),
        },
        Strategy {
            name: "button_role",
            resolve: |t: &ClickTarget| t.text.as_ref().map(|text| Locator::role("button", text)),
        },
        Strategy {
            name: "link_role",
            resolve: |t: &ClickTarget| t.text.as_ref().map(|text| Locator::role("link", text)),
        },
        Strategy {
            name: "has_text",
            resolve: |t: &ClickTarget| {
                t.text.as_ref().map(|text| Locator::HasText {
                    scope: BUTTON_LIKE.to_string(),
                    text: text.clone(),
                })
            },
        },
        Strategy {
            name: "css",
            resolve: |t: &ClickTarget| t.selector.as_ref().map(Locator::css),
        },
    ])
}

/// Fill order: accessible label, CSS, `[name='<label>']`
pub fn fill_chain() -> StrategyChain<FillTarget> {
    StrategyChain::new(vec![
        Strategy {
            name: "label",
            resolve: |t: &FillTarget| t.label.clone().map(Locator::Label),
        },
        Strategy {
            name: "css",
            resolve: |t: &FillTarget| t.selector.as_ref().map(Locator::css),
        },
        Strategy {
            name: "name_attribute",
            resolve: |t: &FillTarget| {
                t.label
                    .as_ref()
                    .map(|label| Locator::Css(format!("[name='{}']", label)))
            },
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn click(text: Option<&str>, selector: Option<&str>) -> ClickTarget {
        ClickTarget {
            text: text.map(String::from),
            selector: selector.map(String::from),
        }
    }

    fn names(plan: &[(&'static str, Locator)]) -> Vec<&'static str> {
        plan.iter().map(|(name, _)| *name).collect()
    }

    #[test]
    fn test_click_plan_order() {
        let chain = click_chain();
        let plan = chain.plan(&click(Some("Send"), Some("#send")));
        assert_eq!(
            names(&plan),
            vec!["exact_text", "button_role", "link_role", "has_text", "css"]
        );
        assert_eq!(plan[0].1, Locator::text_exact("Send"));
        assert_eq!(plan[4].1, Locator::css("#send"));
    }

    #[test]
    fn test_click_plan_respects_supplied_args() {
        let chain = click_chain();
        assert_eq!(names(&chain.plan(&click(None, Some("#go")))), vec!["css"]);
        assert_eq!(chain.plan(&click(Some("Go"), None)).len(), 4);
        assert!(chain.plan(&click(None, None)).is_empty());
    }

    #[test]
    fn test_fill_plan_uses_label_as_name_attribute() {
        let chain = fill_chain();
        let target = FillTarget {
            label: Some("email".into()),
            selector: None,
        };
        let plan = chain.plan(&target);
        assert_eq!(names(&plan), vec!["label", "name_attribute"]);
        assert_eq!(plan[1].1, Locator::Css("[name='email']".into()));
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let chain = click_chain();
        let tried = Arc::new(Mutex::new(Vec::new()));

        let outcome = {
            let tried = Arc::clone(&tried);
            chain
                .run(
                    &click(Some("Send"), Some("#send")),
                    Duration::from_millis(200),
                    move |locator| {
                        let tried = Arc::clone(&tried);
                        Box::pin(async move {
                            tried.lock().unwrap().push(locator.clone());
                            match locator {
                                Locator::Role { ref role, .. } if role == "button" => Ok(()),
                                _ => Err(PilotError::ElementNotFound(locator.to_string())),
                            }
                        })
                    },
                )
                .await
                .unwrap()
        };

        assert_eq!(outcome, ChainOutcome::Resolved { strategy: "button_role" });
        let tried = tried.lock().unwrap();
        assert_eq!(tried.len(), 2);
        assert!(!tried.contains(&Locator::css("#send")));
    }

    #[tokio::test]
    async fn test_timeout_falls_through() {
        let chain = fill_chain();
        let target = FillTarget {
            label: Some("Email".into()),
            selector: Some("#email".into()),
        };

        let outcome = chain
            .run(&target, Duration::from_millis(20), |locator| {
                Box::pin(async move {
                    if matches!(locator, Locator::Label(_)) {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    Ok(())
                })
            })
            .await
            .unwrap();

        assert_eq!(outcome, ChainOutcome::Resolved { strategy: "css" });
    }

    #[tokio::test]
    async fn test_exhausted_lists_attempts() {
        let outcome = click_chain()
            .run(&click(Some("Missing"), None), Duration::from_millis(50), |l| {
                Box::pin(async move { Err(PilotError::ElementNotFound(l.to_string())) })
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ChainOutcome::Exhausted {
                attempted: vec!["exact_text", "button_role", "link_role", "has_text"]
            }
        );
    }

    #[tokio::test]
    async fn test_defect_aborts_chain() {
        let err = click_chain()
            .run(&click(Some("Send"), Some("#send")), Duration::from_millis(50), |_| {
                Box::pin(async { Err(PilotError::PageClosed("browser gone".into())) })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PilotError::PageClosed(_)));
    }
}
