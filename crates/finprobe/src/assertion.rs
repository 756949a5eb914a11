//! Auto-retrying expectations on locators and page URLs.
//!
//! An expectation polls the live page until it holds or its bound elapses.
//! Running out of time is an [`ProbeError::AssertionFailed`] carrying the last
//! observed state, so verification failures stay distinguishable from action
//! timeouts.

use std::time::Duration;

use crate::driver::ElementSnapshot;
use crate::locator::{Locator, TextMatch};
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{Poller, UrlPattern};

/// Start an expectation on a locator
#[must_use]
pub fn expect(locator: &Locator) -> LocatorExpect {
    LocatorExpect {
        locator: locator.clone(),
        timeout: locator.page().settings().expect_timeout,
        negated: false,
    }
}

/// Start an expectation on the page URL
#[must_use]
pub fn expect_url(page: &Page) -> UrlExpect {
    UrlExpect {
        page: page.clone(),
        timeout: page.settings().expect_timeout,
    }
}

fn single<'a>(
    locator: &Locator,
    found: &[&'a ElementSnapshot],
) -> ProbeResult<Option<&'a ElementSnapshot>> {
    match found {
        [] => Ok(None),
        [el] => Ok(Some(*el)),
        many => Err(ProbeError::StrictModeViolation {
            selector: locator.to_string(),
            count: many.len(),
        }),
    }
}

fn describe(found: &[&ElementSnapshot]) -> String {
    match found {
        [] => "no element matched".to_string(),
        [el] => format!(
            "found <{}> text={:?} value={:?} visible={} enabled={}",
            el.tag, el.text, el.value, el.visible, el.enabled
        ),
        many => format!("{} elements matched", many.len()),
    }
}

/// Pending expectation on one locator
#[derive(Debug, Clone)]
pub struct LocatorExpect {
    locator: Locator,
    timeout: Duration,
    negated: bool,
}

impl LocatorExpect {
    /// Override the bound
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Invert the next check
    #[must_use]
    pub const fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    async fn poll<P>(&self, expectation: String, holds: P) -> ProbeResult<()>
    where
        P: Fn(&[&ElementSnapshot]) -> ProbeResult<bool>,
    {
        self.locator.check()?;
        let page = self.locator.page();
        let poller = Poller::new(self.timeout, page.settings().poll_interval);
        let mut last = String::new();
        loop {
            match page.driver().snapshot().await {
                Ok(snapshot) => {
                    let found = self.locator.resolve(&snapshot);
                    if holds(&found)? != self.negated {
                        return Ok(());
                    }
                    last = describe(&found);
                }
                Err(e) => last = e.to_string(),
            }
            if poller.expired() {
                let not = if self.negated { "not " } else { "" };
                return Err(ProbeError::assertion(format!(
                    "expected {} {not}{expectation} within {}ms; {last}",
                    self.locator,
                    poller.timeout_ms()
                )));
            }
            poller.tick().await;
        }
    }

    fn single_holds<'s>(
        &'s self,
        test: impl Fn(&ElementSnapshot) -> bool + 's,
    ) -> impl Fn(&[&ElementSnapshot]) -> ProbeResult<bool> + 's {
        move |found| Ok(single(&self.locator, found)?.is_some_and(&test))
    }

    pub async fn to_be_visible(&self) -> ProbeResult<()> {
        self.poll("to be visible".into(), self.single_holds(|el| el.visible))
            .await
    }

    /// Absent or not visible
    pub async fn to_be_hidden(&self) -> ProbeResult<()> {
        self.poll("to be hidden".into(), |found| {
            Ok(single(&self.locator, found)?.map_or(true, |el| !el.visible))
        })
        .await
    }

    pub async fn to_be_enabled(&self) -> ProbeResult<()> {
        self.poll("to be enabled".into(), self.single_holds(|el| el.enabled))
            .await
    }

    pub async fn to_be_disabled(&self) -> ProbeResult<()> {
        self.poll("to be disabled".into(), self.single_holds(|el| !el.enabled))
            .await
    }

    pub async fn to_be_checked(&self) -> ProbeResult<()> {
        self.poll("to be checked".into(), self.single_holds(|el| el.checked))
            .await
    }

    /// Whole text equals `text` after whitespace normalization
    pub async fn to_have_text(&self, text: &str) -> ProbeResult<()> {
        self.to_have_text_matching(TextMatch::exact(text)).await
    }

    /// Text satisfies an arbitrary matcher
    pub async fn to_have_text_matching(&self, m: TextMatch) -> ProbeResult<()> {
        let expectation = format!("to have text {m}");
        self.poll(expectation, self.single_holds(move |el| m.matches(&el.text)))
            .await
    }

    /// Text contains `text`, ignoring case
    pub async fn to_contain_text(&self, text: &str) -> ProbeResult<()> {
        self.to_have_text_matching(TextMatch::contains(text)).await
    }

    /// Form value equals `value` exactly
    pub async fn to_have_value(&self, value: &str) -> ProbeResult<()> {
        let expectation = format!("to have value {value:?}");
        self.poll(expectation, self.single_holds(|el| el.value == value))
            .await
    }

    pub async fn to_have_count(&self, count: usize) -> ProbeResult<()> {
        self.poll(format!("to have count {count}"), |found| {
            Ok(found.len() == count)
        })
        .await
    }
}

/// Pending expectation on the page URL
#[derive(Debug, Clone)]
pub struct UrlExpect {
    page: Page,
    timeout: Duration,
}

impl UrlExpect {
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL matches `pattern` within the bound
    pub async fn to_match(&self, pattern: &UrlPattern) -> ProbeResult<()> {
        match self.page.wait_for_url_within(pattern, self.timeout).await {
            Ok(_) => Ok(()),
            Err(ProbeError::Timeout { ms, .. }) => {
                let actual = self.page.url().await.unwrap_or_default();
                Err(ProbeError::assertion(format!(
                    "expected URL to match {pattern} within {ms}ms; was {actual}"
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// URL contains `fragment`
    pub async fn to_contain(&self, fragment: &str) -> ProbeResult<()> {
        self.to_match(&UrlPattern::contains(fragment)).await
    }
}
