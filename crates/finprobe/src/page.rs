//! Page handle: a shared driver plus the suite's timing settings.
//!
//! `Page` is cheap to clone; every page object and locator holds one.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::driver::{AriaRole, PageDriver};
use crate::locator::{Locator, Selector, TextMatch};
use crate::result::{ProbeError, ProbeResult};
use crate::session::StorageState;
use crate::wait::{LoadState, Poller, UrlPattern, DEFAULT_POLL_INTERVAL_MS};

/// Timing and addressing shared by everything bound to one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    /// Application root, without trailing slash
    pub base_url: String,
    /// Auto-wait bound for locator actions
    pub action_timeout: Duration,
    /// Default bound for `expect` assertions
    pub expect_timeout: Duration,
    /// Bound for landmarks after navigation and for URL waits
    pub navigation_timeout: Duration,
    /// Polling interval for every wait
    pub poll_interval: Duration,
}

impl PageSettings {
    /// Settings with default timeouts for `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            action_timeout: Duration::from_secs(15),
            expect_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Set the action bound
    #[must_use]
    pub const fn action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Set the assertion bound
    #[must_use]
    pub const fn expect_timeout(mut self, timeout: Duration) -> Self {
        self.expect_timeout = timeout;
        self
    }

    /// Set the navigation bound
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// A browser page bound to the application under test
#[derive(Debug, Clone)]
pub struct Page {
    driver: Arc<dyn PageDriver>,
    settings: Arc<PageSettings>,
}

impl Page {
    /// Bind a driver to settings
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, settings: PageSettings) -> Self {
        Self {
            driver,
            settings: Arc::new(settings),
        }
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    /// Timing settings
    #[must_use]
    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    /// Absolute URL for an app path; absolute URLs pass through
    #[must_use]
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.is_empty() || path == "/" {
            format!("{}/", self.settings.base_url)
        } else if path.starts_with('/') {
            format!("{}{path}", self.settings.base_url)
        } else {
            format!("{}/{path}", self.settings.base_url)
        }
    }

    /// Navigate to an app path or absolute URL
    pub async fn goto(&self, path: &str) -> ProbeResult<()> {
        let url = self.resolve_url(path);
        debug!(%url, "goto");
        self.driver.goto(&url).await
    }

    /// Current URL
    pub async fn url(&self) -> ProbeResult<String> {
        self.driver.current_url().await
    }

    /// Elements with `role` whose accessible name matches
    #[must_use]
    pub fn get_by_role(&self, role: AriaRole, name: impl Into<TextMatch>) -> Locator {
        Locator::new(
            self.clone(),
            Selector::Role {
                role,
                name: Some(name.into()),
            },
        )
    }

    /// Every element with `role`
    #[must_use]
    pub fn get_by_role_any(&self, role: AriaRole) -> Locator {
        Locator::new(self.clone(), Selector::Role { role, name: None })
    }

    /// Smallest elements whose text matches
    #[must_use]
    pub fn get_by_text(&self, text: impl Into<TextMatch>) -> Locator {
        Locator::new(self.clone(), Selector::Text(text.into()))
    }

    /// Form controls whose label matches
    #[must_use]
    pub fn get_by_label(&self, label: impl Into<TextMatch>) -> Locator {
        Locator::new(self.clone(), Selector::Label(label.into()))
    }

    /// Compound `tag.class` selector
    #[must_use]
    pub fn locator(&self, css: impl Into<String>) -> Locator {
        Locator::new(self.clone(), Selector::Css(css.into()))
    }

    /// Wait until the URL matches, within the navigation bound
    pub async fn wait_for_url(&self, pattern: &UrlPattern) -> ProbeResult<String> {
        self.wait_for_url_within(pattern, self.settings.navigation_timeout)
            .await
    }

    /// Wait until the URL matches, within `timeout`
    pub async fn wait_for_url_within(
        &self,
        pattern: &UrlPattern,
        timeout: Duration,
    ) -> ProbeResult<String> {
        pattern.check()?;
        let poller = Poller::new(timeout, self.settings.poll_interval);
        loop {
            if let Ok(url) = self.driver.current_url().await {
                if pattern.matches(&url) {
                    return Ok(url);
                }
            }
            if poller.expired() {
                return Err(ProbeError::Timeout {
                    what: format!("URL matching {pattern}"),
                    ms: poller.timeout_ms(),
                });
            }
            poller.tick().await;
        }
    }

    /// Unconditional pause
    pub async fn wait_for_timeout(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Wait for a load state within the assertion bound
    pub async fn wait_for_load_state(&self, state: LoadState) -> ProbeResult<()> {
        let poller = Poller::new(self.settings.expect_timeout, self.settings.poll_interval);
        loop {
            if self.driver.load_state_reached(state).await.unwrap_or(false) {
                return Ok(());
            }
            if poller.expired() {
                return Err(ProbeError::Timeout {
                    what: format!("load state {state}"),
                    ms: poller.timeout_ms(),
                });
            }
            poller.tick().await;
        }
    }

    /// PNG screenshot
    pub async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        self.driver.screenshot().await
    }

    /// Cookies and local storage
    pub async fn storage_state(&self) -> ProbeResult<StorageState> {
        self.driver.storage_state().await
    }

    /// Seed cookies and local storage
    pub async fn restore_storage_state(&self, state: &StorageState) -> ProbeResult<()> {
        self.driver.restore_storage_state(state).await
    }

    /// Accept every dialog from now on
    pub async fn accept_dialogs(&self) -> ProbeResult<()> {
        self.driver.accept_dialogs().await
    }

    /// Close the page
    pub async fn close(&self) -> ProbeResult<()> {
        self.driver.close().await
    }
}
