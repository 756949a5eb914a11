//! Per-test harness.
//!
//! A [`TestContext`] resolves which project runs a suite, builds the page,
//! restores the saved session for projects that use one, and turns a test
//! body into a [`TestResultEntry`] carrying its step tree and, on failure,
//! a screenshot. A failing body is rerun up to `retries` more times.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::instrument::WithSubscriber;
use tracing::{info, warn};

use crate::config::{ProjectConfig, SuiteConfig};
use crate::driver::PageDriver;
use crate::logging;
use crate::page::Page;
use crate::reporter::{save_failure_screenshot, Reporter, TestResultEntry};
use crate::result::{ProbeError, ProbeResult};
use crate::session::SessionArtifact;
use crate::step::{StepNode, StepRecorder};

/// Browser suites only run when this is set to a truthy value
pub const E2E_ENV: &str = "FINPROBE_E2E";

/// Whether browser suites should run in this process
#[must_use]
pub fn e2e_enabled() -> bool {
    std::env::var(E2E_ENV).is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Bounds how many contexts are open at once in this process.
///
/// Configs with the same nonzero `workers` share one pool; zero means no
/// bound.
async fn worker_slot(workers: usize) -> ProbeResult<Option<OwnedSemaphorePermit>> {
    static POOLS: OnceLock<Mutex<HashMap<usize, Arc<Semaphore>>>> = OnceLock::new();
    if workers == 0 {
        return Ok(None);
    }
    let pool = POOLS
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(workers)
        .or_insert_with(|| Arc::new(Semaphore::new(workers)))
        .clone();
    let permit = pool
        .acquire_owned()
        .await
        .map_err(|e| ProbeError::unexpected(format!("worker pool closed: {e}")))?;
    Ok(Some(permit))
}

#[derive(Debug)]
pub struct TestContext {
    config: SuiteConfig,
    project: ProjectConfig,
    suite: String,
    page: Page,
    session: Arc<SessionArtifact>,
    _slot: Option<OwnedSemaphorePermit>,
}

impl TestContext {
    /// Context for `suite` over an already running driver
    pub async fn with_driver(
        config: SuiteConfig,
        suite: &str,
        driver: Arc<dyn PageDriver>,
    ) -> ProbeResult<Self> {
        let slot = worker_slot(config.workers).await?;
        Self::build(config, suite, driver, slot).await
    }

    async fn build(
        config: SuiteConfig,
        suite: &str,
        driver: Arc<dyn PageDriver>,
        slot: Option<OwnedSemaphorePermit>,
    ) -> ProbeResult<Self> {
        let project = config
            .project_for(suite)
            .cloned()
            .ok_or_else(|| ProbeError::config(format!("no project runs suite {suite:?}")))?;
        let page = Page::new(driver, config.page_settings());
        let session = SessionArtifact::shared(&config.session_path);

        if project.uses_session {
            if !session.exists() {
                return Err(ProbeError::Session {
                    message: format!(
                        "{} is missing; run the setup project first",
                        session.path().display()
                    ),
                });
            }
            page.restore_storage_state(session.load().await?).await?;
        }
        page.accept_dialogs().await?;

        info!(suite, project = %project.name, base_url = %config.base_url, "test context ready");
        Ok(Self {
            config,
            project,
            suite: suite.to_string(),
            page,
            session,
            _slot: slot,
        })
    }

    /// Load configuration from the environment and launch Chromium
    #[cfg(feature = "browser")]
    pub async fn launch(suite: &str) -> ProbeResult<Self> {
        Self::launch_with(SuiteConfig::load(None)?, suite).await
    }

    /// Launch Chromium for `suite` under an already resolved configuration
    #[cfg(feature = "browser")]
    pub async fn launch_with(config: SuiteConfig, suite: &str) -> ProbeResult<Self> {
        config.validate()?;
        let slot = worker_slot(config.workers).await?;
        let driver = crate::chromium::ChromiumDriver::launch(config.driver_config()).await?;
        Self::build(config, suite, Arc::new(driver), slot).await
    }

    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    #[must_use]
    pub const fn project(&self) -> &ProjectConfig {
        &self.project
    }

    #[must_use]
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Per-test bound for this suite's project
    #[must_use]
    pub fn test_timeout(&self) -> Duration {
        self.config.test_timeout_for(&self.suite)
    }

    /// The session file, shared with every context in the process
    #[must_use]
    pub fn session(&self) -> &SessionArtifact {
        &self.session
    }

    /// Run one test body under the project bound, recording its steps.
    ///
    /// A failing body is run again, up to `retries` more times; the entry
    /// keeps the last attempt's steps and counts the attempts. Never fails
    /// itself: the body's error lands in the returned entry.
    pub async fn run<F, Fut>(&self, test: &str, body: F) -> TestResultEntry
    where
        F: Fn(Page) -> Fut,
        Fut: Future<Output = ProbeResult<()>>,
    {
        let allowed = self.config.retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            let (outcome, duration, steps) = self.run_once(test, &body).await;
            let entry = match outcome {
                Ok(()) => {
                    info!(test, attempt, ?duration, "passed");
                    TestResultEntry::passed(test, duration)
                }
                Err(error) if attempt < allowed => {
                    warn!(test, attempt, %error, "failed, retrying");
                    attempt += 1;
                    continue;
                }
                Err(error) => {
                    warn!(test, attempt, %error, "failed");
                    let entry = TestResultEntry::failed(test, duration, &error);
                    match self.capture_failure(test).await {
                        Some(path) => entry.with_screenshot(path),
                        None => entry,
                    }
                }
            };
            return entry.with_steps(steps).with_attempts(attempt);
        }
    }

    async fn run_once<F, Fut>(
        &self,
        test: &str,
        body: &F,
    ) -> (ProbeResult<()>, Duration, Vec<StepNode>)
    where
        F: Fn(Page) -> Fut,
        Fut: Future<Output = ProbeResult<()>>,
    {
        let recorder = StepRecorder::new();
        let bound = self.test_timeout();
        let started = Instant::now();

        let outcome = tokio::time::timeout(bound, body(self.page.clone()))
            .with_subscriber(logging::test_subscriber(recorder.clone()))
            .await
            .unwrap_or_else(|_| {
                Err(ProbeError::Timeout {
                    what: format!("test {test:?} to finish"),
                    ms: bound.as_millis() as u64,
                })
            });
        (outcome, started.elapsed(), recorder.take())
    }

    async fn capture_failure(&self, test: &str) -> Option<PathBuf> {
        if !self.config.screenshot_on_failure {
            return None;
        }
        let dir = self.config.artifacts_dir.join(&self.suite);
        let saved = match self.page.screenshot().await {
            Ok(png) => save_failure_screenshot(&dir, test, &png),
            Err(e) => Err(e),
        };
        match saved {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(test, error = %e, "no failure screenshot");
                None
            }
        }
    }

    /// Collect `entries` into a report written under the artifacts directory
    pub fn write_report(&self, entries: Vec<TestResultEntry>) -> ProbeResult<Reporter> {
        let mut reporter = Reporter::new(&self.suite);
        for entry in entries {
            reporter.record(entry);
        }
        reporter.write_to(&self.config.artifacts_dir.join(&self.suite))?;
        info!(suite = %self.suite, summary = %reporter.summary(), "report written");
        Ok(reporter)
    }

    pub async fn close(self) -> ProbeResult<()> {
        self.page.close().await
    }
}
