//! Shared setup for the browser suites.
//!
//! Every suite skips (passes without touching a browser) unless
//! `FINPROBE_E2E=1` is set.

#![allow(dead_code)]

use std::future::Future;

use finprobe::reporter::render_steps;
use finprobe::{logging, Page, ProbeResult, TestContext, TestResultEntry, TestStatus};

/// Context for `suite`, or `None` when browser suites are switched off
pub async fn context(suite: &str) -> Option<TestContext> {
    logging::init_for_tests();
    if !finprobe::e2e_enabled() {
        eprintln!("skipping {suite}: set {}=1 to run browser suites", finprobe::fixture::E2E_ENV);
        return None;
    }
    match TestContext::launch(suite).await {
        Ok(ctx) => Some(ctx),
        Err(e) => panic!("cannot start {suite}: {e}"),
    }
}

/// Fail with the error and the step tree that led to it
pub fn assert_passed(entry: &TestResultEntry) {
    assert!(
        entry.status == TestStatus::Passed,
        "{} failed: {}\n{}",
        entry.name,
        entry.error.as_deref().unwrap_or_default(),
        render_steps(&entry.steps)
    );
}

/// Run one case in a fresh browser context, retrying per the config
pub async fn run_case<F, Fut>(suite: &str, test: &str, body: F)
where
    F: Fn(Page) -> Fut,
    Fut: Future<Output = ProbeResult<()>>,
{
    let Some(ctx) = context(suite).await else {
        return;
    };
    let entry = ctx.run(test, body).await;
    if let Err(e) = ctx.close().await {
        eprintln!("closing {suite}: {e}");
    }
    assert_passed(&entry);
}
