//! Reporter - step trees, failure categories and suite summaries.
//!
//! Each finished test becomes a [`TestResultEntry`] carrying the step tree
//! captured by [`crate::step::StepRecorder`]. Failures are sorted into coarse
//! [`FailureCategory`] buckets so flaky infrastructure can be told apart from
//! real regressions at a glance.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::result::{ProbeError, ProbeResult};
use crate::step::{StepNode, StepStatus};

/// Coarse bucket for a failure message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    Auth,
    Navigation,
    Network,
    Timeout,
    Assertion,
    Other,
}

const RULES: &[(FailureCategory, &[&str])] = &[
    (
        FailureCategory::Auth,
        &["login", "auth", "credential", "unauthorized", "401", "session"],
    ),
    (FailureCategory::Navigation, &["navigation", "navigate", "goto"]),
    (
        FailureCategory::Network,
        &["net::", "network", "econnrefused", "connection", "dns", "502", "503"],
    ),
    (FailureCategory::Timeout, &["timeout", "timed out", "exceeded"]),
    (FailureCategory::Assertion, &["assertion", "expected", "expect("]),
];

impl FailureCategory {
    /// First category whose keywords appear in `message`, case-insensitively
    #[must_use]
    pub fn categorize(message: &str) -> Self {
        let lower = message.to_lowercase();
        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map_or(Self::Other, |(category, _)| *category)
    }

    /// Category of a typed error; falls back to its message
    #[must_use]
    pub fn of(error: &ProbeError) -> Self {
        match error {
            ProbeError::NavigationTimeout { .. } => Self::Navigation,
            ProbeError::AssertionFailed { .. } => Self::Assertion,
            ProbeError::RaceTimeout { .. } | ProbeError::Timeout { .. } => Self::Timeout,
            ProbeError::Session { .. } => Self::Auth,
            other => Self::categorize(&other.to_string()),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Navigation => "navigation",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Assertion => "assertion",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

/// One finished test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResultEntry {
    pub name: String,
    pub status: TestStatus,
    #[serde(with = "crate::step::duration_ms")]
    pub duration: Duration,
    pub error: Option<String>,
    pub category: Option<FailureCategory>,
    pub steps: Vec<StepNode>,
    pub screenshot: Option<PathBuf>,
    /// Runs of the body, retries included
    #[serde(default = "first_attempt")]
    pub attempts: u32,
    pub finished_at: DateTime<Utc>,
}

const fn first_attempt() -> u32 {
    1
}

impl TestResultEntry {
    #[must_use]
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            duration,
            error: None,
            category: None,
            steps: Vec::new(),
            screenshot: None,
            attempts: first_attempt(),
            finished_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn failed(name: impl Into<String>, duration: Duration, error: &ProbeError) -> Self {
        Self {
            status: TestStatus::Failed,
            error: Some(error.to_string()),
            category: Some(FailureCategory::of(error)),
            ..Self::passed(name, duration)
        }
    }

    #[must_use]
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Skipped,
            error: Some(reason.into()),
            ..Self::passed(name, Duration::ZERO)
        }
    }

    #[must_use]
    pub fn with_steps(mut self, steps: Vec<StepNode>) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Passed, but only after a retry
    #[must_use]
    pub fn is_flaky(&self) -> bool {
        self.status == TestStatus::Passed && self.attempts > 1
    }

    #[must_use]
    pub fn with_screenshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.screenshot = Some(path.into());
        self
    }
}

/// Indented step tree, one step per line
#[must_use]
pub fn render_steps(steps: &[StepNode]) -> String {
    fn walk(out: &mut String, node: &StepNode, depth: usize) {
        let mark = match &node.status {
            StepStatus::Passed => "✓",
            StepStatus::Failed(_) => "✗",
        };
        let _ = write!(
            out,
            "{:indent$}{mark} {} ({}ms)",
            "",
            node.name,
            node.duration.as_millis(),
            indent = depth * 2
        );
        if let StepStatus::Failed(message) = &node.status {
            let _ = write!(out, ": {message}");
        }
        out.push('\n');
        for child in &node.children {
            walk(out, child, depth + 1);
        }
    }

    let mut out = String::new();
    for node in steps {
        walk(&mut out, node, 0);
    }
    out
}

/// Collected results for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reporter {
    pub suite_name: String,
    /// Distinguishes reports of reruns of the same suite
    pub run_id: Uuid,
    results: Vec<TestResultEntry>,
}

impl Reporter {
    #[must_use]
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            run_id: Uuid::new_v4(),
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, result: TestResultEntry) {
        info!(
            test = %result.name,
            status = ?result.status,
            category = result.category.map(|c| c.as_str()),
            "test finished"
        );
        self.results.push(result);
    }

    #[must_use]
    pub fn results(&self) -> &[TestResultEntry] {
        &self.results
    }

    fn count(&self, status: TestStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Failures per category, in category order
    #[must_use]
    pub fn failures_by_category(&self) -> Vec<(FailureCategory, usize)> {
        RULES
            .iter()
            .map(|(c, _)| *c)
            .chain(std::iter::once(FailureCategory::Other))
            .map(|c| {
                let n = self
                    .results
                    .iter()
                    .filter(|r| r.category == Some(c))
                    .count();
                (c, n)
            })
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: {}/{} passed",
            self.suite_name,
            self.passed_count(),
            self.results.len() - self.count(TestStatus::Skipped)
        );
        let categories = self.failures_by_category();
        if !categories.is_empty() {
            let parts: Vec<String> = categories
                .iter()
                .map(|(c, n)| format!("{c}={n}"))
                .collect();
            let _ = write!(line, " (failures: {})", parts.join(", "));
        }
        let flaky = self.results.iter().filter(|r| r.is_flaky()).count();
        if flaky > 0 {
            let _ = write!(line, " [{flaky} flaky]");
        }
        line
    }

    /// Human-readable report with every failing test's step tree
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = format!("{}\n", self.summary());
        for result in self.results.iter().filter(|r| r.status == TestStatus::Failed) {
            let category = result.category.unwrap_or(FailureCategory::Other);
            let _ = write!(out, "\n[{category}] {}", result.name);
            if result.attempts > 1 {
                let _ = write!(out, " ({} attempts)", result.attempts);
            }
            out.push('\n');
            if let Some(error) = &result.error {
                let _ = writeln!(out, "  {error}");
            }
            if let Some(path) = &result.screenshot {
                let _ = writeln!(out, "  screenshot: {}", path.display());
            }
            out.push_str(&render_steps(&result.steps));
        }
        out
    }

    pub fn render_json(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JUnit XML for CI
    #[must_use]
    pub fn render_junit(&self) -> String {
        let total: Duration = self.results.iter().map(|r| r.duration).sum();
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            xml,
            r#"<testsuite name="{}" id="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.run_id,
            self.results.len(),
            self.failed_count(),
            self.count(TestStatus::Skipped),
            total.as_secs_f64()
        );
        for result in &self.results {
            let _ = writeln!(
                xml,
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&result.name),
                result.duration.as_secs_f64()
            );
            match (result.status, &result.error) {
                (TestStatus::Failed, Some(error)) => {
                    let category = result.category.unwrap_or(FailureCategory::Other);
                    let _ = writeln!(
                        xml,
                        r#"    <failure type="{category}" message="{}">{}</failure>"#,
                        escape_xml(error),
                        escape_xml(&render_steps(&result.steps))
                    );
                }
                (TestStatus::Skipped, _) => xml.push_str("    <skipped/>\n"),
                _ => {}
            }
            xml.push_str("  </testcase>\n");
        }
        xml.push_str("</testsuite>\n");
        xml
    }

    /// Write `report.txt`, `report.json` and `junit.xml` under `dir`
    pub fn write_to(&self, dir: &Path) -> ProbeResult<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join("report.txt"), self.render_text())?;
        std::fs::write(dir.join("report.json"), self.render_json()?)?;
        std::fs::write(dir.join("junit.xml"), self.render_junit())?;
        Ok(())
    }
}

/// Persist a failure screenshot as `<dir>/<test>-<utc>.png`
pub fn save_failure_screenshot(dir: &Path, test: &str, png: &[u8]) -> ProbeResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let safe: String = test
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let path = dir.join(format!("{safe}-{}.png", Utc::now().format("%Y%m%dT%H%M%S%3f")));
    std::fs::write(&path, png)?;
    Ok(path)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
