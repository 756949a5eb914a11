//! URL patterns, page load states and the polling clock used by the wait
//! helpers on [`crate::Page`].

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::pattern::Pattern;
use crate::result::ProbeResult;

/// Default polling interval for auto-waiting (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Deadline plus polling cadence for one bounded wait.
///
/// Runs on the tokio clock so waits honour paused time in tests.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Poller {
    deadline: Instant,
    interval: Duration,
    timeout: Duration,
}

impl Poller {
    pub(crate) fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            interval,
            timeout,
        }
    }

    pub(crate) fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub(crate) fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Sleep one interval, never past the deadline
    pub(crate) async fn tick(&self) {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(self.interval.min(remaining)).await;
    }
}

/// Page load states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// The `load` event has fired
    #[default]
    Load,
    /// `DOMContentLoaded` has fired
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// No network activity for 500ms
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

impl LoadState {
    /// Event name as the browser reports it
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

/// Pattern a page URL is matched against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Contains substring
    Contains(String),
    /// Regex search anywhere in the URL
    Regex(Pattern),
    /// Glob over the whole URL: `**` spans `/`, `*` does not
    Glob(Pattern),
}

impl UrlPattern {
    /// Glob pattern, e.g. `**/expenses`
    #[must_use]
    pub fn glob(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let regex = glob_to_regex(&pattern);
        Self::Glob(Pattern::translated(pattern, &regex))
    }

    /// Regex pattern
    #[must_use]
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex(Pattern::new(pattern))
    }

    /// Substring pattern
    #[must_use]
    pub fn contains(fragment: impl Into<String>) -> Self {
        Self::Contains(fragment.into())
    }

    /// Any dashboard route under a supported locale prefix
    #[must_use]
    pub fn localized_dashboard() -> Self {
        Self::regex(r".*/(en|es|pt|fr)/dashboard")
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(pattern) | Self::Glob(pattern) => pattern.is_match(url),
        }
    }

    /// `Config` error for a regex that did not compile
    pub fn check(&self) -> ProbeResult<()> {
        match self {
            Self::Regex(pattern) | Self::Glob(pattern) => pattern.check(),
            Self::Exact(_) | Self::Contains(_) => Ok(()),
        }
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "{p}"),
            Self::Contains(p) => write!(f, "*{p}*"),
            Self::Regex(p) => write!(f, "/{p}/"),
            Self::Glob(p) => write!(f, "{p}"),
        }
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod glob_tests {
        use super::*;

        #[test]
        fn test_double_star_prefix() {
            let p = UrlPattern::glob("**/expenses");
            assert!(p.matches("https://app.test/en/expenses"));
            assert!(!p.matches("https://app.test/en/expenses/new"));
        }

        #[test]
        fn test_language_segment() {
            let p = UrlPattern::glob("**/es/**");
            assert!(p.matches("https://app.test/es/summary"));
            assert!(!p.matches("https://app.test/en/summary"));
        }

        #[test]
        fn test_single_star_stops_at_slash() {
            let p = UrlPattern::glob("https://app.test/*/dashboard");
            assert!(p.matches("https://app.test/fr/dashboard"));
            assert!(!p.matches("https://app.test/a/b/dashboard"));
        }

        #[test]
        fn test_special_chars_are_literal() {
            let p = UrlPattern::glob("**/summary?tab=1");
            assert!(p.matches("https://app.test/en/summaryXtab=1"));
            assert!(!p.matches("https://app.test/en/summary"));
            let dots = UrlPattern::glob("https://app.test/**");
            assert!(!dots.matches("https://appXtest/en"));
        }
    }

    mod pattern_tests {
        use super::*;

        #[test]
        fn test_localized_dashboard() {
            let p = UrlPattern::localized_dashboard();
            for lang in ["en", "es", "pt", "fr"] {
                assert!(p.matches(&format!("https://app.test/{lang}/dashboard")));
            }
            assert!(!p.matches("https://app.test/de/dashboard"));
            assert!(!p.matches("https://app.test/login"));
        }

        #[test]
        fn test_invalid_regex_never_matches() {
            let p = UrlPattern::regex("(unclosed");
            assert!(!p.matches("anything"));
            assert!(matches!(p.check(), Err(crate::ProbeError::Config { .. })));
            assert!(UrlPattern::glob("**/(x").check().is_ok());
        }

        #[test]
        fn test_contains_and_exact() {
            assert!(UrlPattern::contains("/es/").matches("https://a/es/x"));
            assert!(UrlPattern::Exact("https://a/".into()).matches("https://a/"));
            assert!(!UrlPattern::Exact("https://a/".into()).matches("https://a/b"));
        }

        #[test]
        fn test_load_state_serde() {
            let s: LoadState = serde_json::from_str("\"networkidle\"").unwrap_or_default();
            assert_eq!(s, LoadState::NetworkIdle);
            assert_eq!(LoadState::DomContentLoaded.to_string(), "DOMContentLoaded");
        }
    }

    proptest! {
        #[test]
        fn prop_glob_without_wildcards_is_exact(path in "[a-z/]{1,20}") {
            let url = format!("https://app.test/{path}");
            prop_assert!(UrlPattern::glob(url.clone()).matches(&url));
            let longer = format!("{url}x");
            prop_assert!(!UrlPattern::glob(url).matches(&longer));
        }

        #[test]
        fn prop_double_star_suffix_matches_any_tail(tail in "[a-z0-9/]{0,20}") {
            let url = format!("https://app.test/es/{tail}");
            prop_assert!(UrlPattern::glob("**/es/**").matches(&url));
        }
    }
}
