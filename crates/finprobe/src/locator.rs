//! Locator abstraction for element selection and interaction.
//!
//! # Design Philosophy
//!
//! - **Queries, not handles**: a [`Locator`] stores a selector plus
//!   refinements and re-resolves against a fresh snapshot on every use, so it
//!   survives navigations and re-renders.
//! - **Auto-Waiting**: actions poll until the element is actionable or the
//!   bound elapses.
//! - **Strict Selection**: actions fail if more than one element matches.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::debug;

use crate::driver::{AriaRole, ElementSnapshot};
use crate::page::Page;
use crate::pattern::Pattern;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::Poller;

/// How a piece of text is compared against element text or names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// Case-insensitive substring after whitespace normalization
    Contains(String),
    /// Full match after whitespace normalization
    Exact(String),
    /// Regex search, compiled when the matcher is built
    Pattern(Pattern),
}

impl TextMatch {
    /// Case-insensitive substring
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self::Contains(text.into())
    }

    /// Exact, case-sensitive
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact(text.into())
    }

    /// Regex, case-sensitive
    #[must_use]
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern(Pattern::new(pattern))
    }

    /// Regex, case-insensitive
    #[must_use]
    pub fn pattern_ci(pattern: impl AsRef<str>) -> Self {
        Self::Pattern(Pattern::new(format!("(?i){}", pattern.as_ref())))
    }

    /// `Config` error for a pattern that did not compile
    pub fn check(&self) -> ProbeResult<()> {
        match self {
            Self::Pattern(p) => p.check(),
            Self::Contains(_) | Self::Exact(_) => Ok(()),
        }
    }

    /// Check a haystack
    #[must_use]
    pub fn matches(&self, haystack: &str) -> bool {
        let haystack = normalize_whitespace(haystack);
        match self {
            Self::Contains(needle) => haystack
                .to_lowercase()
                .contains(&normalize_whitespace(needle).to_lowercase()),
            Self::Exact(expected) => haystack == normalize_whitespace(expected),
            Self::Pattern(pattern) => pattern.is_match(&haystack),
        }
    }
}

impl From<&str> for TextMatch {
    fn from(text: &str) -> Self {
        Self::Contains(text.to_string())
    }
}

impl From<String> for TextMatch {
    fn from(text: String) -> Self {
        Self::Contains(text)
    }
}

impl std::fmt::Display for TextMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contains(t) => write!(f, "{t:?}"),
            Self::Exact(t) => write!(f, "{t:?}s"),
            Self::Pattern(p) => write!(f, "/{p}/"),
        }
    }
}

/// Collapse whitespace runs to a single space and trim
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// ARIA role with optional accessible-name match; hidden elements never match
    Role {
        /// Role
        role: AriaRole,
        /// Name filter
        name: Option<TextMatch>,
    },
    /// Smallest elements whose text matches
    Text(TextMatch),
    /// Form controls whose label matches
    Label(TextMatch),
    /// Compound `tag.class.class` selector
    Css(String),
}

impl Selector {
    fn matches(&self, el: &ElementSnapshot) -> bool {
        match self {
            Self::Role { role, name } => {
                el.visible
                    && el.role == *role
                    && name.as_ref().map_or(true, |n| n.matches(&el.name))
            }
            Self::Text(m) => !matches!(el.tag.as_str(), "script" | "style") && m.matches(&el.text),
            Self::Label(m) => !el.label.is_empty() && m.matches(&el.label),
            Self::Css(css) => css_matches(css, el),
        }
    }

    fn check(&self) -> ProbeResult<()> {
        match self {
            Self::Role { name: Some(m), .. } | Self::Text(m) | Self::Label(m) => m.check(),
            Self::Role { name: None, .. } | Self::Css(_) => Ok(()),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Role { role, name: None } => write!(f, "role={role}"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "role={role}[name={name}]"),
            Self::Text(m) => write!(f, "text={m}"),
            Self::Label(m) => write!(f, "label={m}"),
            Self::Css(css) => write!(f, "css={css}"),
        }
    }
}

/// Compound selector: optional tag (or `*`) followed by `.class` parts.
/// Anything else is not understood and matches nothing.
fn css_matches(css: &str, el: &ElementSnapshot) -> bool {
    let css = css.trim();
    let valid = !css.is_empty()
        && css
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '*'));
    if !valid {
        return false;
    }
    let mut parts = css.split('.');
    let tag = parts.next().unwrap_or_default();
    if !tag.is_empty() && tag != "*" && !tag.eq_ignore_ascii_case(&el.tag) {
        return false;
    }
    parts.all(|class| !class.is_empty() && el.has_class(class))
}

/// Step applied to the candidate list after the base selector
#[derive(Debug, Clone, PartialEq, Eq)]
enum Refine {
    HasText(TextMatch),
    Nth(usize),
    Last,
    NextSibling,
}

impl std::fmt::Display for Refine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HasText(m) => write!(f, "has-text={m}"),
            Self::Nth(i) => write!(f, "nth={i}"),
            Self::Last => write!(f, "nth=-1"),
            Self::NextSibling => write!(f, "+ *"),
        }
    }
}

/// Element states a locator can wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    /// Present and visible
    Visible,
    /// Absent or not visible
    Hidden,
    /// Present in the DOM
    Attached,
    /// Absent from the DOM
    Detached,
}

/// A declarative, re-resolved reference to an element.
#[derive(Debug, Clone)]
pub struct Locator {
    page: Page,
    selector: Selector,
    refinements: Vec<Refine>,
    timeout: Option<Duration>,
}

impl Locator {
    pub(crate) fn new(page: Page, selector: Selector) -> Self {
        Self {
            page,
            selector,
            refinements: Vec::new(),
            timeout: None,
        }
    }

    fn refine(mut self, step: Refine) -> Self {
        self.refinements.push(step);
        self
    }

    /// Keep only elements whose text matches
    #[must_use]
    pub fn filter_has_text(self, text: impl Into<TextMatch>) -> Self {
        self.refine(Refine::HasText(text.into()))
    }

    /// First match
    #[must_use]
    pub fn first(self) -> Self {
        self.refine(Refine::Nth(0))
    }

    /// Last match
    #[must_use]
    pub fn last(self) -> Self {
        self.refine(Refine::Last)
    }

    /// Match at `index` in document order
    #[must_use]
    pub fn nth(self, index: usize) -> Self {
        self.refine(Refine::Nth(index))
    }

    /// Each match's next element sibling (CSS `a + b`)
    #[must_use]
    pub fn next_sibling(self) -> Self {
        self.refine(Refine::NextSibling)
    }

    /// Override the auto-wait bound for actions on this locator
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Base selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Page this locator queries
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    /// Fails with `Config` if any text pattern in the chain did not compile
    pub fn check(&self) -> ProbeResult<()> {
        self.selector.check()?;
        for step in &self.refinements {
            if let Refine::HasText(m) = step {
                m.check()?;
            }
        }
        Ok(())
    }

    fn action_timeout(&self) -> Duration {
        self.timeout
            .unwrap_or(self.page.settings().action_timeout)
    }

    /// Resolve against a snapshot, in document order
    #[must_use]
    pub fn resolve<'a>(&self, snapshot: &'a [ElementSnapshot]) -> Vec<&'a ElementSnapshot> {
        let mut found: Vec<&ElementSnapshot> = snapshot
            .iter()
            .filter(|el| self.selector.matches(el))
            .collect();

        if matches!(self.selector, Selector::Text(_)) {
            found = smallest_only(snapshot, found);
        }

        for step in &self.refinements {
            found = match step {
                Refine::HasText(m) => found.into_iter().filter(|el| m.matches(&el.text)).collect(),
                Refine::Nth(i) => found.get(*i).copied().into_iter().collect(),
                Refine::Last => found.last().copied().into_iter().collect(),
                Refine::NextSibling => found
                    .into_iter()
                    .filter_map(|el| el.next_sibling.as_deref())
                    .filter_map(|id| snapshot.iter().find(|c| c.id == id))
                    .collect(),
            };
        }
        found
    }

    /// Resolve once; more than one match is a strict-mode violation
    async fn resolve_strict(&self) -> ProbeResult<Option<ElementSnapshot>> {
        self.check()?;
        let snapshot = self.page.driver().snapshot().await?;
        let found = self.resolve(&snapshot);
        match found.len() {
            0 => Ok(None),
            1 => Ok(Some(found[0].clone())),
            count => Err(ProbeError::StrictModeViolation {
                selector: self.to_string(),
                count,
            }),
        }
    }

    /// Poll until the single match satisfies `ready`
    async fn wait_until(
        &self,
        timeout: Duration,
        state: &str,
        ready: impl Fn(&ElementSnapshot) -> bool,
    ) -> ProbeResult<ElementSnapshot> {
        self.check()?;
        let poller = Poller::new(timeout, self.page.settings().poll_interval);
        let mut last_error = None;
        loop {
            match self.resolve_strict().await {
                Ok(Some(el)) if ready(&el) => return Ok(el),
                Ok(_) => {}
                Err(e @ ProbeError::StrictModeViolation { .. }) => return Err(e),
                Err(e) => last_error = Some(e.to_string()),
            }
            if poller.expired() {
                let what = match last_error {
                    Some(err) => format!("{self} to be {state} (last error: {err})"),
                    None => format!("{self} to be {state}"),
                };
                return Err(ProbeError::Timeout {
                    what,
                    ms: poller.timeout_ms(),
                });
            }
            poller.tick().await;
        }
    }

    /// Click once visible and enabled
    pub async fn click(&self) -> ProbeResult<()> {
        let el = self
            .wait_until(self.action_timeout(), "clickable", |el| el.visible && el.enabled)
            .await?;
        debug!(locator = %self, "click");
        self.page.driver().click(&el.id).await
    }

    /// Replace the field value once visible and enabled
    pub async fn fill(&self, value: &str) -> ProbeResult<()> {
        let el = self
            .wait_until(self.action_timeout(), "editable", |el| el.visible && el.enabled)
            .await?;
        debug!(locator = %self, value, "fill");
        self.page.driver().fill(&el.id, value).await
    }

    /// Empty the field
    pub async fn clear(&self) -> ProbeResult<()> {
        self.fill("").await
    }

    /// Choose an option by value or label
    pub async fn select_option(&self, value: &str) -> ProbeResult<()> {
        let el = self
            .wait_until(self.action_timeout(), "selectable", |el| el.visible && el.enabled)
            .await?;
        if !value.is_empty() && !el.options.is_empty() && el.find_option(value).is_none() {
            return Err(ProbeError::driver(format!(
                "{self} has no option {value:?}"
            )));
        }
        debug!(locator = %self, value, "select_option");
        self.page.driver().select_option(&el.id, value).await
    }

    /// Tick a checkbox; no-op if already checked
    pub async fn check(&self) -> ProbeResult<()> {
        let el = self
            .wait_until(self.action_timeout(), "checkable", |el| el.visible && el.enabled)
            .await?;
        if el.checked {
            return Ok(());
        }
        self.page.driver().click(&el.id).await
    }

    /// Wait for an element state
    pub async fn wait_for(&self, state: ElementState) -> ProbeResult<()> {
        self.wait_for_within(state, self.action_timeout()).await
    }

    /// Wait for an element state with an explicit bound
    pub async fn wait_for_within(&self, state: ElementState, timeout: Duration) -> ProbeResult<()> {
        match state {
            ElementState::Visible => self
                .wait_until(timeout, "visible", |el| el.visible)
                .await
                .map(|_| ()),
            ElementState::Attached => self.wait_until(timeout, "attached", |_| true).await.map(|_| ()),
            ElementState::Hidden | ElementState::Detached => {
                let label = if state == ElementState::Hidden {
                    "hidden"
                } else {
                    "detached"
                };
                self.check()?;
                let poller = Poller::new(timeout, self.page.settings().poll_interval);
                loop {
                    match self.resolve_strict().await {
                        Ok(None) => return Ok(()),
                        Ok(Some(el)) if state == ElementState::Hidden && !el.visible => {
                            return Ok(())
                        }
                        Err(e @ ProbeError::StrictModeViolation { .. }) => return Err(e),
                        _ => {}
                    }
                    if poller.expired() {
                        return Err(ProbeError::Timeout {
                            what: format!("{self} to be {label}"),
                            ms: poller.timeout_ms(),
                        });
                    }
                    poller.tick().await;
                }
            }
        }
    }

    /// Whether the element is visible right now (no waiting)
    pub async fn is_visible(&self) -> ProbeResult<bool> {
        Ok(self.resolve_strict().await?.is_some_and(|el| el.visible))
    }

    /// Whether the element is enabled right now (no waiting)
    pub async fn is_enabled(&self) -> ProbeResult<bool> {
        Ok(self.resolve_strict().await?.is_some_and(|el| el.enabled))
    }

    /// Number of matches right now
    pub async fn count(&self) -> ProbeResult<usize> {
        self.check()?;
        let snapshot = self.page.driver().snapshot().await?;
        Ok(self.resolve(&snapshot).len())
    }

    /// Text content once attached
    pub async fn text_content(&self) -> ProbeResult<String> {
        let el = self
            .wait_until(self.action_timeout(), "attached", |_| true)
            .await?;
        Ok(el.text)
    }

    /// Form value once attached
    pub async fn input_value(&self) -> ProbeResult<String> {
        let el = self
            .wait_until(self.action_timeout(), "attached", |_| true)
            .await?;
        Ok(el.value)
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.selector)?;
        for step in &self.refinements {
            write!(f, " >> {step}")?;
        }
        Ok(())
    }
}

/// Drop candidates that have a matching descendant
fn smallest_only<'a>(
    snapshot: &'a [ElementSnapshot],
    candidates: Vec<&'a ElementSnapshot>,
) -> Vec<&'a ElementSnapshot> {
    let parents: HashMap<&str, Option<&str>> = snapshot
        .iter()
        .map(|el| (el.id.as_str(), el.parent.as_deref()))
        .collect();
    let ids: HashSet<&str> = candidates.iter().map(|el| el.id.as_str()).collect();
    let mut has_matching_descendant: HashSet<&str> = HashSet::new();
    for el in candidates.iter().copied() {
        let mut parent = el.parent.as_deref();
        while let Some(pid) = parent {
            if ids.contains(pid) && !has_matching_descendant.insert(pid) {
                break;
            }
            parent = parents.get(pid).copied().flatten();
        }
    }
    candidates
        .into_iter()
        .filter(|el| !has_matching_descendant.contains(el.id.as_str()))
        .collect()
}
