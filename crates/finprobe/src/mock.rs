//! ScriptedDriver - an in-memory page for exercising page objects without a
//! browser.
//!
//! Screens are element lists keyed by URL path. Clicks and value changes fire
//! scripted [`Reaction`]s whose [`Effect`]s may be delayed on the tokio clock,
//! which makes race timing reproducible under `start_paused` tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::driver::{AriaRole, ElementSnapshot, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use crate::session::StorageState;
use crate::wait::LoadState;

/// PNG signature returned as the scripted screenshot
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// State change applied by a reaction
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Client-side navigation to a path (or absolute URL)
    Navigate(String),
    /// Make an element visible
    Show(String),
    /// Make an element invisible
    Hide(String),
    /// Append an element to the current DOM
    Insert(ElementSnapshot),
    /// Remove an element from the current DOM
    Remove(String),
    /// Append an element to a screen template so later visits render it
    AddToScreen(String, ElementSnapshot),
    /// Replace an element's text
    SetText(String, String),
    /// Replace an element's value
    SetValue(String, String),
    /// Enable an element
    Enable(String),
    /// Disable an element
    Disable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Trigger {
    Click(String),
    Change(String),
}

/// Scripted response to a click or value change.
///
/// For a given trigger the first reaction whose guards hold fires; later ones
/// act as fallbacks.
#[derive(Debug, Clone)]
pub struct Reaction {
    trigger: Trigger,
    guards: Vec<(String, String)>,
    delay: Duration,
    effects: Vec<Effect>,
}

impl Reaction {
    /// React to a click on `id`
    #[must_use]
    pub fn on_click(id: impl Into<String>) -> Self {
        Self::new(Trigger::Click(id.into()))
    }

    /// React to a fill or select on `id`
    #[must_use]
    pub fn on_change(id: impl Into<String>) -> Self {
        Self::new(Trigger::Change(id.into()))
    }

    fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            guards: Vec::new(),
            delay: Duration::ZERO,
            effects: Vec::new(),
        }
    }

    /// Only fire while element `id` holds `value`
    #[must_use]
    pub fn when_value(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.guards.push((id.into(), value.into()));
        self
    }

    /// Apply effects after `delay`
    #[must_use]
    pub const fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Add an effect
    #[must_use]
    pub fn then(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[derive(Debug)]
struct Pending {
    due: Instant,
    effects: Vec<Effect>,
}

#[derive(Debug, Default)]
struct ScriptState {
    origin: String,
    url: String,
    dom: Vec<ElementSnapshot>,
    screens: HashMap<String, Vec<ElementSnapshot>>,
    redirects: HashMap<String, String>,
    reactions: Vec<Reaction>,
    pending: Vec<Pending>,
    calls: Vec<String>,
    storage: StorageState,
    accept_dialogs: bool,
    closed: bool,
}

impl ScriptState {
    fn flush(&mut self) {
        let now = Instant::now();
        self.pending.sort_by_key(|p| p.due);
        while self.pending.first().is_some_and(|p| p.due <= now) {
            let due = self.pending.remove(0);
            for effect in due.effects {
                self.apply(effect);
            }
        }
    }

    fn navigate(&mut self, target: &str) {
        let (origin, path) = split_url(target);
        if !origin.is_empty() {
            self.origin = origin;
        }
        let path = self.redirects.get(&path).cloned().unwrap_or(path);
        self.url = format!("{}{path}", self.origin);
        self.dom = self.screens.get(&path).cloned().unwrap_or_default();
        self.pending.clear();
    }

    fn element_mut(&mut self, id: &str) -> Option<&mut ElementSnapshot> {
        self.dom.iter_mut().find(|el| el.id == id)
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Navigate(target) => self.navigate(&target),
            Effect::Show(id) => {
                if let Some(el) = self.element_mut(&id) {
                    el.visible = true;
                }
            }
            Effect::Hide(id) => {
                if let Some(el) = self.element_mut(&id) {
                    el.visible = false;
                }
            }
            Effect::Insert(el) => self.dom.push(el),
            Effect::Remove(id) => self.dom.retain(|el| el.id != id),
            Effect::AddToScreen(path, el) => self.screens.entry(path).or_default().push(el),
            Effect::SetText(id, text) => {
                if let Some(el) = self.element_mut(&id) {
                    if matches!(el.role, AriaRole::Button | AriaRole::Link | AriaRole::Heading) {
                        el.name.clone_from(&text);
                    }
                    el.text = text;
                }
            }
            Effect::SetValue(id, value) => {
                if let Some(el) = self.element_mut(&id) {
                    el.value = value;
                }
            }
            Effect::Enable(id) => {
                if let Some(el) = self.element_mut(&id) {
                    el.enabled = true;
                }
            }
            Effect::Disable(id) => {
                if let Some(el) = self.element_mut(&id) {
                    el.enabled = false;
                }
            }
        }
    }

    fn fire(&mut self, trigger: &Trigger) {
        let reaction = self
            .reactions
            .iter()
            .find(|r| {
                r.trigger == *trigger
                    && r.guards.iter().all(|(id, want)| {
                        self.dom
                            .iter()
                            .any(|el| el.id == *id && el.value == *want)
                    })
            })
            .cloned();
        let Some(reaction) = reaction else { return };
        if reaction.delay.is_zero() {
            for effect in reaction.effects {
                self.apply(effect);
            }
        } else {
            self.pending.push(Pending {
                due: Instant::now() + reaction.delay,
                effects: reaction.effects,
            });
        }
    }
}

/// Split an absolute URL into `scheme://host` and a path without query or fragment
fn split_url(url: &str) -> (String, String) {
    let (origin, rest) = match url.find("://") {
        Some(idx) => {
            let after = &url[idx + 3..];
            match after.find('/') {
                Some(slash) => (url[..idx + 3 + slash].to_string(), &after[slash..]),
                None => (url.to_string(), "/"),
            }
        }
        None => (String::new(), url),
    };
    let path = rest.split(['?', '#']).next().unwrap_or("/");
    let path = if path.is_empty() { "/" } else { path };
    (origin, path.to_string())
}

/// In-memory scripted page
#[derive(Debug)]
pub struct ScriptedDriver {
    state: Mutex<ScriptState>,
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDriver {
    /// Empty driver at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptState {
                url: "about:blank".to_string(),
                origin: "http://localhost".to_string(),
                ..ScriptState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the elements rendered at `path`
    #[must_use]
    pub fn screen(self, path: impl Into<String>, elements: Vec<ElementSnapshot>) -> Self {
        self.lock().screens.insert(path.into(), elements);
        self
    }

    /// Serve `to` whenever `from` is requested
    #[must_use]
    pub fn redirect(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.lock().redirects.insert(from.into(), to.into());
        self
    }

    /// Register a reaction
    #[must_use]
    pub fn react(self, reaction: Reaction) -> Self {
        self.lock().reactions.push(reaction);
        self
    }

    /// Shorthand for an immediate click reaction
    #[must_use]
    pub fn on_click(self, id: impl Into<String>, effects: Vec<Effect>) -> Self {
        let reaction = effects
            .into_iter()
            .fold(Reaction::on_click(id), Reaction::then);
        self.react(reaction)
    }

    /// Shorthand for a delayed click reaction
    #[must_use]
    pub fn on_click_after(
        self,
        id: impl Into<String>,
        delay: Duration,
        effects: Vec<Effect>,
    ) -> Self {
        let reaction = effects
            .into_iter()
            .fold(Reaction::on_click(id).after(delay), Reaction::then);
        self.react(reaction)
    }

    /// Pre-seed browser storage
    #[must_use]
    pub fn with_storage(self, storage: StorageState) -> Self {
        self.lock().storage = storage;
        self
    }

    /// Recorded driver calls, e.g. `click:save`
    #[must_use]
    pub fn call_history(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Whether any recorded call starts with `prefix`
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.lock().calls.iter().any(|c| c.starts_with(prefix))
    }

    /// Current value of an element in the live DOM
    #[must_use]
    pub fn value_of(&self, id: &str) -> Option<String> {
        let mut state = self.lock();
        state.flush();
        state
            .dom
            .iter()
            .find(|el| el.id == id)
            .map(|el| el.value.clone())
    }

    /// Whether dialogs are being auto-accepted
    #[must_use]
    pub fn accepts_dialogs(&self) -> bool {
        self.lock().accept_dialogs
    }

    /// Whether `close` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("goto:{url}"));
        state.navigate(url);
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let mut state = self.lock();
        state.flush();
        Ok(state.url.clone())
    }

    async fn snapshot(&self) -> ProbeResult<Vec<ElementSnapshot>> {
        let mut state = self.lock();
        state.flush();
        Ok(state.dom.clone())
    }

    async fn click(&self, id: &str) -> ProbeResult<()> {
        let mut state = self.lock();
        state.flush();
        let el = state
            .element_mut(id)
            .ok_or_else(|| ProbeError::ElementNotFound {
                selector: id.to_string(),
            })?;
        if el.role == AriaRole::Checkbox {
            el.checked = !el.checked;
        }
        state.calls.push(format!("click:{id}"));
        state.fire(&Trigger::Click(id.to_string()));
        Ok(())
    }

    async fn fill(&self, id: &str, value: &str) -> ProbeResult<()> {
        let mut state = self.lock();
        state.flush();
        let el = state
            .element_mut(id)
            .ok_or_else(|| ProbeError::ElementNotFound {
                selector: id.to_string(),
            })?;
        el.value = value.to_string();
        state.calls.push(format!("fill:{id}={value}"));
        state.fire(&Trigger::Change(id.to_string()));
        Ok(())
    }

    async fn select_option(&self, id: &str, value: &str) -> ProbeResult<()> {
        let mut state = self.lock();
        state.flush();
        let el = state
            .element_mut(id)
            .ok_or_else(|| ProbeError::ElementNotFound {
                selector: id.to_string(),
            })?;
        let chosen = if value.is_empty() {
            String::new()
        } else {
            match el.find_option(value) {
                Some(option) => option.value.clone(),
                None if el.options.is_empty() => value.to_string(),
                None => {
                    return Err(ProbeError::driver(format!(
                        "select {id} has no option {value:?}"
                    )))
                }
            }
        };
        el.value.clone_from(&chosen);
        state.calls.push(format!("select:{id}={chosen}"));
        state.fire(&Trigger::Change(id.to_string()));
        Ok(())
    }

    async fn load_state_reached(&self, _state: LoadState) -> ProbeResult<bool> {
        Ok(true)
    }

    async fn storage_state(&self) -> ProbeResult<StorageState> {
        Ok(self.lock().storage.clone())
    }

    async fn restore_storage_state(&self, storage: &StorageState) -> ProbeResult<()> {
        let mut state = self.lock();
        state.calls.push("restore_storage_state".to_string());
        state.storage = storage.clone();
        Ok(())
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        self.lock().calls.push("screenshot".to_string());
        Ok(PNG_SIGNATURE.to_vec())
    }

    async fn accept_dialogs(&self) -> ProbeResult<()> {
        let mut state = self.lock();
        state.calls.push("accept_dialogs".to_string());
        state.accept_dialogs = true;
        Ok(())
    }

    async fn close(&self) -> ProbeResult<()> {
        let mut state = self.lock();
        state.calls.push("close".to_string());
        state.closed = true;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn login_screen() -> Vec<ElementSnapshot> {
        vec![
            ElementSnapshot::input("email", "email").label("Email Address"),
            ElementSnapshot::new("signin", "button").text("Sign In"),
            ElementSnapshot::new("error", "p").text("Invalid credentials").hidden(),
        ]
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_split_url() {
            assert_eq!(
                split_url("https://app.test/en/dashboard?x=1"),
                ("https://app.test".to_string(), "/en/dashboard".to_string())
            );
            assert_eq!(
                split_url("https://app.test"),
                ("https://app.test".to_string(), "/".to_string())
            );
            assert_eq!(split_url("/login#top"), (String::new(), "/login".to_string()));
        }
    }

    mod reaction_tests {
        use super::*;

        #[tokio::test]
        async fn test_guarded_reaction_picks_first_match() {
            let driver = ScriptedDriver::new()
                .screen("/login", login_screen())
                .screen("/en/dashboard", vec![])
                .react(
                    Reaction::on_click("signin")
                        .when_value("email", "test@example.com")
                        .then(Effect::Navigate("/en/dashboard".into())),
                )
                .react(Reaction::on_click("signin").then(Effect::Show("error".into())));

            driver.goto("https://app.test/login").await.unwrap();
            driver.fill("email", "nobody@example.com").await.unwrap();
            driver.click("signin").await.unwrap();
            let dom = driver.snapshot().await.unwrap();
            assert!(dom.iter().any(|el| el.id == "error" && el.visible));

            driver.fill("email", "test@example.com").await.unwrap();
            driver.click("signin").await.unwrap();
            assert_eq!(
                driver.current_url().await.unwrap(),
                "https://app.test/en/dashboard"
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_delayed_effect_applies_on_clock() {
            let driver = ScriptedDriver::new().screen("/login", login_screen()).on_click_after(
                "signin",
                Duration::from_millis(300),
                vec![Effect::Show("error".into())],
            );
            driver.goto("https://app.test/login").await.unwrap();
            driver.click("signin").await.unwrap();

            let visible = |dom: &[ElementSnapshot]| dom.iter().any(|e| e.id == "error" && e.visible);
            assert!(!visible(&driver.snapshot().await.unwrap()));
            tokio::time::sleep(Duration::from_millis(301)).await;
            assert!(visible(&driver.snapshot().await.unwrap()));
        }

        #[tokio::test]
        async fn test_add_to_screen_persists_across_visits() {
            let driver = ScriptedDriver::new()
                .screen("/expenses", vec![ElementSnapshot::new("save", "button").text("Save")])
                .on_click(
                    "save",
                    vec![Effect::AddToScreen(
                        "/expenses".into(),
                        ElementSnapshot::new("row", "h3").text("Coffee"),
                    )],
                );
            driver.goto("https://app.test/expenses").await.unwrap();
            driver.click("save").await.unwrap();
            driver.goto("https://app.test/expenses").await.unwrap();
            assert!(driver.snapshot().await.unwrap().iter().any(|e| e.id == "row"));
        }
    }

    mod control_tests {
        use super::*;

        #[tokio::test]
        async fn test_select_by_label_stores_value() {
            let driver = ScriptedDriver::new().screen(
                "/",
                vec![ElementSnapshot::new("cat", "select")
                    .label("Category")
                    .option("", "All")
                    .option("foodDining", "Food & Dining")],
            );
            driver.goto("https://app.test/").await.unwrap();
            driver.select_option("cat", "Food & Dining").await.unwrap();
            assert_eq!(driver.value_of("cat").as_deref(), Some("foodDining"));
            assert!(driver.select_option("cat", "Travel").await.is_err());
            driver.select_option("cat", "").await.unwrap();
            assert_eq!(driver.value_of("cat").as_deref(), Some(""));
        }

        #[tokio::test]
        async fn test_checkbox_toggles() {
            let driver = ScriptedDriver::new().screen(
                "/",
                vec![ElementSnapshot::input("rec", "checkbox").label("This is recurring income")],
            );
            driver.goto("https://app.test/").await.unwrap();
            driver.click("rec").await.unwrap();
            assert!(driver.snapshot().await.unwrap()[0].checked);
        }

        #[tokio::test]
        async fn test_click_missing_element() {
            let driver = ScriptedDriver::new();
            let err = driver.click("nope").await.unwrap_err();
            assert!(matches!(err, ProbeError::ElementNotFound { .. }));
            assert!(!driver.was_called("click"));
        }

        #[tokio::test]
        async fn test_history_and_screenshot() {
            let driver = ScriptedDriver::new();
            driver.accept_dialogs().await.unwrap();
            let png = driver.screenshot().await.unwrap();
            assert_eq!(&png[1..4], b"PNG");
            assert!(driver.accepts_dialogs());
            assert_eq!(driver.call_history(), vec!["accept_dialogs", "screenshot"]);
        }
    }
}
