//! PageDriver - the browser seam.
//!
//! Everything above this trait (locators, page objects, races) is written
//! against [`ElementSnapshot`]s, so selector resolution happens in Rust and is
//! shared by every implementation:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Locator / Expect / Race                                    │
//! │        │  resolve(selector, refinements) over snapshots     │
//! │        ▼                                                    │
//! │  PageDriver (trait)                                         │
//! │   ├─ ChromiumDriver   CDP via chromiumoxide (feature)       │
//! │   └─ ScriptedDriver   in-memory DOM for flow tests          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::result::ProbeResult;
use crate::session::StorageState;
use crate::wait::LoadState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ARIA role of an element, explicit or implicit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AriaRole {
    Alert,
    Button,
    Cell,
    Checkbox,
    Combobox,
    Dialog,
    Heading,
    Img,
    Link,
    List,
    Listitem,
    Main,
    Navigation,
    Option,
    Paragraph,
    Radio,
    Region,
    Row,
    Spinbutton,
    Status,
    Tab,
    Textbox,
    Generic,
    #[default]
    #[serde(other)]
    Unknown,
}

impl AriaRole {
    /// Implicit role for a tag name and (for inputs) its `type` attribute.
    ///
    /// Password and date inputs count as textboxes so they can be found by
    /// their label the same way plain text fields are.
    #[must_use]
    pub fn implicit(tag: &str, input_type: Option<&str>) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "button" => Self::Button,
            "a" => Self::Link,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Self::Heading,
            "p" => Self::Paragraph,
            "select" => Self::Combobox,
            "textarea" => Self::Textbox,
            "option" => Self::Option,
            "img" => Self::Img,
            "nav" => Self::Navigation,
            "main" => Self::Main,
            "ul" | "ol" => Self::List,
            "li" => Self::Listitem,
            "dialog" => Self::Dialog,
            "input" => match input_type.map(str::to_ascii_lowercase).as_deref() {
                Some("number") => Self::Spinbutton,
                Some("checkbox") => Self::Checkbox,
                Some("radio") => Self::Radio,
                Some("submit" | "button" | "reset") => Self::Button,
                _ => Self::Textbox,
            },
            _ => Self::Generic,
        }
    }

    /// Lowercase ARIA name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Button => "button",
            Self::Cell => "cell",
            Self::Checkbox => "checkbox",
            Self::Combobox => "combobox",
            Self::Dialog => "dialog",
            Self::Heading => "heading",
            Self::Img => "img",
            Self::Link => "link",
            Self::List => "list",
            Self::Listitem => "listitem",
            Self::Main => "main",
            Self::Navigation => "navigation",
            Self::Option => "option",
            Self::Paragraph => "paragraph",
            Self::Radio => "radio",
            Self::Region => "region",
            Self::Row => "row",
            Self::Spinbutton => "spinbutton",
            Self::Status => "status",
            Self::Tab => "tab",
            Self::Textbox => "textbox",
            Self::Generic => "generic",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AriaRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<option>` of a select element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Option value attribute
    pub value: String,
    /// Visible label
    pub label: String,
}

/// Driver-neutral description of one DOM element at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementSnapshot {
    /// Stable id assigned by the driver
    pub id: String,
    /// Lowercase tag name
    pub tag: String,
    /// Explicit or implicit ARIA role
    pub role: AriaRole,
    /// Accessible name
    pub name: String,
    /// Whitespace-normalized text content
    pub text: String,
    /// Text of the associated `<label>` (or `aria-label`)
    pub label: String,
    /// Current form value
    pub value: String,
    /// Rendered with a non-empty box and not hidden by style
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Checkbox/radio state
    pub checked: bool,
    /// CSS classes
    pub classes: Vec<String>,
    /// Parent element id
    pub parent: Option<String>,
    /// Next element sibling id
    pub next_sibling: Option<String>,
    /// Options of a select element
    pub options: Vec<SelectOption>,
}

impl ElementSnapshot {
    /// Create a visible, enabled element with the implicit role for `tag`
    #[must_use]
    pub fn new(id: impl Into<String>, tag: impl Into<String>) -> Self {
        let tag = tag.into().to_ascii_lowercase();
        Self {
            id: id.into(),
            role: AriaRole::implicit(&tag, None),
            tag,
            visible: true,
            enabled: true,
            ..Self::default()
        }
    }

    /// Input element of the given `type`
    #[must_use]
    pub fn input(id: impl Into<String>, input_type: &str) -> Self {
        let mut el = Self::new(id, "input");
        el.role = AriaRole::implicit("input", Some(input_type));
        el
    }

    /// Override the role
    #[must_use]
    pub const fn role(mut self, role: AriaRole) -> Self {
        self.role = role;
        self
    }

    /// Set text content; buttons, links and headings also take it as their name
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        if self.name.is_empty()
            && matches!(
                self.role,
                AriaRole::Button | AriaRole::Link | AriaRole::Heading | AriaRole::Option
            )
        {
            self.name.clone_from(&self.text);
        }
        self
    }

    /// Set the accessible name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the label; form controls also take it as their name
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        if self.name.is_empty() {
            self.name.clone_from(&self.label);
        }
        self
    }

    /// Set the current value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Add a CSS class
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set the parent id
    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the next sibling id
    #[must_use]
    pub fn next_sibling(mut self, sibling: impl Into<String>) -> Self {
        self.next_sibling = Some(sibling.into());
        self
    }

    /// Add a select option
    #[must_use]
    pub fn option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push(SelectOption {
            value: value.into(),
            label: label.into(),
        });
        self
    }

    /// Mark as hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Mark as disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Mark as checked
    #[must_use]
    pub const fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    /// Whether the element carries `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Resolve a select option by value or visible label
    #[must_use]
    pub fn find_option(&self, wanted: &str) -> Option<&SelectOption> {
        self.options
            .iter()
            .find(|o| o.value == wanted)
            .or_else(|| self.options.iter().find(|o| o.label.trim() == wanted))
    }
}

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Bound for a single `goto`
    pub navigation_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: std::env::var("CHROMIUM_PATH").ok(),
            sandbox: true,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

/// Abstract driver for one browser page.
///
/// Element ids come from [`PageDriver::snapshot`] and are only meaningful
/// until the next navigation; callers re-resolve before every action.
#[async_trait]
pub trait PageDriver: Send + Sync + std::fmt::Debug {
    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Current page URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Snapshot of every element in document order
    async fn snapshot(&self) -> ProbeResult<Vec<ElementSnapshot>>;

    /// Click the element with this id
    async fn click(&self, id: &str) -> ProbeResult<()>;

    /// Replace the value of a form control
    async fn fill(&self, id: &str, value: &str) -> ProbeResult<()>;

    /// Choose a select option by value or label
    async fn select_option(&self, id: &str, value: &str) -> ProbeResult<()>;

    /// Whether the page has reached `state`
    async fn load_state_reached(&self, state: LoadState) -> ProbeResult<bool>;

    /// Cookies and local storage of the browsing context
    async fn storage_state(&self) -> ProbeResult<StorageState>;

    /// Seed cookies and local storage
    async fn restore_storage_state(&self, state: &StorageState) -> ProbeResult<()>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> ProbeResult<Vec<u8>>;

    /// Accept every `alert`/`confirm` dialog from now on
    async fn accept_dialogs(&self) -> ProbeResult<()>;

    /// Close the page and its browser
    async fn close(&self) -> ProbeResult<()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod role_tests {
        use super::*;

        #[test]
        fn test_implicit_roles() {
            assert_eq!(AriaRole::implicit("BUTTON", None), AriaRole::Button);
            assert_eq!(AriaRole::implicit("a", None), AriaRole::Link);
            assert_eq!(AriaRole::implicit("h3", None), AriaRole::Heading);
            assert_eq!(AriaRole::implicit("select", None), AriaRole::Combobox);
            assert_eq!(AriaRole::implicit("div", None), AriaRole::Generic);
        }

        #[test]
        fn test_input_types() {
            assert_eq!(
                AriaRole::implicit("input", Some("number")),
                AriaRole::Spinbutton
            );
            assert_eq!(
                AriaRole::implicit("input", Some("password")),
                AriaRole::Textbox
            );
            assert_eq!(AriaRole::implicit("input", Some("date")), AriaRole::Textbox);
            assert_eq!(
                AriaRole::implicit("input", Some("checkbox")),
                AriaRole::Checkbox
            );
            assert_eq!(AriaRole::implicit("input", None), AriaRole::Textbox);
        }

        #[test]
        fn test_unknown_role_deserializes() {
            let role: AriaRole = serde_json::from_str("\"menuitemradio\"").unwrap();
            assert_eq!(role, AriaRole::Unknown);
            let role: AriaRole = serde_json::from_str("\"spinbutton\"").unwrap();
            assert_eq!(role, AriaRole::Spinbutton);
        }
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn test_button_text_becomes_name() {
            let el = ElementSnapshot::new("b1", "button").text("Sign In");
            assert_eq!(el.name, "Sign In");
            assert!(el.visible && el.enabled);
        }

        #[test]
        fn test_label_becomes_name_for_inputs() {
            let el = ElementSnapshot::input("i1", "password").label("Password");
            assert_eq!(el.role, AriaRole::Textbox);
            assert_eq!(el.name, "Password");
        }

        #[test]
        fn test_paragraph_text_is_not_name() {
            let el = ElementSnapshot::new("p1", "p").text("Count");
            assert!(el.name.is_empty());
        }

        #[test]
        fn test_find_option_by_value_or_label() {
            let el = ElementSnapshot::new("s", "select")
                .option("foodDining", "Food & Dining")
                .option("shopping", "Shopping");
            assert_eq!(el.find_option("shopping").unwrap().label, "Shopping");
            assert_eq!(el.find_option("Food & Dining").unwrap().value, "foodDining");
            assert!(el.find_option("Travel").is_none());
        }

        #[test]
        fn test_snapshot_deserializes_camel_case() {
            let json = r#"{"id":"7","tag":"p","role":"paragraph","text":"42",
                "visible":true,"enabled":true,"nextSibling":"8","classes":["text-lg"]}"#;
            let el: ElementSnapshot = serde_json::from_str(json).unwrap();
            assert_eq!(el.next_sibling.as_deref(), Some("8"));
            assert!(el.has_class("text-lg"));
            assert!(el.options.is_empty());
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_builder() {
            let config = DriverConfig::new()
                .headless(false)
                .viewport(800, 600)
                .no_sandbox()
                .navigation_timeout(Duration::from_secs(5));
            assert!(!config.headless);
            assert_eq!(config.viewport_width, 800);
            assert!(!config.sandbox);
            assert_eq!(config.navigation_timeout, Duration::from_secs(5));
        }
    }
}
