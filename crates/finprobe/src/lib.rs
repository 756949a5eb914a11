//! Finprobe: end-to-end tests for a personal finance web app.
//!
//! Page objects wrap each screen of the app behind intention-revealing
//! methods. Every method runs as a named step so failures read as
//! `ExpensePage.parse_with_ai > ExpensePage.fill_natural_language_input`
//! rather than a bare selector.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Test suites  │──►│ Page objects │──►│ Page/Locator │──►│ PageDriver   │
//! │ (tests/*.rs) │   │ (pages::*)   │   │ + expect()   │   │ CDP | script │
//! └──────────────┘   └──────┬───────┘   └──────────────┘   └──────────────┘
//!                           │ step / try_step spans
//!                           ▼
//!                    StepRecorder ──► Reporter (text, JSON, JUnit)
//! ```
//!
//! The Chromium driver is behind the `browser` feature; [`mock::ScriptedDriver`]
//! runs the same page objects in memory.

#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod assertion;
mod driver;
mod locator;
mod page;
mod pattern;
mod race;
mod result;
mod wait;

#[cfg(feature = "browser")]
pub mod chromium;
pub mod config;
pub mod dates;
pub mod fixture;
pub mod logging;
pub mod mock;
pub mod pages;
pub mod reporter;
pub mod session;
pub mod step;

pub use assertion::{expect, expect_url, LocatorExpect, UrlExpect};
pub use config::{Credentials, ProjectConfig, SuiteConfig};
pub use driver::{AriaRole, DriverConfig, ElementSnapshot, PageDriver, SelectOption};
pub use fixture::{e2e_enabled, TestContext};
pub use locator::{normalize_whitespace, ElementState, Locator, Selector, TextMatch};
pub use page::{Page, PageSettings};
pub use pattern::Pattern;
pub use race::{Race, Settlement};
pub use reporter::{FailureCategory, Reporter, TestResultEntry, TestStatus};
pub use result::{ProbeError, ProbeResult};
pub use session::{SessionArtifact, StorageState};
pub use step::{step, try_step, StepName, StepNode, StepRecorder, StepStatus, Traced};
pub use wait::{LoadState, UrlPattern};

/// Common imports for test suites
pub mod prelude {
    pub use crate::pages::*;
    pub use crate::{
        dates, expect, expect_url, AriaRole, ElementState, LoadState, Page, ProbeError,
        ProbeResult, Race, SuiteConfig, TestContext, TextMatch, Traced, UrlPattern,
    };
}
