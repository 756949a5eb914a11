//! Page objects for the finance app.
//!
//! Each screen owns its locators plus a [`CommonLocators`] set for the layout
//! pieces every authenticated screen shares. Actions are traced as
//! `Owner.action` steps.

use std::future::Future;
use std::time::Duration;

use crate::locator::{ElementState, Locator};
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use crate::step::Traced;

pub mod auth;
pub mod common;
pub mod dashboard;
pub mod expense;
pub mod income;
pub mod invoice;
pub mod language;
pub mod summary;

pub use auth::{AuthPage, AuthPath};
pub use common::{CommonLocators, TimeFilter, COUNT_PATTERN, CURRENCY_PATTERN};
pub use dashboard::DashboardPage;
pub use expense::{ExpensePage, ParsedExpense};
pub use income::IncomePage;
pub use invoice::{InvoicePage, INVOICE_STATUSES};
pub use language::{Language, LanguageSelector, Translations};
pub use summary::SummaryPage;

/// A screen reachable at a fixed path
pub trait Screen: Traced {
    /// App path of the screen
    const PATH: &'static str;

    /// Shared layout locators
    fn common(&self) -> &CommonLocators;

    /// Element whose visibility proves the screen rendered
    fn landmark(&self) -> &Locator;

    /// Go to [`Screen::PATH`] and wait for the landmark within the
    /// navigation bound
    fn navigate(&self) -> impl Future<Output = ProbeResult<()>>
    where
        Self: Sized,
    {
        let page = self.common().page();
        self.try_step(
            "navigate",
            open(page, Self::PATH, self.landmark(), page.settings().navigation_timeout),
        )
    }
}

/// Navigate to `path` and wait for `landmark`; a miss is a
/// [`ProbeError::NavigationTimeout`]
pub(crate) async fn open(
    page: &Page,
    path: &str,
    landmark: &Locator,
    timeout: Duration,
) -> ProbeResult<()> {
    page.goto(path).await?;
    landmark
        .wait_for_within(ElementState::Visible, timeout)
        .await
        .map_err(|e| match e {
            ProbeError::Timeout { ms, .. } => ProbeError::NavigationTimeout {
                url: page.resolve_url(path),
                landmark: landmark.to_string(),
                ms,
            },
            other => other,
        })
}
