//! Locators and actions shared by every authenticated screen.

use std::time::Duration;

use crate::assertion::expect;
use crate::driver::AriaRole;
use crate::locator::{Locator, TextMatch};
use crate::page::Page;
use crate::result::ProbeResult;
use crate::step::Traced;

/// Dollar amounts such as `$1,234.56`
pub const CURRENCY_PATTERN: &str = r"\$[\d,]+\.\d{2}";

/// Entry counts such as `(12)`
pub const COUNT_PATTERN: &str = r"\(\d+\)";

/// Bound for [`CommonLocators::wait_for_page_load`]
pub const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Period buttons on the dashboard and summary screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    AllTime,
    ThisMonth,
    ThisYear,
}

impl TimeFilter {
    /// Button caption
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AllTime => "All Time",
            Self::ThisMonth => "This month",
            Self::ThisYear => "This year",
        }
    }
}

/// Layout pieces shared by dashboard, summary and list screens
#[derive(Debug, Clone)]
pub struct CommonLocators {
    page: Page,

    pub total_income_heading: Locator,
    pub total_expenses_heading: Locator,
    pub net_income_heading: Locator,
    pub this_month_heading: Locator,
    pub total_income_text: Locator,
    pub total_expenses_text: Locator,

    pub all_time_button: Locator,
    pub this_month_button: Locator,
    pub this_year_button: Locator,

    pub income_by_category_heading: Locator,
    pub expenses_by_category_heading: Locator,
    pub invoices_by_status_heading: Locator,

    pub recent_income_heading: Locator,
    pub recent_expenses_heading: Locator,
    pub recent_invoices_heading: Locator,

    pub add_income_button: Locator,
    pub add_expense_button: Locator,
    pub create_invoice_button: Locator,

    pub amount_input: Locator,
    pub description_input: Locator,
    pub date_input: Locator,
    pub category_dropdown: Locator,
}

impl Traced for CommonLocators {
    const NAME: &'static str = "CommonLocators";
}

impl CommonLocators {
    #[must_use]
    pub fn new(page: &Page) -> Self {
        let heading = |name: &str| page.get_by_role(AriaRole::Heading, name);
        Self {
            total_income_heading: heading("Total Income"),
            total_expenses_heading: heading("Total Expenses"),
            net_income_heading: heading("Net Income"),
            this_month_heading: heading("This Month"),
            total_income_text: page.get_by_text("Total Income"),
            total_expenses_text: page.get_by_text("Total Expenses"),

            all_time_button: page.get_by_role(AriaRole::Button, TimeFilter::AllTime.label()),
            this_month_button: page.get_by_role(AriaRole::Button, TimeFilter::ThisMonth.label()),
            this_year_button: page.get_by_role(AriaRole::Button, TimeFilter::ThisYear.label()),

            income_by_category_heading: heading("💰 Income by Category"),
            expenses_by_category_heading: heading("📊 Expenses by Category"),
            invoices_by_status_heading: heading("🧾 Invoices by Status"),

            recent_income_heading: heading("💰 Recent Income"),
            recent_expenses_heading: heading("🔄 Recent Expenses"),
            recent_invoices_heading: heading("📄 Recent Invoices"),

            add_income_button: page
                .get_by_role(AriaRole::Button, TextMatch::pattern_ci("Add (New )?Income")),
            add_expense_button: page
                .get_by_role(AriaRole::Button, TextMatch::pattern_ci("Add (New )?Expense")),
            create_invoice_button: page
                .get_by_role(AriaRole::Button, TextMatch::pattern_ci("Create (New )?Invoice")),

            amount_input: page.get_by_role(AriaRole::Spinbutton, TextMatch::pattern("Amount")),
            description_input: page.get_by_role(AriaRole::Textbox, "Description"),
            date_input: page.get_by_role(AriaRole::Textbox, "Date"),
            category_dropdown: page.get_by_label("Category"),

            page: page.clone(),
        }
    }

    /// Page the locators are bound to
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    /// Navigate to an app path
    pub async fn goto(&self, path: &str) -> ProbeResult<()> {
        self.page.goto(path).await
    }

    pub async fn goto_dashboard(&self) -> ProbeResult<()> {
        self.try_step("goto_dashboard", self.goto("/dashboard")).await
    }

    pub async fn goto_incomes(&self) -> ProbeResult<()> {
        self.try_step("goto_incomes", self.goto("/incomes")).await
    }

    pub async fn goto_expenses(&self) -> ProbeResult<()> {
        self.try_step("goto_expenses", self.goto("/expenses")).await
    }

    pub async fn goto_invoices(&self) -> ProbeResult<()> {
        self.try_step("goto_invoices", self.goto("/invoices")).await
    }

    pub async fn goto_summary(&self) -> ProbeResult<()> {
        self.try_step("goto_summary", self.goto("/summary")).await
    }

    /// Button for a period filter
    #[must_use]
    pub const fn time_filter_button(&self, filter: TimeFilter) -> &Locator {
        match filter {
            TimeFilter::AllTime => &self.all_time_button,
            TimeFilter::ThisMonth => &self.this_month_button,
            TimeFilter::ThisYear => &self.this_year_button,
        }
    }

    /// Click a period filter; returns once the click is dispatched
    pub async fn click_time_filter(&self, filter: TimeFilter) -> ProbeResult<()> {
        self.try_step("click_time_filter", self.time_filter_button(filter).click())
            .await
    }

    /// The `index`-th dollar amount on the page
    #[must_use]
    pub fn currency_locator(&self, index: usize) -> Locator {
        self.page
            .get_by_text(TextMatch::pattern(CURRENCY_PATTERN))
            .nth(index)
    }

    /// The `index`-th `(n)` count on the page
    #[must_use]
    pub fn count_locator(&self, index: usize) -> Locator {
        self.page
            .get_by_text(TextMatch::pattern(COUNT_PATTERN))
            .nth(index)
    }

    pub async fn verify_metric_cards_visible(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_metric_cards_visible",
            expect_all_visible(&[
                &self.total_income_heading,
                &self.total_expenses_heading,
                &self.net_income_heading,
                &self.this_month_heading,
            ]),
        )
        .await
    }

    pub async fn verify_category_breakdowns_visible(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_category_breakdowns_visible",
            expect_all_visible(&[
                &self.income_by_category_heading,
                &self.expenses_by_category_heading,
                &self.invoices_by_status_heading,
            ]),
        )
        .await
    }

    pub async fn verify_recent_activity_sections_visible(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_recent_activity_sections_visible",
            expect_all_visible(&[
                &self.recent_income_heading,
                &self.recent_expenses_heading,
                &self.recent_invoices_heading,
            ]),
        )
        .await
    }

    pub async fn verify_time_filters_visible(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_time_filters_visible",
            expect_all_visible(&[
                &self.all_time_button,
                &self.this_month_button,
                &self.this_year_button,
            ]),
        )
        .await
    }

    /// Wait up to ten seconds for `landmark` to show
    pub async fn wait_for_page_load(&self, landmark: &Locator) -> ProbeResult<()> {
        self.try_step(
            "wait_for_page_load",
            expect(landmark).with_timeout(PAGE_LOAD_TIMEOUT).to_be_visible(),
        )
        .await
    }
}

/// Expect each locator to be visible, in order
pub(crate) async fn expect_all_visible(locators: &[&Locator]) -> ProbeResult<()> {
    for locator in locators {
        expect(locator).to_be_visible().await?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::{ElementSnapshot, PageDriver};
    use crate::mock::ScriptedDriver;
    use crate::pages::fixtures;
    use crate::result::ProbeError;
    use std::sync::Arc;

    fn dashboard_screen() -> Vec<ElementSnapshot> {
        vec![
            ElementSnapshot::new("h-income", "h3").text("Total Income"),
            ElementSnapshot::new("h-expenses", "h3").text("Total Expenses"),
            ElementSnapshot::new("h-net", "h3").text("Net Income"),
            ElementSnapshot::new("h-month", "h3").text("This Month"),
            ElementSnapshot::new("amount-0", "p").text("$1,250.00"),
            ElementSnapshot::new("amount-1", "p").text("$80.10"),
            ElementSnapshot::new("count-0", "span").text("(3)"),
            ElementSnapshot::new("all", "button").text("All Time"),
            ElementSnapshot::new("month", "button").text("This month"),
            ElementSnapshot::new("year", "button").text("This year"),
        ]
    }

    mod time_filter_tests {
        use super::*;

        #[test]
        fn test_labels() {
            assert_eq!(TimeFilter::AllTime.label(), "All Time");
            assert_eq!(TimeFilter::ThisMonth.label(), "This month");
            assert_eq!(TimeFilter::ThisYear.label(), "This year");
        }

        #[tokio::test]
        async fn test_click_time_filter_dispatches_click() {
            let driver = Arc::new(ScriptedDriver::new().screen("/dashboard", dashboard_screen()));
            let common = CommonLocators::new(&fixtures::page(&driver));
            common.goto_dashboard().await.unwrap();
            common.click_time_filter(TimeFilter::ThisYear).await.unwrap();
            assert!(driver.was_called("click:year"));
        }
    }

    mod pattern_tests {
        use super::*;

        #[tokio::test]
        async fn test_currency_and_count_locators_index_matches() {
            let driver = Arc::new(ScriptedDriver::new().screen("/dashboard", dashboard_screen()));
            let common = CommonLocators::new(&fixtures::page(&driver));
            common.goto_dashboard().await.unwrap();
            assert_eq!(common.currency_locator(1).text_content().await.unwrap(), "$80.10");
            assert_eq!(common.count_locator(0).text_content().await.unwrap(), "(3)");
        }

        #[test]
        fn test_currency_pattern_rejects_bare_numbers() {
            let m = TextMatch::pattern(CURRENCY_PATTERN);
            assert!(m.matches("Total: $12,000.50"));
            assert!(!m.matches("12000.50"));
        }
    }

    mod verify_tests {
        use super::*;

        #[tokio::test]
        async fn test_metric_cards_and_filters_visible() {
            let driver = Arc::new(ScriptedDriver::new().screen("/dashboard", dashboard_screen()));
            let common = CommonLocators::new(&fixtures::page(&driver));
            common.goto_dashboard().await.unwrap();
            common.verify_metric_cards_visible().await.unwrap();
            common.verify_time_filters_visible().await.unwrap();
        }

        #[tokio::test]
        async fn test_missing_section_is_assertion_failure() {
            let driver = Arc::new(ScriptedDriver::new().screen("/dashboard", dashboard_screen()));
            let common = CommonLocators::new(&fixtures::page(&driver));
            common.goto_dashboard().await.unwrap();
            let err = common.verify_category_breakdowns_visible().await.unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
        }

        #[tokio::test]
        async fn test_goto_uses_base_url() {
            let driver = Arc::new(ScriptedDriver::new());
            let common = CommonLocators::new(&fixtures::page(&driver));
            common.goto_summary().await.unwrap();
            assert_eq!(
                driver.current_url().await.unwrap(),
                format!("{}/summary", fixtures::BASE)
            );
        }
    }
}
