//! Dashboard screen: greeting, metric cards, breakdowns and recent activity.

use crate::assertion::expect;
use crate::config::Credentials;
use crate::dates::current_month_label;
use crate::driver::AriaRole;
use crate::locator::{Locator, TextMatch};
use crate::page::Page;
use crate::pages::common::{CommonLocators, TimeFilter};
use crate::pages::Screen;
use crate::result::ProbeResult;
use crate::step::Traced;

#[derive(Debug, Clone)]
pub struct DashboardPage {
    common: CommonLocators,

    pub welcome_heading: Locator,
    pub financial_overview_subtitle: Locator,
    pub current_month_text: Locator,
}

impl Traced for DashboardPage {
    const NAME: &'static str = "DashboardPage";
}

impl Screen for DashboardPage {
    const PATH: &'static str = "/dashboard";

    fn common(&self) -> &CommonLocators {
        &self.common
    }

    fn landmark(&self) -> &Locator {
        &self.common.total_income_heading
    }
}

impl DashboardPage {
    /// Dashboard greeting the default test user
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self::for_user(page, &Credentials::default().full_name)
    }

    /// Dashboard greeting `full_name`
    #[must_use]
    pub fn for_user(page: &Page, full_name: &str) -> Self {
        Self {
            common: CommonLocators::new(page),
            welcome_heading: page.get_by_role(
                AriaRole::Heading,
                format!("Welcome back, {full_name}!"),
            ),
            financial_overview_subtitle: page
                .get_by_text("Here's your financial overview for today"),
            current_month_text: page.get_by_text(current_month_label()),
        }
    }

    fn page(&self) -> &Page {
        self.common.page()
    }

    pub async fn verify_welcome_message(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_welcome_message",
            expect(&self.welcome_heading).to_be_visible(),
        )
        .await
    }

    pub async fn verify_financial_overview_subtitle(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_financial_overview_subtitle",
            expect(&self.financial_overview_subtitle).to_be_visible(),
        )
        .await
    }

    /// Heading, first amount and the entry counter
    pub async fn verify_total_income_card(&self) -> ProbeResult<()> {
        self.try_step("verify_total_income_card", async {
            expect(&self.common.total_income_heading).to_be_visible().await?;
            expect(&self.common.currency_locator(0)).to_be_visible().await?;
            let entries = self
                .page()
                .get_by_text(TextMatch::pattern(r"\d+ income entries recorded"));
            expect(&entries).to_be_visible().await
        })
        .await
    }

    pub async fn verify_total_expenses_card(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_total_expenses_card",
            expect(&self.common.total_expenses_heading).to_be_visible(),
        )
        .await
    }

    pub async fn verify_net_income_card(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_net_income_card",
            expect(&self.common.net_income_heading).to_be_visible(),
        )
        .await
    }

    pub async fn verify_this_month_card(&self) -> ProbeResult<()> {
        self.try_step("verify_this_month_card", async {
            expect(&self.common.this_month_heading).to_be_visible().await?;
            expect(&self.current_month_text).to_be_visible().await
        })
        .await
    }

    pub async fn verify_income_by_category_section(&self) -> ProbeResult<()> {
        self.try_step("verify_income_by_category_section", async {
            expect(&self.common.income_by_category_heading)
                .to_be_visible()
                .await?;
            expect(&self.page().get_by_text("Salary").first())
                .to_be_visible()
                .await?;
            expect(&self.common.count_locator(0)).to_be_visible().await
        })
        .await
    }

    pub async fn verify_expenses_by_category_section(&self) -> ProbeResult<()> {
        self.try_step("verify_expenses_by_category_section", async {
            expect(&self.common.expenses_by_category_heading)
                .to_be_visible()
                .await?;
            expect(&self.page().get_by_text("Food & Dining").first())
                .to_be_visible()
                .await
        })
        .await
    }

    pub async fn verify_invoices_by_status_section(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_invoices_by_status_section",
            expect(&self.common.invoices_by_status_heading).to_be_visible(),
        )
        .await
    }

    /// Metric cards, breakdowns and recent activity
    pub async fn verify_all_dashboard_sections(&self) -> ProbeResult<()> {
        self.try_step("verify_all_dashboard_sections", async {
            self.common.verify_metric_cards_visible().await?;
            self.common.verify_category_breakdowns_visible().await?;
            self.common.verify_recent_activity_sections_visible().await
        })
        .await
    }

    pub async fn filter_by_this_month(&self) -> ProbeResult<()> {
        self.try_step(
            "filter_by_this_month",
            self.common.click_time_filter(TimeFilter::ThisMonth),
        )
        .await
    }

    pub async fn filter_by_this_year(&self) -> ProbeResult<()> {
        self.try_step(
            "filter_by_this_year",
            self.common.click_time_filter(TimeFilter::ThisYear),
        )
        .await
    }

    pub async fn filter_by_all_time(&self) -> ProbeResult<()> {
        self.try_step(
            "filter_by_all_time",
            self.common.click_time_filter(TimeFilter::AllTime),
        )
        .await
    }

    pub async fn verify_dashboard_data_after_filter(&self) -> ProbeResult<()> {
        self.try_step("verify_dashboard_data_after_filter", async {
            expect(&self.common.total_income_heading).to_be_visible().await?;
            expect(&self.common.income_by_category_heading)
                .to_be_visible()
                .await
        })
        .await
    }

    /// Net income card carries its formula caption
    pub async fn verify_net_income_calculation(&self) -> ProbeResult<()> {
        self.try_step("verify_net_income_calculation", async {
            expect(&self.common.net_income_heading).to_be_visible().await?;
            expect(&self.page().get_by_text("Revenue - Expenses"))
                .to_be_visible()
                .await
        })
        .await
    }

    /// Add a Food & Dining expense through the expenses screen
    pub async fn add_new_expense_from_dashboard(
        &self,
        description: &str,
        amount: &str,
    ) -> ProbeResult<()> {
        self.try_step("add_new_expense_from_dashboard", async {
            self.common.goto_expenses().await?;
            self.common.add_expense_button.click().await?;
            self.page()
                .get_by_role(AriaRole::Spinbutton, "Amount ($)")
                .fill(amount)
                .await?;
            self.common.description_input.fill(description).await?;
            self.common
                .category_dropdown
                .select_option("Food & Dining")
                .await?;
            self.common.add_expense_button.click().await
        })
        .await
    }

    pub async fn verify_recent_activity_updated(&self) -> ProbeResult<()> {
        self.try_step("verify_recent_activity_updated", async {
            self.common.goto_dashboard().await?;
            expect(&self.common.recent_expenses_heading)
                .to_be_visible()
                .await
        })
        .await
    }

    /// A status label (regex, case-insensitive) and a matching figure
    pub async fn verify_invoices_by_status(&self, status: &str, figure: TextMatch) -> ProbeResult<()> {
        self.try_step("verify_invoices_by_status", async {
            expect(&self.page().get_by_text(TextMatch::pattern_ci(status)).first())
                .to_be_visible()
                .await?;
            expect(&self.page().get_by_text(figure).first())
                .to_be_visible()
                .await
        })
        .await
    }

    pub async fn verify_complete_data_display(&self) -> ProbeResult<()> {
        self.try_step("verify_complete_data_display", async {
            for locator in [
                &self.welcome_heading,
                &self.common.total_income_heading,
                &self.common.total_expenses_heading,
                &self.common.net_income_heading,
                &self.common.this_month_heading,
                &self.common.income_by_category_heading,
                &self.common.expenses_by_category_heading,
                &self.common.invoices_by_status_heading,
            ] {
                expect(locator).to_be_visible().await?;
            }
            Ok(())
        })
        .await
    }
}
