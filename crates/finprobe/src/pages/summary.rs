//! Summary screen and its AI insights card.
//!
//! The insights card renders differently per environment (collapsed,
//! placeholder or fully generated), so it comes with `has_*` probes that
//! let suites branch instead of failing.

use std::time::Duration;

use crate::assertion::expect;
use crate::driver::AriaRole;
use crate::locator::{Locator, TextMatch};
use crate::page::Page;
use crate::pages::common::{CommonLocators, TimeFilter, CURRENCY_PATTERN};
use crate::pages::Screen;
use crate::result::{ProbeError, ProbeResult};
use crate::step::Traced;

const INSIGHTS_SECTION: &str = "AI Financial Insights|Perspectivas Financieras|Insights Financeiros";
const INSIGHTS_HEADING: &str =
    "AI Financial Insights|Perspectivas Financieras (con )?IA|Insights Financeiros";
const ALERTS: &str = "Alerts|Alertas";
const TRENDS: &str = "Spending Trends|Tendencias de Gasto|Tendências de Gastos";
const RECOMMENDATIONS: &str = "Recommendations|Recomendaciones|Recomendações";
const REFRESH: &str = "Refresh|Actualizar|Atualizar";
const INSIGHT_WORDS: &str = "spending|category|budget|gastos|categoria|despesas";
const SPENDING_CATEGORIES: &str =
    "Food & Dining|Transportation|Shopping|Alimentación|Transporte|Compras";
const DETAILED_SECTIONS: &str = "Alerts|Trends|Recommendations";

const INSIGHTS_HEADING_TIMEOUT: Duration = Duration::from_secs(10);
const ALERTS_TIMEOUT: Duration = Duration::from_secs(15);
const INSIGHTS_GENERATION: Duration = Duration::from_secs(2);
const MIN_RECOMMENDATION_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct SummaryPage {
    common: CommonLocators,

    pub financial_summary_heading: Locator,
    pub comprehensive_overview_text: Locator,
    pub category_breakdown_heading: Locator,
    pub recent_activities_heading: Locator,

    pub alerts_heading: Locator,
    pub trends_heading: Locator,
    pub recommendations_heading: Locator,
    pub refresh_button: Locator,
}

impl Traced for SummaryPage {
    const NAME: &'static str = "SummaryPage";
}

impl Screen for SummaryPage {
    const PATH: &'static str = "/summary";

    fn common(&self) -> &CommonLocators {
        &self.common
    }

    fn landmark(&self) -> &Locator {
        &self.financial_summary_heading
    }
}

impl SummaryPage {
    #[must_use]
    pub fn new(page: &Page) -> Self {
        let heading = |pattern: &str| page.get_by_role(AriaRole::Heading, TextMatch::pattern_ci(pattern));
        Self {
            common: CommonLocators::new(page),
            financial_summary_heading: page.get_by_role(AriaRole::Heading, "Financial Summary"),
            comprehensive_overview_text: page
                .get_by_text("Comprehensive overview of your financial data"),
            category_breakdown_heading: page.get_by_role(AriaRole::Heading, "Category Breakdown"),
            recent_activities_heading: page.get_by_role(AriaRole::Heading, "Recent Activities"),

            alerts_heading: heading(ALERTS),
            trends_heading: heading(TRENDS),
            recommendations_heading: heading(RECOMMENDATIONS),
            refresh_button: page.get_by_role(AriaRole::Button, TextMatch::pattern_ci(REFRESH)),
        }
    }

    fn page(&self) -> &Page {
        self.common.page()
    }

    fn currency(&self) -> Locator {
        self.page().get_by_text(TextMatch::pattern(CURRENCY_PATTERN))
    }

    pub async fn verify_page_header(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_page_header",
            expect(&self.financial_summary_heading).to_be_visible(),
        )
        .await
    }

    pub async fn verify_page_subtitle(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_page_subtitle",
            expect(&self.comprehensive_overview_text).to_be_visible(),
        )
        .await
    }

    pub async fn verify_all_time_filter_buttons(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_all_time_filter_buttons",
            self.common.verify_time_filters_visible(),
        )
        .await
    }

    pub async fn verify_all_metric_cards(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_all_metric_cards",
            self.common.verify_metric_cards_visible(),
        )
        .await
    }

    /// An amount and the income entry counter
    pub async fn verify_income_data_display(&self) -> ProbeResult<()> {
        self.try_step("verify_income_data_display", async {
            expect(&self.currency().first()).to_be_visible().await?;
            let entries = self
                .page()
                .get_by_text(TextMatch::pattern(r"\d+ income entries recorded"));
            expect(&entries).to_be_visible().await
        })
        .await
    }

    /// Breakdowns render as one placeholder card
    pub async fn verify_all_category_breakdowns(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_all_category_breakdowns",
            expect(&self.category_breakdown_heading).to_be_visible(),
        )
        .await
    }

    /// Recent activity renders as one placeholder card
    pub async fn verify_all_recent_activity_sections(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_all_recent_activity_sections",
            expect(&self.recent_activities_heading).to_be_visible(),
        )
        .await
    }

    pub async fn verify_complete_summary_display(&self) -> ProbeResult<()> {
        self.try_step("verify_complete_summary_display", async {
            self.verify_page_header().await?;
            self.verify_page_subtitle().await?;
            self.verify_all_time_filter_buttons().await?;
            self.verify_all_metric_cards().await?;
            self.verify_income_data_display().await?;
            self.verify_all_category_breakdowns().await?;
            self.verify_all_recent_activity_sections().await
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

    pub async fn verify_summary_after_filter(&self) -> ProbeResult<()> {
        self.try_step("verify_summary_after_filter", async {
            expect(&self.financial_summary_heading).to_be_visible().await?;
            expect(&self.common.total_income_heading).to_be_visible().await?;
            expect(&self.category_breakdown_heading).to_be_visible().await
        })
        .await
    }

    pub async fn verify_income_category_breakdown(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_income_category_breakdown",
            expect(&self.category_breakdown_heading).to_be_visible(),
        )
        .await
    }

    /// Second and third amounts on the page
    pub async fn verify_income_category_amounts(&self) -> ProbeResult<()> {
        self.try_step("verify_income_category_amounts", async {
            expect(&self.currency().nth(1)).to_be_visible().await?;
            expect(&self.currency().nth(2)).to_be_visible().await
        })
        .await
    }

    pub async fn verify_expense_category_breakdown(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_expense_category_breakdown",
            expect(&self.category_breakdown_heading).to_be_visible(),
        )
        .await
    }

    pub async fn verify_invoice_status_breakdown(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_invoice_status_breakdown",
            expect(&self.recent_activities_heading).to_be_visible(),
        )
        .await
    }

    /// Detailed totals may be hidden behind placeholders; any amount will do
    pub async fn verify_invoice_status_totals(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_invoice_status_totals",
            expect(&self.currency().first()).to_be_visible(),
        )
        .await
    }

    pub async fn verify_recent_activity_formats(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_recent_activity_formats",
            expect(&self.recent_activities_heading).to_be_visible(),
        )
        .await
    }

    pub async fn verify_all_category_breakdown_details(&self) -> ProbeResult<()> {
        self.try_step("verify_all_category_breakdown_details", async {
            self.verify_income_category_breakdown().await?;
            self.verify_income_category_amounts().await?;
            self.verify_expense_category_breakdown().await?;
            self.verify_invoice_status_breakdown().await?;
            self.verify_invoice_status_totals().await?;
            self.verify_recent_activity_formats().await
        })
        .await
    }

    /// Outermost block mentioning the insights card title, in any language
    #[must_use]
    pub fn ai_insights_section(&self) -> Locator {
        self.page()
            .locator("div")
            .filter_has_text(TextMatch::pattern_ci(INSIGHTS_SECTION))
            .first()
    }

    /// Expand the insights card
    pub async fn click_ai_insights(&self) -> ProbeResult<()> {
        let section = self.ai_insights_section();
        self.try_step("click_ai_insights", section.click()).await
    }

    /// Insights heading within 10s; `pattern` defaults to the title in
    /// English, Spanish or Portuguese
    pub async fn verify_ai_insights_heading(&self, pattern: Option<TextMatch>) -> ProbeResult<()> {
        let name = pattern.unwrap_or_else(|| TextMatch::pattern_ci(INSIGHTS_HEADING));
        let heading = self.page().get_by_role(AriaRole::Heading, name);
        self.try_step(
            "verify_ai_insights_heading",
            expect(&heading)
                .with_timeout(INSIGHTS_HEADING_TIMEOUT)
                .to_be_visible(),
        )
        .await
    }

    /// Give the insights time to generate
    pub async fn verify_insights_loaded(&self) -> ProbeResult<()> {
        self.try_step("verify_insights_loaded", async {
            self.page().wait_for_timeout(INSIGHTS_GENERATION).await;
            Ok(())
        })
        .await
    }

    pub async fn verify_alerts_section(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_alerts_section",
            expect(&self.alerts_heading)
                .with_timeout(ALERTS_TIMEOUT)
                .to_be_visible(),
        )
        .await
    }

    pub async fn verify_trends_section(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_trends_section",
            expect(&self.trends_heading).to_be_visible(),
        )
        .await
    }

    pub async fn verify_recommendations_section(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_recommendations_section",
            expect(&self.recommendations_heading).to_be_visible(),
        )
        .await
    }

    pub async fn click_refresh_insights(&self) -> ProbeResult<()> {
        self.try_step("click_refresh_insights", self.refresh_button.click())
            .await
    }

    /// At least one paragraph reads like an insight
    pub async fn verify_insight_content(&self) -> ProbeResult<()> {
        let insight = self
            .page()
            .locator("p")
            .filter_has_text(TextMatch::pattern_ci(INSIGHT_WORDS))
            .first();
        self.try_step("verify_insight_content", expect(&insight).to_be_visible())
            .await
    }

    /// Clicking the card title again folds it
    pub async fn collapse_ai_insights(&self) -> ProbeResult<()> {
        let section = self.ai_insights_section();
        self.try_step("collapse_ai_insights", section.click()).await
    }

    pub async fn verify_insights_collapsed(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_insights_collapsed",
            expect(&self.alerts_heading).not().to_be_visible(),
        )
        .await
    }

    pub async fn verify_top_spending_categories(&self) -> ProbeResult<()> {
        let category = self
            .page()
            .locator("p")
            .filter_has_text(TextMatch::pattern_ci(SPENDING_CATEGORIES))
            .first();
        self.try_step(
            "verify_top_spending_categories",
            expect(&category).to_be_visible(),
        )
        .await
    }

    /// The innermost block mentioning recommendations carries real text
    pub async fn verify_recommendation_content(&self) -> ProbeResult<()> {
        let block = self
            .page()
            .locator("div")
            .filter_has_text(TextMatch::pattern_ci(RECOMMENDATIONS))
            .last();
        self.try_step("verify_recommendation_content", async {
            let text = block.text_content().await?;
            let chars = text.chars().count();
            if chars > MIN_RECOMMENDATION_CHARS {
                Ok(())
            } else {
                Err(ProbeError::assertion(format!(
                    "expected recommendations longer than {MIN_RECOMMENDATION_CHARS} chars, got {chars}"
                )))
            }
        })
        .await
    }

    async fn probe(&self, locator: &Locator) -> bool {
        locator.is_visible().await.unwrap_or(false)
    }

    /// Any of alerts, trends or recommendations is rendered
    pub async fn has_detailed_sections(&self) -> bool {
        let any = self
            .page()
            .get_by_role(AriaRole::Heading, TextMatch::pattern_ci(DETAILED_SECTIONS))
            .first();
        self.step("has_detailed_sections", self.probe(&any)).await
    }

    pub async fn has_trends_section(&self) -> bool {
        self.step("has_trends_section", self.probe(&self.trends_heading))
            .await
    }

    pub async fn has_recommendations(&self) -> bool {
        self.step("has_recommendations", self.probe(&self.recommendations_heading))
            .await
    }

    pub async fn has_refresh_button(&self) -> bool {
        self.step("has_refresh_button", self.probe(&self.refresh_button))
            .await
    }

    pub async fn verify_any_insight_section_visible(&self) -> ProbeResult<()> {
        self.try_step("verify_any_insight_section_visible", async {
            let alerts = self.probe(&self.alerts_heading).await;
            let trends = self.probe(&self.trends_heading).await;
            let recommendations = self.probe(&self.recommendations_heading).await;
            if alerts || trends || recommendations {
                Ok(())
            } else {
                Err(ProbeError::assertion(
                    "no insight section (alerts, trends, recommendations) is visible",
                ))
            }
        })
        .await
    }
}
