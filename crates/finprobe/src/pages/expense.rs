//! Expense list, form and the AI helpers on it.
//!
//! [`ExpensePage::parse_with_ai`] is the one race-resolved flow here: the
//! parser either reports success, reports an error, or says nothing, and the
//! outcome is read back from the page rather than from whichever signal fired.

use std::time::Duration;

use tracing::{debug, info};

use crate::assertion::expect;
use crate::driver::AriaRole;
use crate::locator::{ElementState, Locator, TextMatch};
use crate::page::Page;
use crate::pages::common::CommonLocators;
use crate::pages::Screen;
use crate::race::Race;
use crate::result::{ProbeError, ProbeResult};
use crate::step::Traced;
use crate::wait::{LoadState, UrlPattern};

const AMOUNT_NAME: &str = r"Amount(\s*\(\$\))?";
const AI_PARSE_DEADLINE: Duration = Duration::from_secs(20);
const AMOUNT_SETTLE: Duration = Duration::from_millis(500);
const SAVE_SETTLE: Duration = Duration::from_secs(1);

/// Form fields as the AI parser left them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExpense {
    pub amount: String,
    pub description: String,
    pub category: String,
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseSignal {
    Parsed,
    Failed,
}

/// Numeric value of a figure such as `"$1,234.50"`
fn parse_figure(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | '"' | ','))
        .collect();
    cleaned.trim().parse().ok()
}

#[derive(Debug, Clone)]
pub struct ExpensePage {
    common: CommonLocators,

    pub count_label: Locator,
    pub count_value: Locator,
    pub total_value: Locator,
    pub amount_field: Locator,
    pub form_heading: Locator,
    pub save_expense_button: Locator,
    pub delete_button: Locator,
    pub confirm_delete_button: Locator,
    pub edit_expense_heading: Locator,
    pub search_input: Locator,
    pub no_results_message: Locator,

    pub ai_suggest_button: Locator,
    pub ai_suggestion_notification: Locator,
    pub quick_add_button: Locator,
    pub natural_language_input: Locator,
    pub parse_with_ai_button: Locator,
    pub parse_success_notification: Locator,
    pub parse_error_message: Locator,
    pub created_notification: Locator,
}

impl Traced for ExpensePage {
    const NAME: &'static str = "ExpensePage";
}

impl Screen for ExpensePage {
    const PATH: &'static str = "/expenses";

    fn common(&self) -> &CommonLocators {
        &self.common
    }

    fn landmark(&self) -> &Locator {
        &self.common.total_expenses_text
    }
}

impl ExpensePage {
    #[must_use]
    pub fn new(page: &Page) -> Self {
        let paragraph_after = |label: &str| page.locator("p").filter_has_text(label).next_sibling();
        Self {
            common: CommonLocators::new(page),

            count_label: page.get_by_text("Count"),
            count_value: paragraph_after("Count"),
            total_value: paragraph_after("Total Expenses"),
            amount_field: page.get_by_role(AriaRole::Spinbutton, TextMatch::pattern_ci(AMOUNT_NAME)),
            form_heading: page.get_by_role(
                AriaRole::Heading,
                TextMatch::pattern_ci("Add New Expense|Edit Expense"),
            ),
            save_expense_button: page.get_by_role(
                AriaRole::Button,
                TextMatch::pattern_ci("Update Expense|Save|Add New Expense"),
            ),
            delete_button: page.get_by_role(AriaRole::Button, "Delete"),
            confirm_delete_button: page.get_by_role(AriaRole::Button, "Confirm"),
            edit_expense_heading: page.get_by_text("Edit Expense"),
            search_input: page.get_by_role(AriaRole::Textbox, "Search"),
            no_results_message: page.get_by_text("No expenses found"),

            ai_suggest_button: page.get_by_role(AriaRole::Button, "AI Suggest"),
            ai_suggestion_notification: page.get_by_text(TextMatch::pattern_ci("AI suggested")),
            quick_add_button: page.get_by_role(AriaRole::Button, "Quick Add"),
            natural_language_input: page.get_by_role(AriaRole::Textbox, "Describe your expense"),
            parse_with_ai_button: page.get_by_role(AriaRole::Button, "Parse with AI"),
            parse_success_notification: page.get_by_text("Expense parsed successfully!"),
            parse_error_message: page
                .get_by_text(TextMatch::pattern_ci(r"(failed|unable|could not)\b.*pars")),
            created_notification: page.get_by_text("Expense created successfully!"),
        }
    }

    fn page(&self) -> &Page {
        self.common.page()
    }

    /// Network idle, then the total and count captions
    pub async fn verify_expense_page_loaded(&self) -> ProbeResult<()> {
        self.try_step("verify_expense_page_loaded", async {
            self.page().wait_for_load_state(LoadState::NetworkIdle).await?;
            expect(&self.common.total_expenses_text).to_be_visible().await?;
            expect(&self.count_label).to_be_visible().await
        })
        .await
    }

    pub async fn click_add_expense(&self) -> ProbeResult<()> {
        self.try_step("click_add_expense", self.common.add_expense_button.click())
            .await
    }

    pub async fn fill_expense_amount(&self, amount: &str) -> ProbeResult<()> {
        self.try_step("fill_expense_amount", self.amount_field.fill(amount))
            .await
    }

    pub async fn fill_expense_description(&self, description: &str) -> ProbeResult<()> {
        self.try_step(
            "fill_expense_description",
            self.common.description_input.fill(description),
        )
        .await
    }

    pub async fn select_expense_category(&self, category: &str) -> ProbeResult<()> {
        self.try_step(
            "select_expense_category",
            self.common.category_dropdown.select_option(category),
        )
        .await
    }

    pub async fn submit_expense_form(&self) -> ProbeResult<()> {
        self.try_step("submit_expense_form", self.common.add_expense_button.click())
            .await
    }

    pub async fn wait_for_redirect_to_expenses_list(&self) -> ProbeResult<()> {
        self.try_step("wait_for_redirect_to_expenses_list", async {
            self.page()
                .wait_for_url(&UrlPattern::glob("**/expenses"))
                .await
                .map(drop)
        })
        .await
    }

    /// Number under the "Count" caption
    pub async fn expense_count(&self) -> ProbeResult<u64> {
        self.try_step("expense_count", async {
            expect(&self.count_value).to_be_visible().await?;
            let text = self.count_value.text_content().await?;
            Ok(parse_figure(&text).map_or(0, |n| n as u64))
        })
        .await
    }

    pub async fn verify_expense_count(&self) -> ProbeResult<()> {
        self.try_step("verify_expense_count", async {
            let count = self.expense_count().await?;
            if count == 0 {
                return Err(ProbeError::assertion("expected a positive expense count, got 0"));
            }
            Ok(())
        })
        .await
    }

    /// Amount under the "Total Expenses" caption
    pub async fn total_expenses(&self) -> ProbeResult<f64> {
        self.try_step("total_expenses", async {
            expect(&self.total_value).to_be_visible().await?;
            let text = self.total_value.text_content().await?;
            Ok(parse_figure(&text).unwrap_or(0.0))
        })
        .await
    }

    pub async fn verify_total_expenses(&self) -> ProbeResult<()> {
        self.try_step("verify_total_expenses", async {
            let total = self.total_expenses().await?;
            if total <= 0.0 {
                return Err(ProbeError::assertion(format!(
                    "expected positive total expenses, got {total}"
                )));
            }
            Ok(())
        })
        .await
    }

    /// Fill and submit the form, then wait to land back on the list
    pub async fn add_valid_expense(
        &self,
        amount: &str,
        description: &str,
        category: &str,
    ) -> ProbeResult<()> {
        self.try_step("add_valid_expense", async {
            self.click_add_expense().await?;
            self.fill_expense_amount(amount).await?;
            self.fill_expense_description(description).await?;
            self.select_expense_category(category).await?;
            self.submit_expense_form().await?;
            self.wait_for_redirect_to_expenses_list().await
        })
        .await
    }

    pub async fn verify_expense_created(&self) -> ProbeResult<()> {
        self.try_step("verify_expense_created", async {
            self.verify_expense_page_loaded().await?;
            self.verify_expense_count().await?;
            self.verify_total_expenses().await
        })
        .await
    }

    pub async fn click_edit_button_by_index(&self, index: usize) -> ProbeResult<()> {
        let button = self.page().get_by_role_any(AriaRole::Button).nth(index);
        self.try_step("click_edit_button_by_index", button.click())
            .await
    }

    /// The form keeps its "Add New Expense" heading while editing, so this
    /// checks the heading and the amount field together
    pub async fn verify_edit_form_opened(&self) -> ProbeResult<()> {
        self.try_step("verify_edit_form_opened", async {
            expect(&self.form_heading).to_be_visible().await?;
            let amount = self
                .page()
                .get_by_role(AriaRole::Spinbutton, TextMatch::pattern_ci("Amount"));
            expect(&amount).to_be_visible().await
        })
        .await
    }

    pub async fn clear_and_fill_amount(&self, amount: &str) -> ProbeResult<()> {
        self.try_step("clear_and_fill_amount", async {
            self.amount_field.fill(amount).await?;
            self.page().wait_for_timeout(AMOUNT_SETTLE).await;
            Ok(())
        })
        .await
    }

    pub async fn update_description(&self, description: &str) -> ProbeResult<()> {
        self.try_step("update_description", async {
            self.common.description_input.clear().await?;
            self.common.description_input.fill(description).await
        })
        .await
    }

    pub async fn update_category(&self, category: &str) -> ProbeResult<()> {
        self.try_step(
            "update_category",
            self.common.category_dropdown.select_option(category),
        )
        .await
    }

    /// Save once the button is enabled, then give the form time to close
    pub async fn save_changes(&self) -> ProbeResult<()> {
        self.try_step("save_changes", async {
            expect(&self.save_expense_button).to_be_enabled().await?;
            self.save_expense_button.click().await?;
            self.page().wait_for_timeout(SAVE_SETTLE).await;
            Ok(())
        })
        .await
    }

    pub async fn edit_expense(
        &self,
        amount: &str,
        description: &str,
        category: &str,
    ) -> ProbeResult<()> {
        self.try_step("edit_expense", async {
            self.verify_edit_form_opened().await?;
            self.clear_and_fill_amount(amount).await?;
            self.update_description(description).await?;
            self.update_category(category).await?;
            self.save_changes().await
        })
        .await
    }

    pub async fn click_delete_button(&self) -> ProbeResult<()> {
        self.try_step("click_delete_button", self.delete_button.click())
            .await
    }

    pub async fn confirm_deletion(&self) -> ProbeResult<()> {
        self.try_step("confirm_deletion", self.confirm_delete_button.click())
            .await
    }

    pub async fn delete_expense(&self) -> ProbeResult<()> {
        self.try_step("delete_expense", async {
            self.click_delete_button().await?;
            self.confirm_deletion().await
        })
        .await
    }

    pub async fn filter_by_category(&self, category: &str) -> ProbeResult<()> {
        self.try_step(
            "filter_by_category",
            self.common.category_dropdown.select_option(category),
        )
        .await
    }

    pub async fn clear_category_filter(&self) -> ProbeResult<()> {
        self.try_step(
            "clear_category_filter",
            self.common.category_dropdown.select_option(""),
        )
        .await
    }

    pub async fn verify_filtered_results(&self) -> ProbeResult<()> {
        self.try_step("verify_filtered_results", self.verify_expense_page_loaded())
            .await
    }

    /// Type into the list's search box
    pub async fn search(&self, text: &str) -> ProbeResult<()> {
        self.try_step("search", self.search_input.fill(text)).await
    }

    pub async fn clear_search(&self) -> ProbeResult<()> {
        self.try_step("clear_search", self.search_input.clear()).await
    }

    /// Whether the search found nothing; lookup failures count as no
    pub async fn is_search_empty(&self) -> bool {
        self.step("is_search_empty", async {
            self.no_results_message.is_visible().await.unwrap_or(false)
        })
        .await
    }

    pub async fn click_ai_suggest_button(&self) -> ProbeResult<()> {
        self.try_step("click_ai_suggest_button", self.ai_suggest_button.click())
            .await
    }

    pub async fn verify_ai_suggestion_notification(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_ai_suggestion_notification",
            expect(&self.ai_suggestion_notification).to_be_visible(),
        )
        .await
    }

    /// The category select holds `category` (an option value such as
    /// `foodDining`)
    pub async fn verify_ai_category_autofilled(&self, category: &str) -> ProbeResult<()> {
        self.try_step(
            "verify_ai_category_autofilled",
            expect(&self.common.category_dropdown).to_have_value(category),
        )
        .await
    }

    /// The suggest button is disabled while the request is in flight
    pub async fn verify_ai_loading_state(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_ai_loading_state",
            expect(&self.ai_suggest_button).to_be_disabled(),
        )
        .await
    }

    pub async fn click_quick_add_button(&self) -> ProbeResult<()> {
        self.try_step("click_quick_add_button", self.quick_add_button.click())
            .await
    }

    pub async fn fill_natural_language_input(&self, text: &str) -> ProbeResult<()> {
        self.try_step(
            "fill_natural_language_input",
            self.natural_language_input.fill(text),
        )
        .await
    }

    pub async fn click_parse_with_ai(&self) -> ProbeResult<()> {
        self.try_step("click_parse_with_ai", self.parse_with_ai_button.click())
            .await
    }

    /// Submit `text` to the parser and read back the filled form.
    ///
    /// Races the success notification against a parse error. Afterwards the
    /// page decides: a visible error is [`ProbeError::UnexpectedState`], no
    /// notification at all is [`ProbeError::RaceTimeout`].
    pub async fn parse_with_ai(&self, text: &str) -> ProbeResult<ParsedExpense> {
        self.try_step("parse_with_ai", async {
            self.fill_natural_language_input(text).await?;
            self.click_parse_with_ai().await?;

            let parsed = &self.parse_success_notification.clone().first();
            let failed = &self.parse_error_message.clone().first();
            Race::new(AI_PARSE_DEADLINE)
                .signal(
                    ParseSignal::Parsed,
                    parsed.wait_for_within(ElementState::Visible, AI_PARSE_DEADLINE),
                )
                .signal(
                    ParseSignal::Failed,
                    failed.wait_for_within(ElementState::Visible, AI_PARSE_DEADLINE),
                )
                .resolve(|settlement| async move {
                    debug!(winner = ?settlement.winner, "parse race settled");
                    if failed.is_visible().await.unwrap_or(false) {
                        let message = failed.text_content().await.unwrap_or_default();
                        return Err(ProbeError::unexpected(format!("AI parse failed: {message}")));
                    }
                    if !parsed.is_visible().await.unwrap_or(false) {
                        return Err(ProbeError::RaceTimeout {
                            ms: AI_PARSE_DEADLINE.as_millis() as u64,
                            signals: 2,
                        });
                    }
                    let fields = self.read_form().await?;
                    info!(?fields, "expense parsed");
                    Ok(fields)
                })
                .await
        })
        .await
    }

    async fn read_form(&self) -> ProbeResult<ParsedExpense> {
        Ok(ParsedExpense {
            amount: self.parsed_amount_field().input_value().await?,
            description: self.common.description_input.input_value().await?,
            category: self.common.category_dropdown.input_value().await?,
            date: self.common.date_input.input_value().await?,
        })
    }

    fn parsed_amount_field(&self) -> Locator {
        self.page().get_by_role(AriaRole::Spinbutton, "Amount")
    }

    pub async fn verify_parsing_success_notification(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_parsing_success_notification",
            expect(&self.parse_success_notification).to_be_visible(),
        )
        .await
    }

    pub async fn verify_parsed_amount(&self, amount: &str) -> ProbeResult<()> {
        let field = self.parsed_amount_field();
        self.try_step("verify_parsed_amount", expect(&field).to_have_value(amount))
            .await
    }

    pub async fn verify_parsed_description(&self, description: &str) -> ProbeResult<()> {
        self.try_step(
            "verify_parsed_description",
            expect(&self.common.description_input).to_have_value(description),
        )
        .await
    }

    /// Case-insensitive containment on the description value
    pub async fn verify_parsed_description_contains(&self, text: &str) -> ProbeResult<()> {
        self.try_step("verify_parsed_description_contains", async {
            let description = self.common.description_input.input_value().await?;
            if description.to_lowercase().contains(&text.to_lowercase()) {
                Ok(())
            } else {
                Err(ProbeError::assertion(format!(
                    "expected description {description:?} to contain {text:?}"
                )))
            }
        })
        .await
    }

    pub async fn verify_parsed_date(&self, date: &str) -> ProbeResult<()> {
        self.try_step(
            "verify_parsed_date",
            expect(&self.common.date_input).to_have_value(date),
        )
        .await
    }

    pub async fn verify_expense_created_successfully(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_expense_created_successfully",
            expect(&self.created_notification).to_be_visible(),
        )
        .await
    }

    /// An entry heading named `description` is listed
    pub async fn verify_expense_in_list(&self, description: &str) -> ProbeResult<()> {
        let entry = self
            .page()
            .get_by_role(AriaRole::Heading, description)
            .first();
        self.try_step("verify_expense_in_list", expect(&entry).to_be_visible())
            .await
    }
}
