//! Income list and form.

use tracing::debug;

use crate::assertion::expect;
use crate::driver::AriaRole;
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::common::CommonLocators;
use crate::pages::Screen;
use crate::result::ProbeResult;
use crate::step::Traced;

#[derive(Debug, Clone)]
pub struct IncomePage {
    common: CommonLocators,

    pub amount_field: Locator,
    pub edit_income_heading: Locator,
    pub recurring_income_checkbox: Locator,
    pub recurring_frequency_dropdown: Locator,
    pub save_income_button: Locator,
    pub delete_button: Locator,
    pub confirm_delete_button: Locator,
}

impl Traced for IncomePage {
    const NAME: &'static str = "IncomePage";
}

impl Screen for IncomePage {
    const PATH: &'static str = "/incomes";

    fn common(&self) -> &CommonLocators {
        &self.common
    }

    fn landmark(&self) -> &Locator {
        &self.common.total_income_text
    }
}

impl IncomePage {
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self {
            common: CommonLocators::new(page),
            amount_field: page.get_by_role(AriaRole::Spinbutton, "Amount"),
            edit_income_heading: page.get_by_text("Edit Income"),
            recurring_income_checkbox: page
                .get_by_role(AriaRole::Checkbox, "This is recurring income"),
            recurring_frequency_dropdown: page.get_by_label("Recurring Frequency"),
            save_income_button: page.get_by_role(AriaRole::Button, "Save"),
            delete_button: page.get_by_role(AriaRole::Button, "Delete"),
            confirm_delete_button: page.get_by_role(AriaRole::Button, "Confirm"),
        }
    }

    pub async fn verify_income_page_loaded(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_income_page_loaded",
            expect(&self.common.total_income_text).to_be_visible(),
        )
        .await
    }

    pub async fn click_add_income(&self) -> ProbeResult<()> {
        self.try_step("click_add_income", self.common.add_income_button.click())
            .await
    }

    pub async fn fill_income_amount(&self, amount: &str) -> ProbeResult<()> {
        self.try_step("fill_income_amount", self.amount_field.fill(amount))
            .await
    }

    pub async fn select_category(&self, category: &str) -> ProbeResult<()> {
        self.try_step(
            "select_category",
            self.common.category_dropdown.select_option(category),
        )
        .await
    }

    pub async fn fill_description(&self, description: &str) -> ProbeResult<()> {
        self.try_step(
            "fill_description",
            self.common.description_input.fill(description),
        )
        .await
    }

    pub async fn fill_date(&self, date: &str) -> ProbeResult<()> {
        self.try_step("fill_date", self.common.date_input.fill(date))
            .await
    }

    pub async fn enable_recurring_income(&self) -> ProbeResult<()> {
        self.try_step(
            "enable_recurring_income",
            self.recurring_income_checkbox.click(),
        )
        .await
    }

    pub async fn select_recurring_frequency(&self, frequency: &str) -> ProbeResult<()> {
        self.try_step(
            "select_recurring_frequency",
            self.recurring_frequency_dropdown.select_option(frequency),
        )
        .await
    }

    /// The add button doubles as the form's submit
    pub async fn submit_income_form(&self) -> ProbeResult<()> {
        self.try_step("submit_income_form", self.common.add_income_button.click())
            .await
    }

    async fn fill_income_form(
        &self,
        amount: &str,
        category: &str,
        description: &str,
        date: &str,
    ) -> ProbeResult<()> {
        self.click_add_income().await?;
        self.fill_income_amount(amount).await?;
        self.select_category(category).await?;
        self.fill_description(description).await?;
        self.fill_date(date).await
    }

    pub async fn add_valid_income(
        &self,
        amount: &str,
        category: &str,
        description: &str,
        date: &str,
    ) -> ProbeResult<()> {
        self.try_step("add_valid_income", async {
            self.fill_income_form(amount, category, description, date)
                .await?;
            self.submit_income_form().await
        })
        .await
    }

    pub async fn add_recurring_income(
        &self,
        amount: &str,
        category: &str,
        description: &str,
        date: &str,
        frequency: &str,
    ) -> ProbeResult<()> {
        self.try_step("add_recurring_income", async {
            self.fill_income_form(amount, category, description, date)
                .await?;
            self.enable_recurring_income().await?;
            self.select_recurring_frequency(frequency).await?;
            self.submit_income_form().await
        })
        .await
    }

    /// Click the `index`-th button on the page
    pub async fn click_edit_button_by_index(&self, index: usize) -> ProbeResult<()> {
        let button = self.common.page().get_by_role_any(AriaRole::Button).nth(index);
        self.try_step("click_edit_button_by_index", button.click())
            .await
    }

    pub async fn verify_edit_form_opened(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_edit_form_opened",
            expect(&self.edit_income_heading).to_be_visible(),
        )
        .await
    }

    pub async fn clear_and_fill_amount(&self, amount: &str) -> ProbeResult<()> {
        self.try_step("clear_and_fill_amount", async {
            self.amount_field.clear().await?;
            self.amount_field.fill(amount).await
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

    pub async fn save_changes(&self) -> ProbeResult<()> {
        self.try_step("save_changes", self.save_income_button.click())
            .await
    }

    /// Edit the open form's amount and category, then save
    pub async fn edit_income(&self, amount: &str, category: &str) -> ProbeResult<()> {
        self.try_step("edit_income", async {
            self.verify_edit_form_opened().await?;
            self.clear_and_fill_amount(amount).await?;
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

    pub async fn delete_income(&self) -> ProbeResult<()> {
        self.try_step("delete_income", async {
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

    /// The list still renders after filtering
    pub async fn verify_filtered_results(&self, category: &str) -> ProbeResult<()> {
        self.try_step("verify_filtered_results", async {
            debug!(category, "verifying filtered income list");
            expect(&self.common.total_income_text).to_be_visible().await
        })
        .await
    }

    /// The list is paginated, so a new entry may sit on a later page; this
    /// only proves the list reloaded.
    pub async fn verify_income_in_list(&self, description: &str) -> ProbeResult<()> {
        self.try_step("verify_income_in_list", async {
            debug!(description, "verifying income list");
            self.verify_income_page_loaded().await
        })
        .await
    }
}
