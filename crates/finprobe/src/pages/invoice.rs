//! Invoice list and form.

use tracing::debug;

use crate::assertion::expect;
use crate::driver::AriaRole;
use crate::locator::{Locator, TextMatch};
use crate::page::Page;
use crate::pages::common::CommonLocators;
use crate::pages::Screen;
use crate::result::ProbeResult;
use crate::step::Traced;

/// Invoice states the status dropdown offers
pub const INVOICE_STATUSES: [&str; 4] = ["Draft", "Sent", "Paid", "Overdue"];

#[derive(Debug, Clone)]
pub struct InvoicePage {
    common: CommonLocators,

    pub invoices_heading: Locator,
    pub client_name_input: Locator,
    pub due_date_input: Locator,
    pub status_dropdown: Locator,
    pub status_filter: Locator,
    pub save_invoice_button: Locator,
}

impl Traced for InvoicePage {
    const NAME: &'static str = "InvoicePage";
}

impl Screen for InvoicePage {
    const PATH: &'static str = "/invoices";

    fn common(&self) -> &CommonLocators {
        &self.common
    }

    fn landmark(&self) -> &Locator {
        &self.invoices_heading
    }
}

impl InvoicePage {
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self {
            common: CommonLocators::new(page),
            invoices_heading: page
                .get_by_role(AriaRole::Heading, TextMatch::pattern_ci(r"^\W*Invoices$")),
            client_name_input: page.get_by_role(AriaRole::Textbox, "Client Name"),
            due_date_input: page.get_by_role(AriaRole::Textbox, "Due Date"),
            status_dropdown: page.get_by_label(TextMatch::exact("Status")),
            status_filter: page.get_by_label("Filter by status"),
            save_invoice_button: page.get_by_role(AriaRole::Button, "Save Invoice"),
        }
    }

    pub async fn verify_invoice_page_loaded(&self) -> ProbeResult<()> {
        self.try_step("verify_invoice_page_loaded", async {
            expect(&self.invoices_heading).to_be_visible().await?;
            expect(&self.common.create_invoice_button).to_be_visible().await
        })
        .await
    }

    pub async fn click_create_invoice(&self) -> ProbeResult<()> {
        self.try_step(
            "click_create_invoice",
            self.common.create_invoice_button.click(),
        )
        .await
    }

    pub async fn fill_client_name(&self, client: &str) -> ProbeResult<()> {
        self.try_step("fill_client_name", self.client_name_input.fill(client))
            .await
    }

    pub async fn fill_invoice_amount(&self, amount: &str) -> ProbeResult<()> {
        self.try_step("fill_invoice_amount", self.common.amount_input.fill(amount))
            .await
    }

    /// `YYYY-MM-DD`
    pub async fn fill_due_date(&self, due_date: &str) -> ProbeResult<()> {
        self.try_step("fill_due_date", self.due_date_input.fill(due_date))
            .await
    }

    pub async fn select_status(&self, status: &str) -> ProbeResult<()> {
        self.try_step("select_status", self.status_dropdown.select_option(status))
            .await
    }

    pub async fn submit_invoice_form(&self) -> ProbeResult<()> {
        self.try_step("submit_invoice_form", self.save_invoice_button.click())
            .await
    }

    /// Open the form, fill the required fields and save; status keeps the
    /// form default
    pub async fn create_invoice(&self, client: &str, amount: &str, due_date: &str) -> ProbeResult<()> {
        self.try_step("create_invoice", async {
            self.click_create_invoice().await?;
            self.fill_client_name(client).await?;
            self.fill_invoice_amount(amount).await?;
            self.fill_due_date(due_date).await?;
            self.submit_invoice_form().await
        })
        .await
    }

    pub async fn filter_by_status(&self, status: &str) -> ProbeResult<()> {
        self.try_step("filter_by_status", self.status_filter.select_option(status))
            .await
    }

    /// At least one badge reads exactly `status`
    pub async fn verify_status_badge_visible(&self, status: &str) -> ProbeResult<()> {
        let badge = self
            .common
            .page()
            .get_by_text(TextMatch::exact(status))
            .first();
        self.try_step("verify_status_badge_visible", expect(&badge).to_be_visible())
            .await
    }

    pub async fn verify_invoice_in_list(&self, client: &str) -> ProbeResult<()> {
        let row = self.common.page().get_by_text(client).first();
        self.try_step("verify_invoice_in_list", async {
            debug!(client, "looking for invoice");
            expect(&row).to_be_visible().await
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::ElementSnapshot;
    use crate::mock::{Effect, Reaction, ScriptedDriver};
    use crate::pages::fixtures;
    use crate::result::ProbeError;
    use std::sync::Arc;

    fn invoices_screen() -> Vec<ElementSnapshot> {
        let mut filter = ElementSnapshot::new("filter", "select")
            .label("Filter by status")
            .option("", "All");
        let mut status = ElementSnapshot::new("status", "select").label("Status").hidden();
        for s in INVOICE_STATUSES {
            filter = filter.option(s.to_lowercase(), s);
            status = status.option(s.to_lowercase(), s);
        }
        vec![
            ElementSnapshot::new("title", "h1").text("🧾 Invoices"),
            ElementSnapshot::new("create", "button").text("Create Invoice"),
            filter,
            ElementSnapshot::input("client", "text").label("Client Name").hidden(),
            ElementSnapshot::input("amount", "number").label("Amount ($)").hidden(),
            ElementSnapshot::input("due", "date").label("Due Date").hidden(),
            status,
            ElementSnapshot::new("save", "button").text("Save Invoice").hidden(),
            ElementSnapshot::new("row-1", "td").text("Globex Corp"),
            ElementSnapshot::new("badge-1", "span").text("Paid"),
        ]
    }

    fn driver() -> Arc<ScriptedDriver> {
        let form = ["client", "amount", "due", "status", "save"]
            .into_iter()
            .map(|id| Effect::Show(id.into()))
            .collect();
        Arc::new(
            ScriptedDriver::new()
                .screen("/invoices", invoices_screen())
                .on_click("create", form)
                .react(
                    Reaction::on_click("save")
                        .then(Effect::Insert(
                            ElementSnapshot::new("row-2", "td").text("Acme Ltd"),
                        ))
                        .then(Effect::Insert(
                            ElementSnapshot::new("badge-2", "span").text("Draft"),
                        )),
                ),
        )
    }

    mod form_tests {
        use super::*;

        #[tokio::test]
        async fn test_create_invoice_lists_it() {
            let driver = driver();
            let invoices = InvoicePage::new(&fixtures::page(&driver));
            invoices.navigate().await.unwrap();
            invoices.verify_invoice_page_loaded().await.unwrap();
            invoices
                .create_invoice("Acme Ltd", "1250.00", "2025-12-31")
                .await
                .unwrap();
            assert_eq!(driver.value_of("client").as_deref(), Some("Acme Ltd"));
            assert_eq!(driver.value_of("due").as_deref(), Some("2025-12-31"));
            invoices.verify_invoice_in_list("Acme Ltd").await.unwrap();
            invoices.verify_status_badge_visible("Draft").await.unwrap();
        }

        #[tokio::test]
        async fn test_status_dropdown_is_not_the_filter() {
            let driver = driver();
            let invoices = InvoicePage::new(&fixtures::page(&driver));
            invoices.navigate().await.unwrap();
            invoices.click_create_invoice().await.unwrap();
            invoices.select_status("Sent").await.unwrap();
            assert_eq!(driver.value_of("status").as_deref(), Some("sent"));
            assert_eq!(driver.value_of("filter").as_deref(), Some(""));
        }
    }

    mod list_tests {
        use super::*;

        #[tokio::test]
        async fn test_filter_and_badges() {
            let driver = driver();
            let invoices = InvoicePage::new(&fixtures::page(&driver));
            invoices.navigate().await.unwrap();
            invoices.filter_by_status("Paid").await.unwrap();
            assert_eq!(driver.value_of("filter").as_deref(), Some("paid"));
            invoices.verify_status_badge_visible("Paid").await.unwrap();
            let err = invoices.verify_status_badge_visible("Overdue").await.unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
        }
    }
}
