//! Income management: add, recurring, edit and filter.

mod common;

use finprobe::dates::unique_description;
use finprobe::prelude::*;

const SUITE: &str = "incomes";

struct IncomeRow {
    amount: &'static str,
    category: &'static str,
    prefix: &'static str,
}

/// Entries created before filtering, one per category
const FILTER_ROWS: &[IncomeRow] = &[
    IncomeRow { amount: "3500", category: "Salary", prefix: "Salary income for filter test" },
    IncomeRow { amount: "2000", category: "Freelance", prefix: "Freelance income for filter test" },
];

const ENTRY_DATE: &str = "2025-11-20";

#[tokio::test]
async fn add_valid_income_entry() {
    common::run_case(SUITE, "add_valid_income_entry", |page| async move {
        let incomes = IncomePage::new(&page);
        let description = unique_description("November salary payment");
        incomes.navigate().await?;
        incomes
            .add_valid_income("3500", "Salary", &description, ENTRY_DATE)
            .await?;
        incomes.verify_income_page_loaded().await?;
        incomes.verify_income_in_list(&description).await
    })
    .await;
}

#[tokio::test]
async fn add_recurring_income() {
    common::run_case(SUITE, "add_recurring_income", |page| async move {
        let incomes = IncomePage::new(&page);
        let description = unique_description("Monthly retainer client");
        incomes.navigate().await?;
        incomes
            .add_recurring_income("2000", "Freelance", &description, "2025-11-01", "Monthly")
            .await?;
        incomes.verify_income_page_loaded().await
    })
    .await;
}

#[tokio::test]
async fn edit_income_entry() {
    common::run_case(SUITE, "edit_income_entry", |page| async move {
        let incomes = IncomePage::new(&page);
        let description = unique_description("Edited income entry");

        incomes.navigate().await?;
        incomes.verify_income_page_loaded().await?;
        incomes.click_edit_button_by_index(1).await?;
        incomes.verify_edit_form_opened().await?;
        incomes.clear_and_fill_amount("5000").await?;
        incomes.fill_description(&description).await?;
        // The edit form can open with an empty date
        incomes.fill_date("2025-12-23").await?;
        incomes.update_category("Freelance").await?;
        incomes.save_changes().await?;

        incomes.verify_income_page_loaded().await?;
        expect(&page.get_by_text("Your Income History")).to_be_visible().await
    })
    .await;
}

#[tokio::test]
async fn filter_income_by_category() {
    common::run_case(SUITE, "filter_income_by_category", |page| async move {
        let incomes = IncomePage::new(&page);
        incomes.navigate().await?;
        for row in FILTER_ROWS {
            let description = unique_description(row.prefix);
            incomes
                .add_valid_income(row.amount, row.category, &description, ENTRY_DATE)
                .await?;
            incomes.verify_income_page_loaded().await?;
        }

        incomes.filter_by_category("Salary").await?;
        expect(&page.get_by_text("Salary").first()).to_be_visible().await?;
        incomes.verify_filtered_results("Salary").await
    })
    .await;
}
