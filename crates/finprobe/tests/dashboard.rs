//! Dashboard cards, sections, filters and activity.

mod common;

use std::time::Duration;

use finprobe::dates::unique_description;
use finprobe::prelude::*;

const SUITE: &str = "dashboard";

/// Status label and the figure shape shown beside it
struct StatusRow {
    status: &'static str,
    figure: &'static str,
}

const INVOICE_STATUS_ROWS: &[StatusRow] = &[
    StatusRow { status: "paid", figure: CURRENCY_PATTERN },
    StatusRow { status: "pending", figure: COUNT_PATTERN },
    StatusRow { status: "overdue", figure: COUNT_PATTERN },
];

#[tokio::test]
async fn view_dashboard_with_data() {
    common::run_case(SUITE, "view_dashboard_with_data", |page| async move {
        let dashboard = DashboardPage::new(&page);
        dashboard.navigate().await?;
        dashboard.verify_welcome_message().await?;
        dashboard.verify_financial_overview_subtitle().await?;
        dashboard.verify_total_income_card().await?;
        dashboard.verify_total_expenses_card().await?;
        dashboard.verify_net_income_card().await?;
        dashboard.verify_this_month_card().await?;
        dashboard.verify_income_by_category_section().await?;
        dashboard.verify_expenses_by_category_section().await?;
        dashboard.verify_invoices_by_status_section().await?;
        dashboard.common().verify_recent_activity_sections_visible().await
    })
    .await;
}

#[tokio::test]
async fn filter_dashboard_by_time_periods() {
    common::run_case(SUITE, "filter_dashboard_by_time_periods", |page| async move {
        let dashboard = DashboardPage::new(&page);
        dashboard.navigate().await?;
        dashboard.filter_by_all_time().await?;
        dashboard.common().verify_time_filters_visible().await?;
        dashboard.filter_by_this_month().await?;
        dashboard.common().verify_time_filters_visible().await?;
        dashboard.filter_by_this_year().await?;
        dashboard.common().verify_time_filters_visible().await?;
        dashboard.verify_dashboard_data_after_filter().await
    })
    .await;
}

#[tokio::test]
async fn verify_net_income_calculation() {
    common::run_case(SUITE, "verify_net_income_calculation", |page| async move {
        let dashboard = DashboardPage::new(&page);
        dashboard.navigate().await?;
        dashboard.verify_net_income_calculation().await
    })
    .await;
}

#[tokio::test]
async fn verify_recent_activity_updates() {
    common::run_case(SUITE, "verify_recent_activity_updates", |page| async move {
        let dashboard = DashboardPage::new(&page);
        let description = unique_description("Dashboard activity test");
        dashboard
            .add_new_expense_from_dashboard(&description, "25.99")
            .await?;
        dashboard.navigate().await?;
        page.wait_for_timeout(Duration::from_secs(3)).await;
        dashboard.verify_recent_activity_updated().await?;
        expect(&page.get_by_text(description.as_str())).to_be_visible().await
    })
    .await;
}

#[tokio::test]
async fn verify_expenses_by_category_visualization() {
    common::run_case(SUITE, "verify_expenses_by_category_visualization", |page| async move {
        let dashboard = DashboardPage::new(&page);
        dashboard.navigate().await?;
        dashboard.verify_expenses_by_category_section().await
    })
    .await;
}

#[tokio::test]
async fn verify_invoices_by_status_breakdown() {
    common::run_case(SUITE, "verify_invoices_by_status_breakdown", |page| async move {
        let dashboard = DashboardPage::new(&page);
        dashboard.navigate().await?;
        dashboard.verify_invoices_by_status_section().await?;
        for row in INVOICE_STATUS_ROWS {
            dashboard
                .verify_invoices_by_status(row.status, TextMatch::pattern(row.figure))
                .await?;
        }
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn dashboard_with_complete_data_verification() {
    common::run_case(SUITE, "dashboard_with_complete_data_verification", |page| async move {
        let dashboard = DashboardPage::new(&page);
        dashboard.navigate().await?;
        dashboard.verify_complete_data_display().await
    })
    .await;
}
