//! Summary screen: overview, filters and breakdowns.

mod common;

use finprobe::prelude::*;

const SUITE: &str = "summary";

#[tokio::test]
async fn view_complete_summary() {
    common::run_case(SUITE, "view_complete_summary", |page| async move {
        let summary = SummaryPage::new(&page);
        summary.navigate().await?;
        summary.verify_complete_summary_display().await
    })
    .await;
}

#[tokio::test]
async fn filter_summary_by_time_period() {
    common::run_case(SUITE, "filter_summary_by_time_period", |page| async move {
        let summary = SummaryPage::new(&page);
        summary.navigate().await?;
        summary.filter_by_this_month().await?;
        summary.verify_summary_after_filter().await?;
        summary.filter_by_this_year().await?;
        summary.verify_summary_after_filter().await?;
        summary.filter_by_all_time().await?;
        summary.verify_summary_after_filter().await
    })
    .await;
}

#[tokio::test]
async fn verify_category_breakdowns() {
    common::run_case(SUITE, "verify_category_breakdowns", |page| async move {
        let summary = SummaryPage::new(&page);
        summary.navigate().await?;
        summary.verify_all_category_breakdown_details().await
    })
    .await;
}
