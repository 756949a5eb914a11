//! Date and unique-string helpers for form fixtures.
//!
//! Dates are local-calendar `YYYY-MM-DD`, the format the app's date inputs
//! accept.

use chrono::{Days, Local, NaiveDate, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a date as `YYYY-MM-DD`
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `base` shifted by `days` (negative goes back)
#[must_use]
pub fn offset_date(base: NaiveDate, days: i64) -> String {
    let shifted = if days >= 0 {
        base.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        base.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    format_date(shifted.unwrap_or(base))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[must_use]
pub fn current_date() -> String {
    format_date(today())
}

#[must_use]
pub fn future_date(days: i64) -> String {
    offset_date(today(), days)
}

#[must_use]
pub fn yesterday() -> String {
    offset_date(today(), -1)
}

/// `"<Month> <YYYY>"`, as the dashboard's month card shows it
#[must_use]
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

#[must_use]
pub fn current_month_label() -> String {
    month_label(today())
}

/// Milliseconds since the Unix epoch
#[must_use]
pub fn timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// `"<prefix> <unix-millis>"`
#[must_use]
pub fn unique_description(prefix: &str) -> String {
    format!("{prefix} {}", timestamp_millis())
}

/// `local+<unix-millis>@domain`
#[must_use]
pub fn unique_email(local: &str, domain: &str) -> String {
    format!("{local}+{}@{domain}", timestamp_millis())
}
