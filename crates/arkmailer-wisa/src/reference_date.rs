//! Reference date for the roster query.

use chrono::{Datelike, Days, NaiveDate};

/// Format WISA expects for the `werkdatum` parameter.
pub const WISA_DATE_FORMAT: &str = "%d/%m/%Y";

/// Returns the date the roster is queried for.
///
/// During the summer break the roster is empty, so July uses the last school
/// day (28 June) and August the first day of the new school year
/// (2 September). Any other month looks two weeks back.
#[must_use]
pub fn reference_date(today: NaiveDate) -> NaiveDate {
    let fixed = match today.month() {
        7 => NaiveDate::from_ymd_opt(today.year(), 6, 28),
        8 => NaiveDate::from_ymd_opt(today.year(), 9, 2),
        _ => None,
    };

    fixed
        .or_else(|| today.checked_sub_days(Days::new(14)))
        .unwrap_or(today)
}

/// Formats a date for the `werkdatum` parameter.
#[must_use]
pub fn format_reference_date(date: NaiveDate) -> String {
    date.format(WISA_DATE_FORMAT).to_string()
}
